//! Consumer configuration.

use std::path::PathBuf;

use reel_queue::QueueConfig;
use reel_worker::WorkerConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {name} argument {value:?}: expected a positive integer")]
    InvalidArgument { name: &'static str, value: String },

    #[error("Unexpected extra argument {0:?}")]
    ExtraArgument(String),
}

/// Consumer server configuration.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size, bounds a single upload
    pub max_body_size: usize,
    /// Directory holding the producer drop folders
    pub producer_root: PathBuf,
    /// Number of drop folders (`producer1..producerP`)
    pub num_producers: usize,
    /// Serve Prometheus text on `/metrics`
    pub metrics_enabled: bool,
    /// Admission settings
    pub queue: QueueConfig,
    /// Worker pool settings
    pub worker: WorkerConfig,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50051,
            cors_origins: vec!["*".to_string()],
            max_body_size: 1024 * 1024 * 1024, // 1GB
            producer_root: PathBuf::from("."),
            num_producers: 2,
            metrics_enabled: true,
            queue: QueueConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl ConsumerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("CONSUMER_HOST").unwrap_or(defaults.host),
            port: std::env::var("CONSUMER_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: std::env::var("CONSUMER_MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            producer_root: std::env::var("CONSUMER_PRODUCER_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.producer_root),
            num_producers: std::env::var("CONSUMER_PRODUCERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.num_producers),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            queue: QueueConfig::from_env(),
            worker: WorkerConfig::from_env(),
        }
    }

    /// Apply positional arguments `[concurrency] [queueCapacity] [numProducers]`.
    ///
    /// Missing arguments keep the environment value.
    pub fn with_args<S: AsRef<str>>(mut self, args: &[S]) -> Result<Self, ConfigError> {
        let mut args = args.iter().map(AsRef::<str>::as_ref);

        if let Some(value) = args.next() {
            self.worker.max_concurrent_jobs = parse_positive("concurrency", value)?;
        }
        if let Some(value) = args.next() {
            self.queue.capacity = parse_positive("queue capacity", value)?;
        }
        if let Some(value) = args.next() {
            self.num_producers = parse_positive("producer count", value)?;
        }
        if let Some(extra) = args.next() {
            return Err(ConfigError::ExtraArgument(extra.to_string()));
        }

        Ok(self)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Drop folder paths, `producer1` first.
    pub fn producer_folders(&self) -> Vec<PathBuf> {
        (1..=self.num_producers)
            .map(|i| self.producer_root.join(format!("producer{}", i)))
            .collect()
    }
}

fn parse_positive(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidArgument {
            name,
            value: value.to_string(),
        }),
    }
}
