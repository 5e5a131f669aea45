//! Producer configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ProducerError, ProducerResult};
use crate::registry::ConsumerRegistry;

/// Producer configuration.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Folder watched for new files
    pub source_folder: PathBuf,
    /// Position of this producer, used for consumer assignment
    pub producer_index: usize,
    /// Explicit consumer address; bypasses the registry when set
    pub consumer_address: Option<String>,
    /// Explicit consumer list (`PRODUCER_CONSUMERS`, comma separated)
    pub consumers: Vec<String>,
    /// Host of port-derived consumers
    pub consumer_host: String,
    /// First port of port-derived consumers
    pub consumer_base_port: u16,
    /// Number of port-derived consumers
    pub consumer_count: usize,
    /// Wait after a filesystem event before reading the file
    pub settle_delay: Duration,
    /// Periodic rescan of the folder; `None` disables it
    pub rescan_interval: Option<Duration>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            source_folder: PathBuf::from("./producer1"),
            producer_index: 0,
            consumer_address: None,
            consumers: Vec::new(),
            consumer_host: "localhost".to_string(),
            consumer_base_port: 50051,
            consumer_count: 1,
            settle_delay: Duration::from_millis(100),
            rescan_interval: None,
        }
    }
}

impl ProducerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            source_folder: std::env::var("PRODUCER_SOURCE_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.source_folder),
            producer_index: std::env::var("PRODUCER_INDEX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.producer_index),
            consumer_address: std::env::var("PRODUCER_CONSUMER_ADDRESS")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            consumers: std::env::var("PRODUCER_CONSUMERS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default(),
            consumer_host: std::env::var("CONSUMER_HOST").unwrap_or(defaults.consumer_host),
            consumer_base_port: std::env::var("CONSUMER_BASE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.consumer_base_port),
            consumer_count: std::env::var("CONSUMER_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.consumer_count),
            settle_delay: std::env::var("PRODUCER_SETTLE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle_delay),
            rescan_interval: std::env::var("PRODUCER_RESCAN_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    /// Apply positional arguments `[sourceFolder] [consumerAddress]`.
    pub fn with_args<S: AsRef<str>>(mut self, args: &[S]) -> ProducerResult<Self> {
        let mut args = args.iter().map(AsRef::<str>::as_ref);

        if let Some(folder) = args.next() {
            self.source_folder = PathBuf::from(folder);
        }
        if let Some(address) = args.next() {
            self.consumer_address = Some(address.to_string());
        }
        if let Some(extra) = args.next() {
            return Err(ProducerError::config(format!(
                "unexpected extra argument {:?}",
                extra
            )));
        }

        Ok(self)
    }

    /// Registry of consumers this producer may be assigned to.
    pub fn registry(&self) -> ProducerResult<ConsumerRegistry> {
        if self.consumers.iter().any(|c| !c.is_empty()) {
            ConsumerRegistry::new(self.consumers.clone())
        } else {
            ConsumerRegistry::from_base_port(
                &self.consumer_host,
                self.consumer_base_port,
                self.consumer_count,
            )
        }
    }

    /// Consumer this producer uploads to.
    pub fn resolve_consumer(&self) -> ProducerResult<String> {
        match &self.consumer_address {
            Some(address) => Ok(address.clone()),
            None => Ok(self.registry()?.assign(self.producer_index).to_string()),
        }
    }
}
