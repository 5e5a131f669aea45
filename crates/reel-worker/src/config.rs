//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use reel_media::{PreviewProfile, TranscodeProfile};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs (worker pool size)
    pub max_concurrent_jobs: usize,
    /// Per-stage engine timeout; `None` waits for the engine indefinitely
    pub stage_timeout: Option<Duration>,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Root of the uploads/compressed/previews directories
    pub data_dir: PathBuf,
    /// Stage 1 encoding settings
    pub transcode: TranscodeProfile,
    /// Stage 2 settings
    pub preview: PreviewProfile,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 1,
            stage_timeout: None,
            shutdown_timeout: Duration::from_secs(30),
            data_dir: PathBuf::from("."),
            transcode: TranscodeProfile::default(),
            preview: PreviewProfile::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let transcode = TranscodeProfile {
            video_codec: std::env::var("WORKER_VIDEO_CODEC")
                .unwrap_or(defaults.transcode.video_codec),
            audio_codec: std::env::var("WORKER_AUDIO_CODEC")
                .unwrap_or(defaults.transcode.audio_codec),
            size: std::env::var("WORKER_TRANSCODE_SIZE").unwrap_or(defaults.transcode.size),
        };

        Self {
            max_concurrent_jobs: std::env::var("CONSUMER_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            stage_timeout: std::env::var("WORKER_STAGE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            data_dir: std::env::var("CONSUMER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            transcode,
            preview: PreviewProfile {
                duration_secs: std::env::var("WORKER_PREVIEW_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.preview.duration_secs),
            },
        }
    }

    pub fn with_concurrency(mut self, max_concurrent_jobs: usize) -> Self {
        self.max_concurrent_jobs = max_concurrent_jobs;
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_contract() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_concurrent_jobs, 1);
        assert!(config.stage_timeout.is_none());
        assert_eq!(config.transcode.size, "640x480");
        assert_eq!(config.preview.duration_secs, 10.0);
    }

    #[test]
    fn test_builders() {
        let config = WorkerConfig::default()
            .with_concurrency(4)
            .with_data_dir("/srv/reel");
        assert_eq!(config.max_concurrent_jobs, 4);
        assert_eq!(config.data_dir, PathBuf::from("/srv/reel"));
    }
}
