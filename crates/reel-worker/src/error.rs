//! Worker error types.

use std::fmt;

use reel_media::MediaError;
use reel_models::InvalidTransition;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Step of the pipeline a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Writing the raw upload to disk
    Staging,
    /// Stage 1
    Transcode,
    /// Stage 2
    Preview,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Staging => "staging",
            Stage::Transcode => "transcode",
            Stage::Preview => "preview",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: MediaError,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid job state: {0}")]
    InvalidState(#[from] InvalidTransition),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Queue error: {0}")]
    Queue(#[from] reel_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn stage_failed(stage: Stage, source: impl Into<MediaError>) -> Self {
        Self::StageFailed {
            stage,
            source: source.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Stage the failure happened in, if it was a stage failure.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            WorkerError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
