//! Queue error types.

use reel_models::JobId;
use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Invalid queue configuration: {0}")]
    InvalidConfig(String),

    #[error("Job {0} is not being processed")]
    NotProcessing(JobId),

    #[error("Job {id} reported non-terminal state {state}")]
    NotTerminal { id: JobId, state: String },
}

impl QueueError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
