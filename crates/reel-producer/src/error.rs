//! Producer error types.

use thiserror::Error;

pub type ProducerResult<T> = Result<T, ProducerError>;

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transfer error: {0}")]
    Transfer(#[from] reel_transfer::TransferError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProducerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
