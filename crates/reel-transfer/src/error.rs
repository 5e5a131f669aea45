//! Transfer error types.

use thiserror::Error;

pub type TransferResult<T> = Result<T, TransferError>;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Frame header of {len} bytes exceeds limit of {max}")]
    HeaderTooLarge { len: usize, max: usize },

    #[error("Frame chunk of {len} bytes exceeds limit of {max}")]
    ChunkTooLarge { len: usize, max: usize },

    #[error("Stream ended inside a frame ({remaining} bytes left over)")]
    TruncatedFrame { remaining: usize },

    #[error("Invalid frame header: {0}")]
    InvalidHeader(String),

    #[error("Invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("Frame {field} differs from the first frame of the stream")]
    FrameMismatch { field: &'static str },

    #[error("Upload stream contained no frames")]
    EmptyStream,

    #[error("Consumer rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransferError::Network(_) => true,
            TransferError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the error is a malformed upload stream rather than an I/O failure.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            TransferError::HeaderTooLarge { .. }
                | TransferError::ChunkTooLarge { .. }
                | TransferError::TruncatedFrame { .. }
                | TransferError::InvalidHeader(_)
                | TransferError::InvalidFilename(_)
                | TransferError::FrameMismatch { .. }
                | TransferError::EmptyStream
        )
    }
}
