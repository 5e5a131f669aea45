//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid filename: {0:?}")]
    InvalidFilename(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Short label used in metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            MediaError::FfmpegNotFound => "ffmpeg_not_found",
            MediaError::FfmpegFailed { .. } => "ffmpeg_failed",
            MediaError::FileNotFound(_) => "file_not_found",
            MediaError::InvalidFilename(_) => "invalid_filename",
            MediaError::Timeout(_) => "timeout",
            MediaError::Io(_) => "io",
        }
    }
}
