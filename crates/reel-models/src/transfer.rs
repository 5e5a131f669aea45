//! Transfer protocol messages shared by producers and consumers.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Fingerprint;

/// One unit of an upload stream.
///
/// Every frame of a stream carries the same `filename` and `hash`; the
/// consumer pins both from the first frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub filename: String,
    pub hash: Fingerprint,
    pub data: Bytes,
}

impl Frame {
    pub fn new(filename: impl Into<String>, hash: Fingerprint, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            hash,
            data,
        }
    }

    /// Metadata portion written as the frame header.
    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            filename: self.filename.clone(),
            hash: self.hash,
        }
    }
}

/// Whether `name` is a bare file name that cannot escape its directory.
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Frame metadata as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    pub filename: String,
    pub hash: Fingerprint,
}

/// Outcome of admission control for one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionVerdict {
    Accepted,
    Duplicate,
    QueueFull,
}

impl AdmissionVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionVerdict::Accepted => "accepted",
            AdmissionVerdict::Duplicate => "duplicate",
            AdmissionVerdict::QueueFull => "queue_full",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, AdmissionVerdict::Accepted)
    }
}

impl fmt::Display for AdmissionVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal response to an upload stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub status: AdmissionVerdict,
    pub message: String,
}

impl UploadResult {
    pub fn accepted(filename: &str) -> Self {
        Self {
            status: AdmissionVerdict::Accepted,
            message: format!("{} queued for processing", filename),
        }
    }

    pub fn duplicate(filename: &str) -> Self {
        Self {
            status: AdmissionVerdict::Duplicate,
            message: format!("{} matches content already accepted", filename),
        }
    }

    pub fn queue_full(filename: &str) -> Self {
        Self {
            status: AdmissionVerdict::QueueFull,
            message: format!("queue is full, {} was not admitted", filename),
        }
    }

    /// Build the response for a verdict.
    pub fn from_verdict(verdict: AdmissionVerdict, filename: &str) -> Self {
        match verdict {
            AdmissionVerdict::Accepted => Self::accepted(filename),
            AdmissionVerdict::Duplicate => Self::duplicate(filename),
            AdmissionVerdict::QueueFull => Self::queue_full(filename),
        }
    }
}

/// Advisory occupancy answer for the capacity probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub full: bool,
    pub current_size: usize,
}
