//! Shared data models for the Reel ingestion pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Content fingerprints
//! - Jobs and their processing states
//! - Transfer protocol frames and admission verdicts
//! - Status events pushed to dashboard observers

pub mod fingerprint;
pub mod job;
pub mod status;
pub mod transfer;

// Re-export common types
pub use fingerprint::{Fingerprint, FingerprintError, FingerprintHasher, FINGERPRINT_LEN};
pub use job::{InvalidTransition, Job, JobId, JobRecord, JobState};
pub use status::{QueueSnapshot, StatusEvent};
pub use transfer::{is_safe_filename, AdmissionVerdict, Frame, FrameHeader, QueueStatus, UploadResult};
