//! Bounded ingestion queue with content deduplication.
//!
//! This crate provides:
//! - Atomic admission control (capacity first, then deduplication)
//! - FIFO hand-off of admitted jobs to workers
//! - Status events via a broadcast fan-out

pub mod dedup;
pub mod error;
pub mod queue;
pub mod scheduler;
pub mod status;

pub use dedup::{DedupIndex, DedupPolicy};
pub use error::{QueueError, QueueResult};
pub use queue::{IngestionQueue, QueueConfig};
pub use scheduler::Scheduler;
pub use status::StatusHub;
