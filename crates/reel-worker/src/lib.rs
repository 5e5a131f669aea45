//! Fixed-size worker pool for the ingestion pipeline.
//!
//! This crate provides:
//! - The job executor bounding concurrent processing to N workers
//! - The per-job stage state machine (stage, transcode, preview)
//! - Structured job logging and outcome metrics

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod pipeline;

pub use config::WorkerConfig;
pub use error::{Stage, WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use pipeline::JobPipeline;
