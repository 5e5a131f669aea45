//! Producer: watches a source folder and streams new files to a consumer.
//!
//! This crate provides:
//! - The folder watcher and its per-file transfer attempt
//! - The upload ledger that keeps each file from being sent twice
//! - Static producer-to-consumer assignment

pub mod config;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod watcher;

pub use config::ProducerConfig;
pub use error::{ProducerError, ProducerResult};
pub use ledger::{Claim, UploadLedger};
pub use registry::ConsumerRegistry;
pub use watcher::{FolderWatcher, TransferOutcome, Uploader, WatcherConfig};
