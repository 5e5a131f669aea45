//! Consumer server.
//!
//! This crate provides:
//! - The transfer RPCs (`/rpc/upload-video`, `/rpc/queue-status`)
//! - The dashboard surface and its Server-Sent Events stream
//! - Prometheus metrics

pub mod config;
pub mod drop_folder;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ConfigError, ConsumerConfig};
pub use drop_folder::{DropReceipt, DropRouter};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
