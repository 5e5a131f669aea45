//! Framed upload protocol between producers and consumers.
//!
//! This crate provides:
//! - The length-prefixed frame codec used on the upload stream
//! - Server-side reassembly that pins filename and fingerprint per stream
//! - The producer-side HTTP client for probing capacity and uploading files

pub mod assembler;
pub mod client;
pub mod codec;
pub mod error;

pub use assembler::{AssembledUpload, UploadAssembler};
pub use client::{fingerprint_file, TransferClient, TransferClientConfig};
pub use codec::{encode_frame, FrameDecoder, DEFAULT_CHUNK_LEN, MAX_CHUNK_LEN, MAX_HEADER_LEN};
pub use error::{TransferError, TransferResult};

/// Route accepting a streamed upload.
pub const UPLOAD_PATH: &str = "/rpc/upload-video";

/// Route answering the capacity probe.
pub const QUEUE_STATUS_PATH: &str = "/rpc/queue-status";
