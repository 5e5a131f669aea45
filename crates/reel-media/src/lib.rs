//! FFmpeg CLI wrapper for the processing stages.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - The transcode and preview stages behind the [`MediaEngine`] trait
//! - The consumer's artifact directory layout

pub mod command;
pub mod engine;
pub mod error;
pub mod layout;
pub mod progress;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use engine::{FfmpegEngine, MediaEngine, PreviewProfile, TranscodeProfile};
pub use error::{MediaError, MediaResult};
pub use layout::ArtifactLayout;
pub use progress::FfmpegProgress;
