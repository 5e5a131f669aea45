//! Transcode and preview operations behind a swappable engine.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Encoding settings for the compressed artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeProfile {
    pub video_codec: String,
    pub audio_codec: String,
    /// Output frame size, `WIDTHxHEIGHT`
    pub size: String,
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            size: "640x480".to_string(),
        }
    }
}

/// Settings for the preview clip.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewProfile {
    pub duration_secs: f64,
}

impl Default for PreviewProfile {
    fn default() -> Self {
        Self { duration_secs: 10.0 }
    }
}

/// External engine performing the two processing stages.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Stage 1: produce the compressed artifact from a raw upload.
    async fn transcode(&self, input: &Path, output: &Path) -> MediaResult<()>;

    /// Stage 2: produce a short preview from the compressed artifact.
    async fn preview(&self, input: &Path, output: &Path) -> MediaResult<()>;
}

/// [`MediaEngine`] backed by the `ffmpeg` binary.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine {
    runner: FfmpegRunner,
    transcode: TranscodeProfile,
    preview: PreviewProfile,
}

impl FfmpegEngine {
    pub fn new(transcode: TranscodeProfile, preview: PreviewProfile) -> Self {
        Self {
            runner: FfmpegRunner::new(),
            transcode,
            preview,
        }
    }

    /// Kill any single invocation that exceeds `timeout`.
    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.runner = self.runner.with_timeout(timeout);
        self
    }

    pub fn with_runner(mut self, runner: FfmpegRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn transcode_command(&self, input: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(input, output)
            .video_codec(&self.transcode.video_codec)
            .audio_codec(&self.transcode.audio_codec)
            .size(&self.transcode.size)
    }

    pub fn preview_command(&self, input: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(input, output).duration(self.preview.duration_secs)
    }
}

fn ensure_input(input: &Path) -> MediaResult<()> {
    if !input.is_file() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }
    Ok(())
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn transcode(&self, input: &Path, output: &Path) -> MediaResult<()> {
        ensure_input(input)?;
        let cmd = self.transcode_command(input, output);
        let name = output.display().to_string();

        self.runner
            .run_with_progress(&cmd, move |p| {
                debug!(output = %name, out_time_ms = p.out_time_ms, speed = p.speed, "Transcode progress");
            })
            .await?;

        info!("Compressed {}", output.display());
        Ok(())
    }

    async fn preview(&self, input: &Path, output: &Path) -> MediaResult<()> {
        ensure_input(input)?;
        let cmd = self.preview_command(input, output);
        let name = output.display().to_string();
        let total_ms = (self.preview.duration_secs * 1000.0) as i64;

        self.runner
            .run_with_progress(&cmd, move |p| {
                debug!(output = %name, percent = p.percentage(total_ms), "Preview progress");
            })
            .await?;

        info!("Preview created {}", output.display());
        Ok(())
    }
}
