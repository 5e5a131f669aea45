//! Per-job stage state machine.

use std::sync::Arc;

use reel_media::{ArtifactLayout, MediaEngine};
use reel_models::{Job, JobRecord, JobState};
use tracing::Instrument;

use crate::error::{Stage, WorkerError, WorkerResult};
use crate::logging::JobLogger;

/// Drives one job through staging, transcode and preview.
///
/// A job reaches `Done` only after both stages succeed. The first failure
/// moves it to `Failed` and no later stage runs. There is no retry.
pub struct JobPipeline {
    engine: Arc<dyn MediaEngine>,
    layout: ArtifactLayout,
}

impl JobPipeline {
    pub fn new(engine: Arc<dyn MediaEngine>, layout: ArtifactLayout) -> Self {
        Self { engine, layout }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Process a dequeued job to a terminal state.
    pub async fn run(&self, mut job: Job) -> JobRecord {
        let logger = JobLogger::new(&job);
        let span = logger.create_span();

        async {
            logger.log_start(&format!("{} bytes", job.size_bytes));

            match self.drive(&mut job, &logger).await {
                Ok(()) => {
                    logger.log_completion(&format!(
                        "in {} ms",
                        job.elapsed_ms().unwrap_or_default()
                    ));
                }
                Err(e) => {
                    logger.log_error(&e.to_string());
                    if !job.state.is_terminal() {
                        if let Err(transition) = job.fail(e.to_string()) {
                            logger.log_warning(&transition.to_string());
                        }
                    }
                }
            }
        }
        .instrument(span)
        .await;

        job.to_record()
    }

    async fn drive(&self, job: &mut Job, logger: &JobLogger) -> WorkerResult<()> {
        job.advance(JobState::Transcoding)?;

        let upload = self
            .layout
            .upload_path(&job.filename)
            .map_err(|e| WorkerError::stage_failed(Stage::Staging, e))?;
        let compressed = self
            .layout
            .compressed_path(&job.filename)
            .map_err(|e| WorkerError::stage_failed(Stage::Transcode, e))?;
        let preview = self
            .layout
            .preview_path(&job.filename)
            .map_err(|e| WorkerError::stage_failed(Stage::Preview, e))?;

        let payload = job.take_payload();
        tokio::fs::write(&upload, &payload)
            .await
            .map_err(|e| WorkerError::stage_failed(Stage::Staging, e))?;
        drop(payload);

        logger.log_progress("transcoding");
        self.engine
            .transcode(&upload, &compressed)
            .await
            .map_err(|e| WorkerError::stage_failed(Stage::Transcode, e))?;

        job.advance(JobState::Previewing)?;
        logger.log_progress("creating preview");
        self.engine
            .preview(&compressed, &preview)
            .await
            .map_err(|e| WorkerError::stage_failed(Stage::Preview, e))?;

        job.advance(JobState::Done)?;
        Ok(())
    }
}
