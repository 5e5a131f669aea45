//! Structured job logging utilities.
//!
//! Provides consistent, structured logging for job processing with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};
use reel_models::Job;

/// Job logger for structured logging with consistent formatting.
///
/// Every line carries the job ID and the original filename.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    filename: String,
}

impl JobLogger {
    /// Create a new job logger for a job.
    pub fn new(job: &Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            filename: job.filename.clone(),
        }
    }

    /// Log the start of processing.
    pub fn log_start(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            filename = %self.filename,
            "Job started: {}", message
        );
    }

    /// Log a stage transition.
    pub fn log_progress(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            filename = %self.filename,
            "Job progress: {}", message
        );
    }

    /// Log a recoverable oddity.
    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            filename = %self.filename,
            "Job warning: {}", message
        );
    }

    /// Log a failure.
    pub fn log_error(&self, message: &str) {
        error!(
            job_id = %self.job_id,
            filename = %self.filename,
            "Job error: {}", message
        );
    }

    /// Log successful completion.
    pub fn log_completion(&self, message: &str) {
        info!(
            job_id = %self.job_id,
            filename = %self.filename,
            "Job completed: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            filename = %self.filename
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use reel_models::Fingerprint;

    #[test]
    fn test_job_logger_creation() {
        let job = Job::new("clip.mp4", Fingerprint::of(b"clip"), Bytes::new());
        let logger = JobLogger::new(&job);

        assert_eq!(logger.job_id(), job.id.to_string());
        assert_eq!(logger.filename(), "clip.mp4");
    }
}
