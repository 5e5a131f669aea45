//! Job definitions for the ingestion pipeline.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::Fingerprint;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Admitted and waiting in the ingestion queue
    #[default]
    Queued,
    /// Stage 1: producing the compressed artifact
    Transcoding,
    /// Stage 2: producing the preview from the compressed artifact
    Previewing,
    /// Both stages succeeded
    Done,
    /// A stage failed; the job is abandoned
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Transcoding => "transcoding",
            JobState::Previewing => "previewing",
            JobState::Done => "done",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    /// Whether a worker currently owns a job in this state.
    pub fn is_processing(&self) -> bool {
        matches!(self, JobState::Transcoding | JobState::Previewing)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Queued, JobState::Transcoding)
                | (JobState::Transcoding, JobState::Previewing)
                | (JobState::Transcoding, JobState::Failed)
                | (JobState::Previewing, JobState::Done)
                | (JobState::Previewing, JobState::Failed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attempted an illegal state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid job transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: JobState,
    pub to: JobState,
}

/// An admitted unit of work.
///
/// Owned by the ingestion queue until dequeued, then by exactly one worker.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Original filename supplied by the producer
    pub filename: String,

    /// Content fingerprint pinned at transfer time
    pub fingerprint: Fingerprint,

    /// Raw uploaded bytes; released once staged to disk
    pub payload: Bytes,

    /// Payload size, kept after the payload is released
    pub size_bytes: u64,

    pub state: JobState,

    pub enqueued_at: DateTime<Utc>,

    pub started_at: Option<DateTime<Utc>>,

    pub finished_at: Option<DateTime<Utc>>,

    /// Failure description (if failed)
    pub error: Option<String>,
}

impl Job {
    /// Create a queued job for an accepted upload.
    pub fn new(filename: impl Into<String>, fingerprint: Fingerprint, payload: Bytes) -> Self {
        Self {
            id: JobId::new(),
            filename: filename.into(),
            fingerprint,
            size_bytes: payload.len() as u64,
            payload,
            state: JobState::Queued,
            enqueued_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// Move to the next state, recording timestamps.
    pub fn advance(&mut self, next: JobState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        if self.state == JobState::Queued {
            self.started_at = Some(Utc::now());
        }
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        self.state = next;
        Ok(())
    }

    /// Mark the job as failed from whichever stage it is in.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), InvalidTransition> {
        self.advance(JobState::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Release the payload bytes, returning them.
    pub fn take_payload(&mut self) -> Bytes {
        std::mem::take(&mut self.payload)
    }

    /// Processing time so far, if started.
    pub fn elapsed_ms(&self) -> Option<i64> {
        let start = self.started_at?;
        let end = self.finished_at.unwrap_or_else(Utc::now);
        Some((end - start).num_milliseconds())
    }

    /// Payload-free summary of this job.
    pub fn to_record(&self) -> JobRecord {
        JobRecord {
            id: self.id.clone(),
            filename: self.filename.clone(),
            fingerprint: self.fingerprint,
            size_bytes: self.size_bytes,
            state: self.state,
            enqueued_at: self.enqueued_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            error: self.error.clone(),
        }
    }
}

/// Terminal (or in-flight) summary of a job without its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub filename: String,
    pub fingerprint: Fingerprint,
    pub size_bytes: u64,
    pub state: JobState,
    pub enqueued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new("clip.mp4", Fingerprint::of(b"clip"), Bytes::from_static(b"clip"))
    }

    #[test]
    fn test_job_creation() {
        let job = job();
        assert_eq!(job.state, JobState::Queued);
        assert_eq!(job.size_bytes, 4);
        assert!(job.started_at.is_none());
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut job = job();

        job.advance(JobState::Transcoding).unwrap();
        assert!(job.started_at.is_some());
        assert!(job.state.is_processing());

        job.advance(JobState::Previewing).unwrap();
        job.advance(JobState::Done).unwrap();
        assert!(job.state.is_terminal());
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn test_cannot_skip_stages() {
        let mut job = job();
        let err = job.advance(JobState::Previewing).unwrap_err();
        assert_eq!(err.from, JobState::Queued);
        assert_eq!(err.to, JobState::Previewing);

        job.advance(JobState::Transcoding).unwrap();
        assert!(job.advance(JobState::Done).is_err());
    }

    #[test]
    fn test_fail_from_stage() {
        let mut job = job();
        job.advance(JobState::Transcoding).unwrap();
        job.fail("encoder exited with status 1").unwrap();

        let record = job.to_record();
        assert_eq!(record.state, JobState::Failed);
        assert_eq!(record.error.as_deref(), Some("encoder exited with status 1"));

        // Terminal states accept no further transitions.
        assert!(job.advance(JobState::Previewing).is_err());
    }

    #[test]
    fn test_take_payload_keeps_size() {
        let mut job = job();
        let payload = job.take_payload();
        assert_eq!(payload.as_ref(), b"clip");
        assert!(job.payload.is_empty());
        assert_eq!(job.size_bytes, 4);
    }

    #[test]
    fn test_state_serde() {
        assert_eq!(
            serde_json::to_string(&JobState::Transcoding).unwrap(),
            "\"transcoding\""
        );
    }
}
