//! Admission control and job hand-off.

use std::collections::HashSet;

use reel_models::{
    AdmissionVerdict, Job, JobId, JobRecord, JobState, QueueSnapshot, QueueStatus, StatusEvent,
};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use crate::dedup::{DedupIndex, DedupPolicy};
use crate::error::{QueueError, QueueResult};
use crate::queue::{IngestionQueue, QueueConfig};
use crate::status::StatusHub;

/// State guarded by a single lock so admission decisions are atomic.
#[derive(Debug)]
struct SchedulerState {
    queue: IngestionQueue,
    dedup: DedupIndex,
    processing: HashSet<JobId>,
    finished: Vec<JobRecord>,
}

impl SchedulerState {
    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            full: self.queue.is_full(),
            size: self.queue.len(),
            capacity: self.queue.capacity(),
            processing: self.processing.len(),
        }
    }

    /// Filenames of finished artifacts, each listed once in completion order.
    fn completed_artifacts(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.finished
            .iter()
            .filter(|record| record.state == JobState::Done)
            .filter(|record| seen.insert(record.filename.as_str()))
            .map(|record| record.filename.clone())
            .collect()
    }
}

/// Owns the ingestion queue, the dedup index and the status hub.
pub struct Scheduler {
    state: Mutex<SchedulerState>,
    job_ready: Notify,
    hub: StatusHub,
    policy: DedupPolicy,
}

impl Scheduler {
    /// Create a scheduler with its own status hub.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let hub = StatusHub::new(config.status_buffer);
        Self::with_hub(config, hub)
    }

    /// Create a scheduler publishing to an existing hub.
    pub fn with_hub(config: QueueConfig, hub: StatusHub) -> QueueResult<Self> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(SchedulerState {
                queue: IngestionQueue::new(config.capacity),
                dedup: DedupIndex::new(),
                processing: HashSet::new(),
                finished: Vec::new(),
            }),
            job_ready: Notify::new(),
            hub,
            policy: config.dedup_policy,
        })
    }

    pub fn hub(&self) -> &StatusHub {
        &self.hub
    }

    /// Admit a job if there is room and its content has not been seen.
    ///
    /// Capacity is checked before deduplication, so a full queue answers
    /// `QueueFull` even for content that is already known.
    pub async fn try_admit(&self, job: Job) -> AdmissionVerdict {
        let mut state = self.state.lock().await;

        if state.queue.is_full() {
            debug!(filename = %job.filename, "Admission refused: queue full");
            return AdmissionVerdict::QueueFull;
        }
        if state.dedup.contains(&job.fingerprint) {
            debug!(
                filename = %job.filename,
                fingerprint = %job.fingerprint.short(),
                "Admission refused: duplicate content"
            );
            return AdmissionVerdict::Duplicate;
        }

        let fingerprint = job.fingerprint;
        let filename = job.filename.clone();
        let job_id = job.id.clone();
        if state.queue.push(job).is_err() {
            return AdmissionVerdict::QueueFull;
        }
        state.dedup.insert(fingerprint);

        info!(
            job_id = %job_id,
            filename = %filename,
            fingerprint = %fingerprint.short(),
            queued = state.queue.len(),
            "Job admitted"
        );
        self.hub.publish(StatusEvent::queue(state.snapshot()));
        drop(state);

        self.job_ready.notify_one();
        AdmissionVerdict::Accepted
    }

    /// Take the oldest queued job, if any, and mark it as processing.
    pub async fn dequeue(&self) -> Option<Job> {
        let mut state = self.state.lock().await;
        let job = state.queue.pop()?;
        state.processing.insert(job.id.clone());
        self.hub.publish(StatusEvent::queue(state.snapshot()));
        Some(job)
    }

    /// Wait until a job is available and take it.
    pub async fn next_job(&self) -> Job {
        loop {
            // Registered before checking so a concurrent admission cannot be missed.
            let notified = self.job_ready.notified();
            if let Some(job) = self.dequeue().await {
                return job;
            }
            notified.await;
        }
    }

    /// Record the terminal outcome of a processed job.
    pub async fn complete(&self, record: JobRecord) -> QueueResult<()> {
        if !record.state.is_terminal() {
            return Err(QueueError::NotTerminal {
                id: record.id,
                state: record.state.to_string(),
            });
        }

        let mut state = self.state.lock().await;
        if !state.processing.remove(&record.id) {
            return Err(QueueError::NotProcessing(record.id));
        }

        let done = record.state == JobState::Done;
        if !done && self.policy == DedupPolicy::ReleaseOnFailure {
            state.dedup.remove(&record.fingerprint);
            warn!(
                job_id = %record.id,
                fingerprint = %record.fingerprint.short(),
                "Released fingerprint of failed job"
            );
        }
        state.finished.push(record);

        self.hub.publish(StatusEvent::queue(state.snapshot()));
        if done {
            self.hub
                .publish(StatusEvent::videos(state.completed_artifacts()));
        }
        Ok(())
    }

    /// Advisory answer for the capacity probe. Never mutates state.
    pub async fn status(&self) -> QueueStatus {
        let state = self.state.lock().await;
        QueueStatus {
            full: state.queue.is_full(),
            current_size: state.queue.len(),
        }
    }

    pub async fn snapshot(&self) -> QueueSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Filenames of jobs that finished both stages, oldest first.
    pub async fn completed_artifacts(&self) -> Vec<String> {
        self.state.lock().await.completed_artifacts()
    }

    /// Terminal records of all finished jobs, oldest first.
    pub async fn finished_jobs(&self) -> Vec<JobRecord> {
        self.state.lock().await.finished.clone()
    }

    /// Filenames waiting in the queue, in dequeue order.
    pub async fn queued_filenames(&self) -> Vec<String> {
        self.state.lock().await.queue.filenames()
    }

    /// Number of distinct fingerprints ever accepted (minus released ones).
    pub async fn known_fingerprints(&self) -> usize {
        self.state.lock().await.dedup.len()
    }
}
