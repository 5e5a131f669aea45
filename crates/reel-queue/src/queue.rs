//! Bounded FIFO of admitted jobs.

use std::collections::VecDeque;

use reel_models::Job;

use crate::dedup::DedupPolicy;
use crate::error::{QueueError, QueueResult};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of jobs waiting for a worker
    pub capacity: usize,
    /// Fingerprint handling for failed jobs
    pub dedup_policy: DedupPolicy,
    /// Per-subscriber buffer of the status fan-out
    pub status_buffer: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            dedup_policy: DedupPolicy::Permanent,
            status_buffer: 64,
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            capacity: std::env::var("CONSUMER_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            dedup_policy: std::env::var("CONSUMER_RELEASE_FAILED_FINGERPRINTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            status_buffer: std::env::var("CONSUMER_STATUS_BUFFER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(64),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn validate(&self) -> QueueResult<()> {
        if self.capacity == 0 {
            return Err(QueueError::invalid_config("capacity must be at least 1"));
        }
        if self.status_buffer == 0 {
            return Err(QueueError::invalid_config("status buffer must be at least 1"));
        }
        Ok(())
    }
}

/// FIFO of admitted jobs with a fixed capacity.
#[derive(Debug)]
pub struct IngestionQueue {
    jobs: VecDeque<Job>,
    capacity: usize,
}

impl IngestionQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            jobs: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.jobs.len() >= self.capacity
    }

    /// Append a job, handing it back if the queue is full.
    pub fn push(&mut self, job: Job) -> Result<(), Job> {
        if self.is_full() {
            return Err(job);
        }
        self.jobs.push_back(job);
        Ok(())
    }

    /// Remove the oldest job.
    pub fn pop(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    /// Filenames in queue order.
    pub fn filenames(&self) -> Vec<String> {
        self.jobs.iter().map(|job| job.filename.clone()).collect()
    }
}
