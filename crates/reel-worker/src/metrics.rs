//! Job outcome metrics.

use metrics::{counter, gauge, histogram};
use reel_models::{JobRecord, JobState};

pub mod names {
    pub const JOBS_FINISHED: &str = "reel_jobs_finished_total";
    pub const JOB_DURATION: &str = "reel_job_duration_seconds";
    pub const JOBS_IN_FLIGHT: &str = "reel_jobs_in_flight";
}

/// Record the outcome of a finished job.
pub fn record_job_finished(record: &JobRecord) {
    let outcome = if record.state == JobState::Done {
        "done"
    } else {
        "failed"
    };
    counter!(names::JOBS_FINISHED, "outcome" => outcome).increment(1);

    if let (Some(start), Some(end)) = (record.started_at, record.finished_at) {
        let secs = (end - start).num_milliseconds() as f64 / 1000.0;
        histogram!(names::JOB_DURATION, "outcome" => outcome).record(secs);
    }
}

/// Set the number of jobs currently owned by workers.
pub fn set_in_flight(count: usize) {
    gauge!(names::JOBS_IN_FLIGHT).set(count as f64);
}
