//! Job executor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reel_media::{ArtifactLayout, FfmpegEngine, MediaEngine};
use reel_models::Job;
use reel_queue::Scheduler;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tracing::{error, info, warn};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::pipeline::JobPipeline;

/// Fixed-size worker pool pulling jobs from the scheduler.
///
/// A permit is taken before a job is dequeued, so jobs stay in the
/// queue (and count against its capacity) until a worker is free.
pub struct JobExecutor {
    config: WorkerConfig,
    scheduler: Arc<Scheduler>,
    pipeline: Arc<JobPipeline>,
    job_semaphore: Arc<Semaphore>,
    running: Arc<AtomicUsize>,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    /// Create an executor with a custom engine.
    pub fn new(
        config: WorkerConfig,
        scheduler: Arc<Scheduler>,
        engine: Arc<dyn MediaEngine>,
    ) -> WorkerResult<Self> {
        if config.max_concurrent_jobs == 0 {
            return Err(WorkerError::config_error(
                "max_concurrent_jobs must be at least 1",
            ));
        }

        let layout = ArtifactLayout::new(&config.data_dir);
        let pipeline = Arc::new(JobPipeline::new(engine, layout));
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            config,
            scheduler,
            pipeline,
            job_semaphore,
            running: Arc::new(AtomicUsize::new(0)),
            shutdown,
        })
    }

    /// Create an executor running stages through FFmpeg.
    pub fn with_ffmpeg(config: WorkerConfig, scheduler: Arc<Scheduler>) -> WorkerResult<Self> {
        let engine = FfmpegEngine::new(config.transcode.clone(), config.preview.clone())
            .with_stage_timeout(config.stage_timeout);
        Self::new(config, scheduler, Arc::new(engine))
    }

    pub fn layout(&self) -> &ArtifactLayout {
        self.pipeline.layout()
    }

    /// Jobs currently being processed. A permit held while waiting for
    /// the next job does not count.
    pub fn in_flight(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the executor. Returns after shutdown once in-flight jobs finish
    /// or the shutdown timeout elapses.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor with {} workers",
            self.config.max_concurrent_jobs
        );

        self.pipeline.layout().ensure().await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            let permit = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown_rx) => break,
                permit = self.job_semaphore.clone().acquire_owned() => {
                    permit.map_err(|_| WorkerError::config_error("worker semaphore closed"))?
                }
            };

            let job = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown_rx) => break,
                job = self.scheduler.next_job() => job,
            };

            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            metrics::set_in_flight(running);

            let pipeline = Arc::clone(&self.pipeline);
            let scheduler = Arc::clone(&self.scheduler);
            let running = Arc::clone(&self.running);
            tokio::spawn(Self::execute_job(pipeline, scheduler, running, job, permit));
        }

        info!("Shutdown signal received, waiting for in-flight jobs...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!(
                "{} jobs still running after {:?}",
                self.in_flight(),
                self.config.shutdown_timeout
            );
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Execute a single job and report its outcome.
    async fn execute_job(
        pipeline: Arc<JobPipeline>,
        scheduler: Arc<Scheduler>,
        running: Arc<AtomicUsize>,
        job: Job,
        permit: OwnedSemaphorePermit,
    ) {
        let job_id = job.id.clone();
        let record = pipeline.run(job).await;
        metrics::record_job_finished(&record);

        if let Err(e) = scheduler.complete(record).await {
            error!("Failed to record outcome of job {}: {}", job_id, e);
        }

        let remaining = running.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_in_flight(remaining);
        drop(permit);
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        while self.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::RecordingEngine;
    use async_trait::async_trait;
    use bytes::Bytes;
    use reel_media::MediaResult;
    use reel_models::{AdmissionVerdict, Fingerprint, JobState};
    use reel_queue::QueueConfig;
    use std::path::Path;
    use std::sync::Mutex;

    fn job(name: &str) -> Job {
        Job::new(name, Fingerprint::of(name.as_bytes()), Bytes::from_static(b"raw"))
    }

    fn scheduler(capacity: usize) -> Arc<Scheduler> {
        Arc::new(Scheduler::new(QueueConfig::default().with_capacity(capacity)).unwrap())
    }

    async fn wait_until<F: Fn() -> bool>(check: F) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    /// Engine whose transcode blocks until the test releases it.
    struct GatedEngine {
        gate: Semaphore,
        calls: Mutex<Vec<String>>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl GatedEngine {
        fn new() -> Self {
            Self {
                gate: Semaphore::new(0),
                calls: Mutex::new(Vec::new()),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, stage: &str, input: &Path) {
            let name = input.file_name().unwrap().to_string_lossy();
            self.calls.lock().unwrap().push(format!("{}:{}", stage, name));
        }
    }

    #[async_trait]
    impl MediaEngine for GatedEngine {
        async fn transcode(&self, input: &Path, _output: &Path) -> MediaResult<()> {
            self.record("transcode", input);
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(active, Ordering::SeqCst);

            self.gate.acquire().await.unwrap().forget();

            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        async fn preview(&self, input: &Path, _output: &Path) -> MediaResult<()> {
            self.record("preview", input);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_single_worker_processes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = scheduler(5);
        let engine = Arc::new(GatedEngine::new());
        let config = WorkerConfig::default().with_data_dir(dir.path());
        let executor =
            Arc::new(JobExecutor::new(config, scheduler.clone(), engine.clone()).unwrap());

        assert_eq!(scheduler.try_admit(job("j1.mp4")).await, AdmissionVerdict::Accepted);
        assert_eq!(scheduler.try_admit(job("j2.mp4")).await, AdmissionVerdict::Accepted);

        let runner = {
            let executor = executor.clone();
            tokio::spawn(async move { executor.run().await })
        };

        wait_until(|| engine.calls().len() == 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        // j2 stays queued while j1 is in stage 1.
        assert_eq!(engine.calls(), vec!["transcode:j1.mp4"]);
        assert_eq!(scheduler.queued_filenames().await, vec!["j2.mp4"]);

        engine.gate.add_permits(2);
        wait_until(|| engine.calls().len() == 4).await;
        assert_eq!(
            engine.calls(),
            vec![
                "transcode:j1.mp4",
                "preview:j1.mp4",
                "transcode:j2.mp4",
                "preview:j2.mp4"
            ]
        );
        assert_eq!(engine.peak.load(Ordering::SeqCst), 1);

        executor.shutdown();
        runner.await.unwrap().unwrap();
        assert_eq!(scheduler.completed_artifacts().await, vec!["j1.mp4", "j2.mp4"]);
    }

    #[tokio::test]
    async fn test_concurrency_bound() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = scheduler(10);
        let engine = Arc::new(GatedEngine::new());
        let config = WorkerConfig::default()
            .with_concurrency(2)
            .with_data_dir(dir.path());
        let executor =
            Arc::new(JobExecutor::new(config, scheduler.clone(), engine.clone()).unwrap());

        for i in 0..5 {
            scheduler.try_admit(job(&format!("j{}.mp4", i))).await;
        }

        let runner = {
            let executor = executor.clone();
            tokio::spawn(async move { executor.run().await })
        };

        wait_until(|| engine.calls().len() == 2).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.active.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.snapshot().await.processing, 2);
        assert_eq!(scheduler.status().await.current_size, 3);

        engine.gate.add_permits(5);
        wait_until(|| engine.calls().iter().filter(|c| c.starts_with("preview")).count() == 5)
            .await;
        assert!(engine.peak.load(Ordering::SeqCst) <= 2);

        executor.shutdown();
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_failed_job_releases_slot() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = scheduler(5);
        let engine = Arc::new(RecordingEngine {
            fail_transcode: true,
            ..Default::default()
        });
        let config = WorkerConfig::default().with_data_dir(dir.path());
        let executor =
            Arc::new(JobExecutor::new(config, scheduler.clone(), engine.clone()).unwrap());

        scheduler.try_admit(job("j1.mp4")).await;
        scheduler.try_admit(job("j2.mp4")).await;

        let runner = {
            let executor = executor.clone();
            tokio::spawn(async move { executor.run().await })
        };

        let finished = async {
            loop {
                if scheduler.finished_jobs().await.len() == 2 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), finished).await.unwrap();

        let records = scheduler.finished_jobs().await;
        assert!(records.iter().all(|r| r.state == JobState::Failed));
        assert_eq!(engine.calls(), vec!["transcode:j1.mp4", "transcode:j2.mp4"]);
        assert_eq!(scheduler.snapshot().await.processing, 0);

        executor.shutdown();
        runner.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_in_flight_counts_running_jobs_only() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = scheduler(5);
        let engine = Arc::new(GatedEngine::new());
        let config = WorkerConfig::default()
            .with_concurrency(3)
            .with_data_dir(dir.path());
        let executor =
            Arc::new(JobExecutor::new(config, scheduler.clone(), engine.clone()).unwrap());

        scheduler.try_admit(job("j1.mp4")).await;

        let runner = {
            let executor = executor.clone();
            tokio::spawn(async move { executor.run().await })
        };

        wait_until(|| engine.calls().len() == 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        // The dispatcher is parked in next_job holding a second permit.
        assert_eq!(executor.in_flight(), 1);

        engine.gate.add_permits(1);
        wait_until(|| executor.in_flight() == 0).await;
        assert_eq!(scheduler.completed_artifacts().await, vec!["j1.mp4"]);

        executor.shutdown();
        runner.await.unwrap().unwrap();
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = WorkerConfig::default().with_concurrency(0);
        let result = JobExecutor::new(
            config,
            scheduler(1),
            Arc::new(RecordingEngine::default()),
        );
        assert!(matches!(result, Err(WorkerError::ConfigError(_))));
    }
}
