//! Source folder watcher.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use reel_models::{AdmissionVerdict, QueueStatus, UploadResult};
use reel_transfer::{TransferClient, TransferResult};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::ProducerConfig;
use crate::error::ProducerResult;
use crate::ledger::{Claim, UploadLedger};

/// Consumer-facing half of a transfer.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn probe_capacity(&self) -> TransferResult<QueueStatus>;

    async fn upload_file(&self, path: &Path, filename: &str) -> TransferResult<UploadResult>;
}

#[async_trait]
impl Uploader for TransferClient {
    async fn probe_capacity(&self) -> TransferResult<QueueStatus> {
        TransferClient::probe_capacity(self).await
    }

    async fn upload_file(&self, path: &Path, filename: &str) -> TransferResult<UploadResult> {
        TransferClient::upload_file(self, path, filename).await
    }
}

/// What happened to one transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Accepted earlier, nothing sent
    AlreadyUploaded,
    /// Another attempt for the same file is running
    InFlight,
    /// The probe reported a full queue, nothing sent
    ProbeFull,
    Accepted,
    Duplicate,
    /// Sent, but the queue filled up before admission
    QueueFull,
    Failed(String),
}

impl TransferOutcome {
    /// Whether a later event or rescan should try the file again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransferOutcome::ProbeFull | TransferOutcome::QueueFull | TransferOutcome::Failed(_)
        )
    }
}

/// Watcher timing.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Wait after a filesystem event before reading the file
    pub settle_delay: Duration,
    /// Periodic rescan; `None` relies on filesystem events alone
    pub rescan_interval: Option<Duration>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(100),
            rescan_interval: None,
        }
    }
}

impl From<&ProducerConfig> for WatcherConfig {
    fn from(config: &ProducerConfig) -> Self {
        Self {
            settle_delay: config.settle_delay,
            rescan_interval: config.rescan_interval,
        }
    }
}

/// Watches one source folder and transfers every new regular file once.
///
/// Hidden files (leading `.`) are ignored, which keeps partially written
/// `.name.part` files out of the pipeline.
pub struct FolderWatcher<U> {
    folder: PathBuf,
    uploader: Arc<U>,
    ledger: Arc<UploadLedger>,
    config: WatcherConfig,
}

impl<U: Uploader + 'static> FolderWatcher<U> {
    pub fn new(folder: impl Into<PathBuf>, uploader: Arc<U>, config: WatcherConfig) -> Self {
        Self {
            folder: folder.into(),
            uploader,
            ledger: Arc::new(UploadLedger::new()),
            config,
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn ledger(&self) -> &UploadLedger {
        &self.ledger
    }

    /// Scan, then follow filesystem events (and rescans, if configured).
    ///
    /// Runs until the task is dropped. If the folder cannot be watched the
    /// watcher keeps going on scans alone.
    pub async fn run(self: Arc<Self>) {
        info!("Scanning folder {} for videos...", self.folder.display());
        self.scan_logged().await;

        let (tx, mut events) = mpsc::unbounded_channel();
        let _watcher = match self.start_watch(tx) {
            Ok(watcher) => {
                info!("Watching folder {} for new videos...", self.folder.display());
                Some(watcher)
            }
            Err(e) => {
                error!(
                    "Error watching folder {}: {}; continuing with scans only",
                    self.folder.display(),
                    e
                );
                None
            }
        };

        let mut rescan = self.config.rescan_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        loop {
            tokio::select! {
                Some(path) = events.recv() => {
                    let this = Arc::clone(&self);
                    tokio::spawn(async move { this.handle_event(path).await });
                }
                _ = next_tick(&mut rescan) => {
                    let this = Arc::clone(&self);
                    tokio::spawn(async move { this.scan_logged().await });
                }
            }
        }
    }

    fn start_watch(&self, tx: mpsc::UnboundedSender<PathBuf>) -> ProducerResult<RecommendedWatcher> {
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_arrival(&event.kind) => {
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
                Ok(_) => {}
                Err(e) => error!("Watch error: {}", e),
            },
            Config::default(),
        )?;
        watcher.watch(&self.folder, RecursiveMode::NonRecursive)?;
        Ok(watcher)
    }

    async fn handle_event(&self, path: PathBuf) {
        tokio::time::sleep(self.config.settle_delay).await;

        let Some(filename) = visible_name(&path) else {
            return;
        };
        if !is_regular_file(&path).await {
            return;
        }

        info!("New file detected: {}", filename);
        self.attempt(&filename).await;
    }

    async fn scan_logged(&self) {
        if let Err(e) = self.scan().await {
            error!("Error reading folder {}: {}", self.folder.display(), e);
        }
    }

    /// Attempt a transfer for every visible regular file in the folder, in name order.
    pub async fn scan(&self) -> ProducerResult<Vec<(String, TransferOutcome)>> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.folder).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(name) = visible_name(&path) {
                if is_regular_file(&path).await {
                    names.push(name);
                }
            }
        }
        names.sort();

        let mut outcomes = Vec::with_capacity(names.len());
        for name in names {
            let outcome = self.attempt(&name).await;
            outcomes.push((name, outcome));
        }
        Ok(outcomes)
    }

    /// Transfer `filename` from the folder unless it was already accepted or is in flight.
    pub async fn attempt(&self, filename: &str) -> TransferOutcome {
        match self.ledger.claim(filename).await {
            Claim::AlreadyUploaded => {
                debug!("File {} already uploaded, skipping", filename);
                return TransferOutcome::AlreadyUploaded;
            }
            Claim::InFlight => {
                debug!("File {} already being uploaded, skipping", filename);
                return TransferOutcome::InFlight;
            }
            Claim::Claimed => {}
        }

        let outcome = self.transfer(filename).await;
        self.ledger
            .release(filename, outcome == TransferOutcome::Accepted)
            .await;
        outcome
    }

    async fn transfer(&self, filename: &str) -> TransferOutcome {
        match self.uploader.probe_capacity().await {
            Ok(status) if status.full => {
                info!("Queue full, skipping {}", filename);
                return TransferOutcome::ProbeFull;
            }
            Ok(_) => {}
            Err(e) => {
                error!("Queue status error for {}: {}", filename, e);
                return TransferOutcome::Failed(e.to_string());
            }
        }

        info!("Uploading {} from {}", filename, self.folder.display());
        let path = self.folder.join(filename);
        match self.uploader.upload_file(&path, filename).await {
            Ok(result) => match result.status {
                AdmissionVerdict::Accepted => {
                    info!(filename = %filename, "Upload accepted: {}", result.message);
                    TransferOutcome::Accepted
                }
                AdmissionVerdict::Duplicate => {
                    info!(filename = %filename, "Upload was a duplicate: {}", result.message);
                    TransferOutcome::Duplicate
                }
                AdmissionVerdict::QueueFull => {
                    warn!(filename = %filename, "Upload refused: {}", result.message);
                    TransferOutcome::QueueFull
                }
            },
            Err(e) => {
                error!(filename = %filename, "Upload failed: {}", e);
                TransferOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Created files and renames into the folder.
fn is_arrival(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_)))
}

fn visible_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') {
        None
    } else {
        Some(name.to_string())
    }
}

async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_transfer::{TransferClientConfig, TransferError};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Semaphore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Uploader answering from a script and recording what was sent.
    #[derive(Default)]
    struct FakeUploader {
        full: AtomicBool,
        verdicts: Mutex<VecDeque<TransferResult<UploadResult>>>,
        uploads: Mutex<Vec<(String, Vec<u8>)>>,
        gate: Option<Semaphore>,
    }

    impl FakeUploader {
        fn answering(verdicts: Vec<TransferResult<UploadResult>>) -> Self {
            Self {
                verdicts: Mutex::new(verdicts.into()),
                ..Default::default()
            }
        }

        fn uploaded_names(&self) -> Vec<String> {
            self.uploads.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
        }
    }

    #[async_trait]
    impl Uploader for FakeUploader {
        async fn probe_capacity(&self) -> TransferResult<QueueStatus> {
            Ok(QueueStatus {
                full: self.full.load(Ordering::SeqCst),
                current_size: 0,
            })
        }

        async fn upload_file(&self, path: &Path, filename: &str) -> TransferResult<UploadResult> {
            let data = tokio::fs::read(path).await?;
            self.uploads.lock().unwrap().push((filename.to_string(), data));
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            let next = self.verdicts.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(UploadResult::accepted(filename)))
        }
    }

    fn watcher(dir: &Path, uploader: Arc<FakeUploader>) -> FolderWatcher<FakeUploader> {
        let config = WatcherConfig {
            settle_delay: Duration::from_millis(10),
            rescan_interval: None,
        };
        FolderWatcher::new(dir, uploader, config)
    }

    #[tokio::test]
    async fn test_file_is_sent_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.mp4"), b"video").unwrap();
        let uploader = Arc::new(FakeUploader::default());
        let watcher = watcher(dir.path(), uploader.clone());

        assert_eq!(watcher.attempt("f.mp4").await, TransferOutcome::Accepted);
        assert_eq!(watcher.attempt("f.mp4").await, TransferOutcome::AlreadyUploaded);

        assert_eq!(uploader.uploaded_names(), vec!["f.mp4"]);
        assert_eq!(uploader.uploads.lock().unwrap()[0].1, b"video");
        assert!(watcher.ledger().is_uploaded("f.mp4").await);
    }

    #[tokio::test]
    async fn test_scan_skips_hidden_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"b").unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"a").unwrap();
        std::fs::write(dir.path().join(".c.mp4.part"), b"partial").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        let uploader = Arc::new(FakeUploader::default());
        let watcher = watcher(dir.path(), uploader.clone());

        let outcomes = watcher.scan().await.unwrap();

        assert_eq!(
            outcomes,
            vec![
                ("a.mp4".to_string(), TransferOutcome::Accepted),
                ("b.mp4".to_string(), TransferOutcome::Accepted),
            ]
        );
        assert_eq!(uploader.uploaded_names(), vec!["a.mp4", "b.mp4"]);
    }

    #[tokio::test]
    async fn test_full_probe_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.mp4"), b"video").unwrap();
        let uploader = Arc::new(FakeUploader::default());
        uploader.full.store(true, Ordering::SeqCst);
        let watcher = watcher(dir.path(), uploader.clone());

        assert_eq!(watcher.attempt("f.mp4").await, TransferOutcome::ProbeFull);
        assert!(uploader.uploaded_names().is_empty());
        assert!(!watcher.ledger().is_uploaded("f.mp4").await);

        uploader.full.store(false, Ordering::SeqCst);
        assert_eq!(watcher.attempt("f.mp4").await, TransferOutcome::Accepted);
    }

    #[tokio::test]
    async fn test_refusals_and_failures_are_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.mp4"), b"video").unwrap();
        let uploader = Arc::new(FakeUploader::answering(vec![
            Ok(UploadResult::duplicate("f.mp4")),
            Ok(UploadResult::queue_full("f.mp4")),
            Err(TransferError::Rejected {
                status: 500,
                body: "boom".to_string(),
            }),
        ]));
        let watcher = watcher(dir.path(), uploader.clone());

        assert_eq!(watcher.attempt("f.mp4").await, TransferOutcome::Duplicate);
        assert_eq!(watcher.attempt("f.mp4").await, TransferOutcome::QueueFull);
        let failed = watcher.attempt("f.mp4").await;
        assert!(matches!(failed, TransferOutcome::Failed(_)));
        assert!(failed.is_retryable());
        assert!(!watcher.ledger().is_uploaded("f.mp4").await);

        assert_eq!(watcher.attempt("f.mp4").await, TransferOutcome::Accepted);
        assert_eq!(uploader.uploaded_names().len(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_attempts_send_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.mp4"), b"video").unwrap();
        let uploader = Arc::new(FakeUploader {
            gate: Some(Semaphore::new(0)),
            ..Default::default()
        });
        let watcher = Arc::new(watcher(dir.path(), uploader.clone()));

        let first = {
            let watcher = watcher.clone();
            tokio::spawn(async move { watcher.attempt("f.mp4").await })
        };
        tokio::time::timeout(Duration::from_secs(5), async {
            while uploader.uploaded_names().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(watcher.attempt("f.mp4").await, TransferOutcome::InFlight);

        uploader.gate.as_ref().unwrap().add_permits(1);
        assert_eq!(first.await.unwrap(), TransferOutcome::Accepted);
        assert_eq!(uploader.uploaded_names().len(), 1);
    }

    #[tokio::test]
    async fn test_run_picks_up_new_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("existing.mp4"), b"old").unwrap();
        let uploader = Arc::new(FakeUploader::default());
        let watcher = Arc::new(watcher(dir.path(), uploader.clone()));
        let task = tokio::spawn(watcher.clone().run());

        tokio::time::timeout(Duration::from_secs(5), async {
            while !watcher.ledger().is_uploaded("existing.mp4").await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        // Give the watcher time to register before the file appears.
        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(dir.path().join("new.mp4"), b"new").unwrap();

        tokio::time::timeout(Duration::from_secs(10), async {
            while !watcher.ledger().is_uploaded("new.mp4").await {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();

        task.abort();
        assert_eq!(
            watcher.ledger().uploaded().await,
            vec!["existing.mp4", "new.mp4"]
        );
    }

    #[tokio::test]
    async fn test_rescan_retries_after_full_queue() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Arc::new(FakeUploader::default());
        uploader.full.store(true, Ordering::SeqCst);
        // Missing folder: watching fails, the watcher falls back to rescans.
        let folder = dir.path().join("later");
        let config = WatcherConfig {
            settle_delay: Duration::from_millis(10),
            rescan_interval: Some(Duration::from_millis(50)),
        };
        let watcher = Arc::new(FolderWatcher::new(&folder, uploader.clone(), config));
        let task = tokio::spawn(watcher.clone().run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::create_dir(&folder).unwrap();
        std::fs::write(folder.join("f.mp4"), b"video").unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!watcher.ledger().is_uploaded("f.mp4").await);

        uploader.full.store(false, Ordering::SeqCst);
        tokio::time::timeout(Duration::from_secs(5), async {
            while !watcher.ledger().is_uploaded("f.mp4").await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        task.abort();
        assert_eq!(uploader.uploaded_names(), vec!["f.mp4"]);
    }

    #[tokio::test]
    async fn test_transfer_client_as_uploader() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rpc/queue-status"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"full": false, "current_size": 0})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rpc/upload-video"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "accepted", "message": "ok"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.mp4"), b"video").unwrap();
        let client = TransferClient::new(TransferClientConfig::for_address(&server.uri())).unwrap();
        let watcher = FolderWatcher::new(dir.path(), Arc::new(client), WatcherConfig::default());

        assert_eq!(watcher.attempt("f.mp4").await, TransferOutcome::Accepted);
        assert_eq!(watcher.attempt("f.mp4").await, TransferOutcome::AlreadyUploaded);
    }
}
