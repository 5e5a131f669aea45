//! Producer-side client for a consumer's transfer endpoints.

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream;
use reel_models::{Fingerprint, FingerprintHasher, Frame, QueueStatus, UploadResult};
use reqwest::{Body, Client};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use crate::codec::{encode_frame, DEFAULT_CHUNK_LEN};
use crate::error::{TransferError, TransferResult};
use crate::{QUEUE_STATUS_PATH, UPLOAD_PATH};

/// Configuration for the transfer client.
#[derive(Debug, Clone)]
pub struct TransferClientConfig {
    /// Base URL of the consumer, e.g. `http://127.0.0.1:50051`
    pub base_url: String,
    /// Timeout for the capacity probe
    pub probe_timeout: Duration,
    /// Overall timeout for an upload; `None` waits indefinitely
    pub upload_timeout: Option<Duration>,
    /// Retries for the capacity probe
    pub max_retries: u32,
    /// Payload bytes per frame
    pub chunk_len: usize,
}

impl Default for TransferClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:50051".to_string(),
            probe_timeout: Duration::from_secs(5),
            upload_timeout: None,
            max_retries: 2,
            chunk_len: DEFAULT_CHUNK_LEN,
        }
    }
}

impl TransferClientConfig {
    /// Config for a specific consumer address (`host:port` or a full URL).
    pub fn for_address(address: &str) -> Self {
        Self {
            base_url: normalize_base_url(address),
            ..Self::default()
        }
    }

    /// Apply optional overrides from environment variables.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(secs) = std::env::var("PRODUCER_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
        {
            self.upload_timeout = Some(Duration::from_secs(secs));
        }
        self.max_retries = std::env::var("PRODUCER_PROBE_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(self.max_retries);
        self
    }
}

fn normalize_base_url(address: &str) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

/// Client used by producers to probe and upload to one consumer.
#[derive(Clone)]
pub struct TransferClient {
    http: Client,
    config: TransferClientConfig,
}

impl TransferClient {
    /// Create a new transfer client.
    pub fn new(config: TransferClientConfig) -> TransferResult<Self> {
        let http = Client::builder().build().map_err(TransferError::Network)?;
        Ok(Self { http, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Ask the consumer whether its queue is full. Advisory only.
    pub async fn probe_capacity(&self) -> TransferResult<QueueStatus> {
        let url = format!("{}{}", self.config.base_url, QUEUE_STATUS_PATH);

        let response = self
            .with_retry(|| async {
                let response = self
                    .http
                    .get(&url)
                    .timeout(self.config.probe_timeout)
                    .send()
                    .await?;
                check_status(response).await
            })
            .await?;

        Ok(response.json().await?)
    }

    /// Fingerprint `path` and stream it to the consumer under `filename`.
    pub async fn upload_file(&self, path: &Path, filename: &str) -> TransferResult<UploadResult> {
        let hash = fingerprint_file(path).await?;
        let file = File::open(path).await?;
        debug!(
            filename = %filename,
            fingerprint = %hash.short(),
            "Streaming upload to {}",
            self.config.base_url
        );

        let frames = frame_stream(file, filename.to_string(), hash, self.config.chunk_len);
        let url = format!("{}{}", self.config.base_url, UPLOAD_PATH);

        let mut request = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::wrap_stream(frames));
        if let Some(timeout) = self.config.upload_timeout {
            request = request.timeout(timeout);
        }

        let response = check_status(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> TransferResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = TransferResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(200 * 2u64.pow(attempt));
                    warn!(
                        "Transfer request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

async fn check_status(response: reqwest::Response) -> TransferResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(TransferError::Rejected { status, body })
}

/// Fingerprint a file by reading it in chunks.
pub async fn fingerprint_file(path: &Path) -> TransferResult<Fingerprint> {
    let mut file = File::open(path).await?;
    let mut hasher = FingerprintHasher::new();
    let mut buf = vec![0u8; DEFAULT_CHUNK_LEN];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

struct FrameSource {
    file: File,
    filename: String,
    hash: Fingerprint,
    buf: Vec<u8>,
    sent_any: bool,
}

/// Stream of encoded frames read from `file`.
///
/// An empty file still produces one frame so the consumer learns its name and hash.
fn frame_stream(
    file: File,
    filename: String,
    hash: Fingerprint,
    chunk_len: usize,
) -> impl futures_util::Stream<Item = TransferResult<Bytes>> + Send + 'static {
    let source = FrameSource {
        file,
        filename,
        hash,
        buf: vec![0u8; chunk_len.max(1)],
        sent_any: false,
    };

    stream::try_unfold(source, |mut source| async move {
        let n = source
            .file
            .read(&mut source.buf)
            .await
            .map_err(TransferError::from)?;
        if n == 0 && source.sent_any {
            return Ok(None);
        }
        source.sent_any = true;

        let frame = Frame::new(
            source.filename.clone(),
            source.hash,
            Bytes::copy_from_slice(&source.buf[..n]),
        );
        let encoded = encode_frame(&frame)?;
        Ok::<_, TransferError>(Some((encoded, source)))
    })
}
