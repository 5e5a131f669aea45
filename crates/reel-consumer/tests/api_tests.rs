//! Router tests driving the consumer through `tower::ServiceExt::oneshot`.

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use reel_consumer::{create_router, AppState, ConsumerConfig};
use reel_models::{AdmissionVerdict, Fingerprint, Frame, QueueStatus, UploadResult};
use reel_queue::QueueConfig;
use reel_transfer::encode_frame;
use reel_worker::WorkerConfig;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    state: AppState,
    dir: TempDir,
}

impl TestApp {
    async fn new(capacity: usize) -> Self {
        Self::with_body_limit(capacity, ConsumerConfig::default().max_body_size).await
    }

    async fn with_body_limit(capacity: usize, max_body_size: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ConsumerConfig {
            producer_root: dir.path().to_path_buf(),
            num_producers: 2,
            max_body_size,
            queue: QueueConfig::default().with_capacity(capacity),
            worker: WorkerConfig::default().with_data_dir(dir.path()),
            ..Default::default()
        };
        let state = AppState::new(config).unwrap();
        state.prepare_directories().await.unwrap();
        Self { state, dir }
    }

    fn router(&self) -> Router {
        create_router(self.state.clone(), None)
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    async fn upload(&self, body: Bytes) -> (StatusCode, Value) {
        self.send(
            Request::post("/rpc/upload-video")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }
}

/// Encode `content` as a stream of frames of at most `chunk` bytes.
fn stream_for(filename: &str, content: &[u8], chunk: usize) -> Bytes {
    let hash = Fingerprint::of(content);
    let mut out = BytesMut::new();
    for piece in content.chunks(chunk) {
        let frame = Frame::new(filename, hash, Bytes::copy_from_slice(piece));
        out.extend_from_slice(&encode_frame(&frame).unwrap());
    }
    out.freeze()
}

fn verdict(json: Value) -> AdmissionVerdict {
    serde_json::from_value::<UploadResult>(json).unwrap().status
}

#[tokio::test]
async fn test_queue_status_starts_empty() {
    let app = TestApp::new(3).await;

    let (status, json) = app.get("/rpc/queue-status").await;

    assert_eq!(status, StatusCode::OK);
    let queue: QueueStatus = serde_json::from_value(json).unwrap();
    assert_eq!(queue, QueueStatus { full: false, current_size: 0 });
}

#[tokio::test]
async fn test_upload_accepted_then_duplicate() {
    let app = TestApp::new(10).await;

    let (status, json) = app.upload(stream_for("a.mp4", b"same bytes", 4)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verdict(json), AdmissionVerdict::Accepted);

    // Same content under another name is still a duplicate.
    let (status, json) = app.upload(stream_for("b.mp4", b"same bytes", 64)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verdict(json), AdmissionVerdict::Duplicate);

    assert_eq!(app.state.scheduler.queued_filenames().await, vec!["a.mp4"]);
}

#[tokio::test]
async fn test_full_queue_refuses_before_dedup() {
    let app = TestApp::new(2).await;

    for (name, content) in [("h1.mp4", &b"one"[..]), ("h2.mp4", &b"two"[..])] {
        let (_, json) = app.upload(stream_for(name, content, 64)).await;
        assert_eq!(verdict(json), AdmissionVerdict::Accepted);
    }

    let (_, json) = app.upload(stream_for("h3.mp4", b"three", 64)).await;
    assert_eq!(verdict(json), AdmissionVerdict::QueueFull);

    let (_, json) = app.upload(stream_for("h1-again.mp4", b"one", 64)).await;
    assert_eq!(verdict(json), AdmissionVerdict::QueueFull);

    let (_, json) = app.get("/rpc/queue-status").await;
    let queue: QueueStatus = serde_json::from_value(json).unwrap();
    assert_eq!(queue, QueueStatus { full: true, current_size: 2 });
}

#[tokio::test]
async fn test_malformed_streams_are_bad_requests() {
    let app = TestApp::new(10).await;

    let (status, _) = app.upload(Bytes::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let full = stream_for("cut.mp4", b"0123456789", 64);
    let (status, _) = app.upload(full.slice(..full.len() - 3)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.upload(stream_for("../escape.mp4", b"x", 64)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.state.scheduler.status().await.current_size, 0);
}

#[tokio::test]
async fn test_oversized_upload_stream_is_payload_too_large() {
    let app = TestApp::with_body_limit(10, 1024).await;

    let (status, json) = app
        .upload(stream_for("big.mp4", &vec![7u8; 4096], 512))
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(json["detail"].as_str().unwrap().contains("1024"));
    assert_eq!(app.state.scheduler.known_fingerprints().await, 0);

    let (status, json) = app.upload(stream_for("small.mp4", b"fits", 64)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verdict(json), AdmissionVerdict::Accepted);
}

#[tokio::test]
async fn test_frame_mismatch_is_rejected() {
    let app = TestApp::new(10).await;

    let mut body = BytesMut::new();
    body.extend_from_slice(&stream_for("a.mp4", b"first", 64));
    body.extend_from_slice(&stream_for("b.mp4", b"first", 64));

    let (status, json) = app.upload(body.freeze()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].as_str().unwrap().contains("filename"));
    assert_eq!(app.state.scheduler.known_fingerprints().await, 0);
}

#[tokio::test]
async fn test_dashboard_queue_and_videos() {
    let app = TestApp::new(4).await;
    app.upload(stream_for("a.mp4", b"a", 64)).await;

    let (status, json) = app.get("/api/queue").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["size"], 1);
    assert_eq!(json["full"], false);
    assert_eq!(json["capacity"], 4);

    let (status, json) = app.get("/api/videos").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, Value::Array(vec![]));
}

#[tokio::test]
async fn test_dashboard_upload_round_robin() {
    let app = TestApp::new(4).await;

    for (name, folder) in [("a.mp4", "producer1"), ("b.mp4", "producer2"), ("c.mp4", "producer1")] {
        let (status, json) = app
            .send(
                Request::post("/upload")
                    .header("X-Filename", name)
                    .body(Body::from("video"))
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["folder"], folder);
        assert_eq!(json["filename"], name);
        assert!(app.dir.path().join(folder).join(name).is_file());
    }
}

#[tokio::test]
async fn test_dashboard_upload_accepts_large_files() {
    let app = TestApp::new(4).await;
    let video = vec![1u8; 3 * 1024 * 1024];

    let (status, json) = app
        .send(
            Request::post("/upload")
                .header("X-Filename", "big.mp4")
                .body(Body::from(video.clone()))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["folder"], "producer1");
    let written = std::fs::read(app.dir.path().join("producer1").join("big.mp4")).unwrap();
    assert_eq!(written.len(), video.len());
}

#[tokio::test]
async fn test_dashboard_upload_requires_filename() {
    let app = TestApp::new(4).await;

    let (status, _) = app
        .send(Request::post("/upload").body(Body::from("video")).unwrap())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Request::post("/upload")
                .header("X-Filename", "../../etc/passwd")
                .body(Body::from("video"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = TestApp::new(4).await;

    let (status, json) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");

    let (status, json) = app.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ready");
}

#[tokio::test]
async fn test_events_stream_starts_with_current_state() {
    let app = TestApp::new(4).await;

    let response = app
        .router()
        .oneshot(Request::get("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let mut stream = response.into_body().into_data_stream();
    let mut received = String::new();
    while !received.contains("event: videos") {
        let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("event not received in time")
            .unwrap()
            .unwrap();
        received.push_str(&String::from_utf8_lossy(&chunk));
    }

    assert!(received.contains("event: queue"));
    assert!(received.contains(r#""type":"queue""#));
    assert!(received.contains(r#""type":"videos","payload":[]"#));
}

#[tokio::test]
async fn test_events_stream_delivers_admissions() {
    let app = TestApp::new(4).await;

    let response = app
        .router()
        .oneshot(Request::get("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let mut stream = response.into_body().into_data_stream();

    app.upload(stream_for("live.mp4", b"live", 64)).await;

    let mut received = String::new();
    while !received.contains(r#""size":1"#) {
        let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("admission event not received in time")
            .unwrap()
            .unwrap();
        received.push_str(&String::from_utf8_lossy(&chunk));
    }
}
