//! Prometheus metrics for the consumer server.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use reel_models::{AdmissionVerdict, QueueSnapshot, StatusEvent};
use reel_queue::StatusHub;
use tokio::sync::broadcast::error::RecvError;

/// Initialize the Prometheus metrics recorder.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "reel_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "reel_http_request_duration_seconds";

    // Admission metrics
    pub const ADMISSIONS_TOTAL: &str = "reel_admissions_total";
    pub const UPLOAD_BYTES_TOTAL: &str = "reel_upload_bytes_total";
    pub const REJECTED_STREAMS_TOTAL: &str = "reel_rejected_streams_total";

    // Queue metrics
    pub const QUEUE_LENGTH: &str = "reel_queue_length";
    pub const QUEUE_PROCESSING: &str = "reel_queue_processing";

    // Push stream metrics
    pub const EVENT_SUBSCRIBERS: &str = "reel_event_subscribers";
}

/// Record the verdict for one upload stream.
pub fn record_admission(verdict: AdmissionVerdict, bytes: usize) {
    counter!(names::ADMISSIONS_TOTAL, "verdict" => verdict.as_str()).increment(1);
    if verdict.is_accepted() {
        counter!(names::UPLOAD_BYTES_TOTAL).increment(bytes as u64);
    }
}

/// Record an upload stream rejected before admission.
pub fn record_rejected_stream() {
    counter!(names::REJECTED_STREAMS_TOTAL).increment(1);
}

/// Update queue gauges.
pub fn set_queue_snapshot(snapshot: &QueueSnapshot) {
    gauge!(names::QUEUE_LENGTH).set(snapshot.size as f64);
    gauge!(names::QUEUE_PROCESSING).set(snapshot.processing as f64);
}

/// Mirror queue events into the queue gauges.
pub async fn track_queue_events(hub: StatusHub) {
    let mut events = hub.subscribe();
    loop {
        match events.recv().await {
            Ok(StatusEvent::Queue(snapshot)) => set_queue_snapshot(&snapshot),
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => break,
        }
    }
}

pub fn set_event_subscribers(count: usize) {
    gauge!(names::EVENT_SUBSCRIBERS).set(count as f64);
}

/// Label for requests that matched no route.
const UNMATCHED_ROUTE: &str = "unmatched";

/// Record an HTTP request against its matched route template.
pub fn record_http_request(method: &str, route: Option<&str>, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", route_label(route).to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Collapse nested file services and unmatched paths so labels stay bounded.
fn route_label(route: Option<&str>) -> &str {
    match route {
        None => UNMATCHED_ROUTE,
        Some(route) if route.starts_with("/videos") => "/videos/:file",
        Some(route) if route.starts_with("/previews") => "/previews/:file",
        Some(route) => route,
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    record_http_request(&method, route.as_deref(), status, start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_label() {
        assert_eq!(
            route_label(Some("/videos/*__private__axum_nest_tail_param")),
            "/videos/:file"
        );
        assert_eq!(route_label(Some("/previews/*rest")), "/previews/:file");
        assert_eq!(route_label(Some("/rpc/queue-status")), "/rpc/queue-status");
    }

    #[test]
    fn test_unmatched_paths_share_one_label() {
        assert_eq!(route_label(None), UNMATCHED_ROUTE);
    }
}
