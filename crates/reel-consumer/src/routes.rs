//! Consumer routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use reel_transfer::{QUEUE_STATUS_PATH, UPLOAD_PATH};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use crate::handlers::{
    events, health, index, list_videos, queue_overview, queue_status, ready, upload_file,
    upload_video,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_logging};
use crate::state::AppState;

/// Create the consumer router.
///
/// Transfer RPCs and the dashboard share one listener. The upload RPC
/// streams its body and enforces `max_body_size` itself.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let max_body_size = state.config.max_body_size;

    let rpc_routes = Router::new()
        .route(UPLOAD_PATH, post(upload_video))
        .route(QUEUE_STATUS_PATH, get(queue_status));

    let dashboard_routes = Router::new()
        .route("/", get(index))
        .route("/api/videos", get(list_videos))
        .route("/api/queue", get(queue_overview))
        .route("/upload", post(upload_file))
        .route("/events", get(events))
        .nest_service("/videos", ServeDir::new(state.layout.compressed_dir()))
        .nest_service("/previews", ServeDir::new(state.layout.previews_dir()))
        .layer(RequestBodyLimitLayer::new(max_body_size));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(rpc_routes)
        .merge(dashboard_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Buffered extractors default to 2 MiB
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
