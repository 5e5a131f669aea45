//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use reel_models::QueueSnapshot;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub directories: bool,
    pub queue: QueueSnapshot,
}

/// Readiness check endpoint. Fails while any artifact or drop folder is missing.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let layout = &state.layout;
    let directories = [layout.uploads_dir(), layout.compressed_dir(), layout.previews_dir()]
        .into_iter()
        .chain(state.drops.folders().iter().map(|p| p.as_path()))
        .all(|dir| dir.is_dir());

    let response = ReadinessResponse {
        status: if directories { "ready" } else { "degraded" }.to_string(),
        directories,
        queue: state.scheduler.snapshot().await,
    };

    if directories {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
