//! Transfer RPC handlers.

use axum::body::Body;
use axum::extract::State;
use axum::Json;
use futures_util::StreamExt;
use reel_models::{Job, QueueStatus, UploadResult};
use reel_transfer::{AssembledUpload, FrameDecoder, UploadAssembler};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Receive a framed upload stream and run admission control on it.
///
/// Admission is evaluated once, after the whole stream has arrived.
/// A malformed stream is rejected without touching the queue.
pub async fn upload_video(
    State(state): State<AppState>,
    body: Body,
) -> ApiResult<Json<UploadResult>> {
    let upload = match read_upload(body, state.config.max_body_size).await {
        Ok(upload) => upload,
        Err(e) => {
            metrics::record_rejected_stream();
            return Err(e);
        }
    };

    let AssembledUpload {
        filename,
        fingerprint,
        payload,
        frames,
    } = upload;
    let size = payload.len();

    debug!(
        filename = %filename,
        fingerprint = %fingerprint.short(),
        frames,
        bytes = size,
        "Upload stream complete"
    );

    let verdict = state
        .scheduler
        .try_admit(Job::new(filename.clone(), fingerprint, payload))
        .await;
    metrics::record_admission(verdict, size);

    info!(
        filename = %filename,
        verdict = %verdict,
        bytes = size,
        "Upload answered"
    );

    Ok(Json(UploadResult::from_verdict(verdict, &filename)))
}

async fn read_upload(body: Body, limit: usize) -> ApiResult<AssembledUpload> {
    let mut stream = body.into_data_stream();
    let mut decoder = FrameDecoder::new();
    let mut assembler = UploadAssembler::new();
    let mut received = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| ApiError::bad_request(format!("Upload stream interrupted: {}", e)))?;
        received = received.saturating_add(chunk.len());
        if received > limit {
            return Err(ApiError::payload_too_large(format!(
                "Upload stream exceeds {} bytes",
                limit
            )));
        }
        decoder.extend(&chunk);
        while let Some(frame) = decoder.next_frame()? {
            assembler.push(frame)?;
        }
    }

    decoder.finish()?;
    Ok(assembler.finish()?)
}

/// Advisory occupancy probe. Never mutates state.
pub async fn queue_status(State(state): State<AppState>) -> Json<QueueStatus> {
    Json(state.scheduler.status().await)
}
