//! Dashboard handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Html;
use axum::Json;
use reel_models::QueueSnapshot;

use crate::drop_folder::DropReceipt;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Header carrying the target filename of a dashboard upload.
pub const FILENAME_HEADER: &str = "x-filename";

/// Completed artifact filenames, in completion order.
pub async fn list_videos(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.scheduler.completed_artifacts().await)
}

/// Queue occupancy for the dashboard.
pub async fn queue_overview(State(state): State<AppState>) -> Json<QueueSnapshot> {
    Json(state.scheduler.snapshot().await)
}

/// Drop a browser upload into one of the producer folders.
///
/// The file then enters the pipeline through the producer watching that
/// folder, like any other file.
pub async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<DropReceipt>> {
    let filename = headers
        .get(FILENAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing X-Filename header"))?;

    let receipt = state.drops.deposit(filename, body).await?;
    Ok(Json(receipt))
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Reel Consumer</title>
  <style>
    body { font-family: sans-serif; margin: 2rem; }
    #videos { display: flex; flex-wrap: wrap; gap: 1rem; }
    .card { width: 320px; }
    .card video { width: 320px; height: 240px; background: #000; }
  </style>
</head>
<body>
  <h1>Uploaded Videos</h1>
  <p id="queue">Queue: -</p>
  <form id="upload">
    <input type="file" id="file" accept="video/*">
    <button type="submit">Upload</button>
  </form>
  <div id="videos"></div>
  <script>
    const container = document.getElementById('videos');

    function render(files) {
      container.innerHTML = '';
      for (const file of files) {
        const card = document.createElement('div');
        card.className = 'card';
        const video = document.createElement('video');
        video.src = '/previews/' + encodeURIComponent(file);
        video.muted = true;
        video.onmouseover = () => video.play();
        video.onmouseout = () => { video.pause(); video.currentTime = 0; };
        const button = document.createElement('button');
        button.textContent = file;
        button.onclick = () => window.open('/videos/' + encodeURIComponent(file));
        card.append(video, document.createElement('br'), button);
        container.appendChild(card);
      }
    }

    function showQueue(q) {
      document.getElementById('queue').textContent =
        `Queue: ${q.size}/${q.capacity}, processing ${q.processing}` + (q.full ? ' (full)' : '');
    }

    const events = new EventSource('/events');
    events.addEventListener('queue', e => showQueue(JSON.parse(e.data).payload));
    events.addEventListener('videos', e => render(JSON.parse(e.data).payload));

    document.getElementById('upload').onsubmit = async e => {
      e.preventDefault();
      const file = document.getElementById('file').files[0];
      if (!file) return;
      await fetch('/upload', { method: 'POST', headers: { 'X-Filename': file.name }, body: file });
    };
  </script>
</body>
</html>
"#;
