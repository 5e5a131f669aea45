//! Push stream of status events.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use reel_models::StatusEvent;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::metrics;
use crate::state::AppState;

/// Server-Sent Events stream of queue and listing changes.
///
/// A new subscriber first receives the current occupancy and listing.
/// A subscriber that falls behind skips the events it missed; there is
/// no replay.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let receiver = state.hub().subscribe();
    metrics::set_event_subscribers(state.hub().subscriber_count());

    let current = vec![
        StatusEvent::queue(state.scheduler.snapshot().await),
        StatusEvent::videos(state.scheduler.completed_artifacts().await),
    ];

    let updates = BroadcastStream::new(receiver).filter_map(|item| match item {
        Ok(event) => Some(event),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            debug!(skipped, "Event subscriber lagged");
            None
        }
    });

    let stream = tokio_stream::iter(current)
        .chain(updates)
        .map(|event| to_sse(&event));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: &StatusEvent) -> Result<Event, axum::Error> {
    Event::default().event(event.kind()).json_data(event)
}
