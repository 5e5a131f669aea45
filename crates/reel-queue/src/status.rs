//! Best-effort fan-out of status events to dashboard observers.

use reel_models::StatusEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcast hub for status events.
///
/// Each subscriber has its own bounded buffer; a subscriber that falls
/// behind loses its oldest events instead of slowing publishers down.
#[derive(Debug, Clone)]
pub struct StatusHub {
    tx: broadcast::Sender<StatusEvent>,
}

impl StatusHub {
    /// Create a hub with the given per-subscriber buffer.
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx }
    }

    /// Register a new observer. Dropping the receiver unsubscribes it.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all current observers. Never blocks.
    pub fn publish(&self, event: StatusEvent) {
        match self.tx.send(event) {
            Ok(receivers) => trace!(receivers, "Published status event"),
            Err(_) => trace!("No status subscribers"),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for StatusHub {
    fn default() -> Self {
        Self::new(64)
    }
}
