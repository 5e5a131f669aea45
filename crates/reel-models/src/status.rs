//! Status events pushed to dashboard observers.

use serde::{Deserialize, Serialize};

/// Point-in-time view of queue occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Whether new admissions would be refused
    pub full: bool,
    /// Jobs waiting in the queue
    pub size: usize,
    /// Fixed queue capacity
    pub capacity: usize,
    /// Jobs currently owned by workers
    pub processing: usize,
}

/// Event envelope delivered over the push stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StatusEvent {
    /// Occupancy changed
    Queue(QueueSnapshot),

    /// Completed artifact listing changed
    Videos(Vec<String>),
}

impl StatusEvent {
    pub fn queue(snapshot: QueueSnapshot) -> Self {
        Self::Queue(snapshot)
    }

    pub fn videos(filenames: Vec<String>) -> Self {
        Self::Videos(filenames)
    }

    /// Event name used as the SSE `event:` field.
    pub fn kind(&self) -> &'static str {
        match self {
            StatusEvent::Queue(_) => "queue",
            StatusEvent::Videos(_) => "videos",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_event_serialization() {
        let event = StatusEvent::queue(QueueSnapshot {
            full: false,
            size: 2,
            capacity: 10,
            processing: 1,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "queue");
        assert_eq!(json["payload"]["size"], 2);
        assert_eq!(json["payload"]["full"], false);
    }

    #[test]
    fn test_videos_event_serialization() {
        let event = StatusEvent::videos(vec!["a.mp4".into(), "b.mp4".into()]);
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"videos","payload":["a.mp4","b.mp4"]}"#);
        assert_eq!(event.kind(), "videos");
    }
}
