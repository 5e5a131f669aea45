//! Per-folder record of uploaded and in-flight files.

use std::collections::HashSet;

use tokio::sync::Mutex;

/// Result of trying to claim a file for transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller now owns the transfer and must call [`UploadLedger::release`]
    Claimed,
    AlreadyUploaded,
    InFlight,
}

#[derive(Debug, Default)]
struct Entries {
    uploaded: HashSet<String>,
    in_flight: HashSet<String>,
}

/// Filenames accepted by the consumer, plus those with a transfer running.
///
/// A name is only recorded as uploaded once the consumer accepted it, so
/// duplicates, full queues and transport failures are retried on the next
/// event. Not persisted.
#[derive(Debug, Default)]
pub struct UploadLedger {
    entries: Mutex<Entries>,
}

impl UploadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `filename` for a transfer unless it is done or already running.
    pub async fn claim(&self, filename: &str) -> Claim {
        let mut entries = self.entries.lock().await;
        if entries.uploaded.contains(filename) {
            Claim::AlreadyUploaded
        } else if !entries.in_flight.insert(filename.to_string()) {
            Claim::InFlight
        } else {
            Claim::Claimed
        }
    }

    /// End a claimed transfer, recording the file as uploaded if it was accepted.
    pub async fn release(&self, filename: &str, accepted: bool) {
        let mut entries = self.entries.lock().await;
        entries.in_flight.remove(filename);
        if accepted {
            entries.uploaded.insert(filename.to_string());
        }
    }

    pub async fn is_uploaded(&self, filename: &str) -> bool {
        self.entries.lock().await.uploaded.contains(filename)
    }

    /// Uploaded filenames, sorted.
    pub async fn uploaded(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.lock().await.uploaded.iter().cloned().collect();
        names.sort();
        names
    }
}
