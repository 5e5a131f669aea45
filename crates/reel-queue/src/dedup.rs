//! Content deduplication index.

use std::collections::HashSet;
use std::str::FromStr;

use reel_models::Fingerprint;
use serde::{Deserialize, Serialize};

/// What happens to a fingerprint when its job fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Accepted content is never admitted again, even if processing failed
    #[default]
    Permanent,
    /// A failed job's fingerprint is forgotten so the content can be resubmitted
    ReleaseOnFailure,
}

impl FromStr for DedupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permanent" | "false" | "0" => Ok(DedupPolicy::Permanent),
            "release_on_failure" | "true" | "1" => Ok(DedupPolicy::ReleaseOnFailure),
            other => Err(format!("unknown dedup policy: {}", other)),
        }
    }
}

/// Fingerprints of every accepted job for the life of the process.
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: HashSet<Fingerprint>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    /// Record a fingerprint. Returns `false` if it was already present.
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        self.seen.insert(fingerprint)
    }

    /// Forget a fingerprint.
    pub fn remove(&mut self, fingerprint: &Fingerprint) -> bool {
        self.seen.remove(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut index = DedupIndex::new();
        let fp = Fingerprint::of(b"a");

        assert!(!index.contains(&fp));
        assert!(index.insert(fp));
        assert!(!index.insert(fp));
        assert!(index.contains(&fp));
        assert_eq!(index.len(), 1);

        assert!(index.remove(&fp));
        assert!(index.is_empty());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("true".parse::<DedupPolicy>(), Ok(DedupPolicy::ReleaseOnFailure));
        assert_eq!("permanent".parse::<DedupPolicy>(), Ok(DedupPolicy::Permanent));
        assert!("sometimes".parse::<DedupPolicy>().is_err());
        assert_eq!(DedupPolicy::default(), DedupPolicy::Permanent);
    }
}
