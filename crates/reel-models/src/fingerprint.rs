//! Content fingerprints used for deduplication.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a fingerprint digest in bytes.
pub const FINGERPRINT_LEN: usize = 32;

/// Error parsing a fingerprint from its hex form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FingerprintError {
    #[error("fingerprint must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("fingerprint contains non-hex character {0:?}")]
    InvalidCharacter(char),
}

/// SHA-256 digest of a complete payload.
///
/// Two payloads with the same fingerprint are treated as the same content.
/// Serialized as a lowercase hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Fingerprint a payload held in memory.
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = FingerprintHasher::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != FINGERPRINT_LEN * 2 {
            return Err(FingerprintError::InvalidLength {
                expected: FINGERPRINT_LEN * 2,
                actual: s.len(),
            });
        }

        let mut bytes = [0u8; FINGERPRINT_LEN];
        let mut chars = s.chars();
        for byte in bytes.iter_mut() {
            let hi = hex_value(chars.next())?;
            let lo = hex_value(chars.next())?;
            *byte = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

fn hex_value(c: Option<char>) -> Result<u8, FingerprintError> {
    // Multi-byte input runs out of chars before the byte length does.
    let c = c.ok_or(FingerprintError::InvalidCharacter('\0'))?;
    c.to_digit(16)
        .map(|d| d as u8)
        .ok_or(FingerprintError::InvalidCharacter(c))
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Incremental fingerprint computation for payloads read in chunks.
#[derive(Clone, Default)]
pub struct FingerprintHasher {
    inner: Sha256,
}

impl FingerprintHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
    }

    pub fn finalize(self) -> Fingerprint {
        Fingerprint(self.inner.finalize().into())
    }
}
