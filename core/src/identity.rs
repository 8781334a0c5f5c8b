//! One-way identity hashing.
//!
//! Raw citizen identifiers (national id, kebele id, passport number) are
//! privacy-sensitive and must never be persisted. They are reduced to a
//! SHA-256 digest at the boundary; the digest is the sole key linking
//! repeated visits from the same citizen. Any operator-facing display uses
//! [`IdentityHash::truncated`], never the raw value.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded SHA-256 digest of a raw citizen identifier.
///
/// Deterministic: hashing the same raw identifier always yields the same
/// digest, which is what makes hash-match verification at counters and the
/// one-active-ticket rule work without storing the identifier itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityHash(String);

impl IdentityHash {
    /// Digest a raw identifier.
    #[must_use]
    pub fn from_raw(raw_id: &str) -> Self {
        Self(hex_encode(&Sha256::digest(raw_id.as_bytes())))
    }

    /// Wrap an already-computed hex digest (e.g. read back from the store).
    #[must_use]
    pub fn from_hex(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// The full hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Partial display form for operator dashboards: the first eight hex
    /// characters followed by `***`. The raw identifier is never available
    /// to truncate.
    #[must_use]
    pub fn truncated(&self) -> String {
        let prefix: String = self.0.chars().take(8).collect();
        format!("{prefix}***")
    }

    /// Whether `raw_id` hashes to this digest.
    #[must_use]
    pub fn matches_raw(&self, raw_id: &str) -> bool {
        Self::from_raw(raw_id) == *self
    }
}

impl fmt::Display for IdentityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use fmt::Write;

    bytes.iter().fold(
        String::with_capacity(bytes.len() * 2),
        |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        },
    )
}
