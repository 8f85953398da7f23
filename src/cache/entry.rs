//! Cache Entry Module
//!
//! Timestamp helpers, the index's per-key expiry record, and the envelope
//! wrapper that values travel in when written to the key-value store.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

// == Index Entry ==
/// Expiry record tracked by the bounded cache index for a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: i64,
}

impl IndexEntry {
    /// Creates an entry expiring `ttl_ms` from now.
    pub fn with_ttl(ttl_ms: i64) -> Self {
        Self {
            expires_at: now_ms() + ttl_ms,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is live while `now <= expires_at`; it
    /// expires only once the current time is strictly past the expiration
    /// time.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

// == Envelope ==
/// Serialized wrapper around a cached value.
///
/// This is what actually lands in the key-value store: the payload plus
/// creation and expiry metadata, JSON-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: i64,
    /// The wrapped value
    pub payload: T,
}

impl<T: Serialize> Envelope<T> {
    // == Seal ==
    /// Wraps `payload` with a TTL and encodes it for storage.
    pub fn seal(payload: &T, ttl_ms: i64) -> serde_json::Result<String> {
        let now = now_ms();
        serde_json::to_string(&Envelope {
            created_at: now,
            expires_at: now + ttl_ms,
            payload,
        })
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    // == Open ==
    /// Decodes a stored envelope and returns the payload if still live.
    ///
    /// Malformed data and expired envelopes both degrade to `None`; a corrupt
    /// entry is never an error, just a miss.
    pub fn open(raw: &str) -> Option<T> {
        let envelope: Envelope<T> = match serde_json::from_str(raw) {
            Ok(e) => e,
            Err(err) => {
                debug!(error = %err, "discarding malformed cache envelope");
                return None;
            }
        };

        if now_ms() > envelope.expires_at {
            return None;
        }

        Some(envelope.payload)
    }
}

// == Utility Functions ==
/// Returns the current Unix timestamp in milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
