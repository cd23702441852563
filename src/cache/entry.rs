//! Local Entry Module
//!
//! Defines the in-memory entries held by the local layer.

use std::any::Any;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Type-erased value stored in the local layer, never serialized.
pub type AnyValue = Arc<dyn Any + Send + Sync>;

// == Local Entry ==
/// A value held by the local layer together with its expiry time.
#[derive(Clone)]
pub struct LocalEntry {
    /// The stored value
    pub value: AnyValue,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl LocalEntry {
    // == Constructor ==
    /// Creates an entry that expires `ttl_seconds` from now.
    pub fn new(value: AnyValue, ttl_seconds: u64) -> Self {
        let now = current_timestamp_ms();
        Self {
            value,
            expires_at: now.saturating_add(ttl_seconds.saturating_mul(1000)),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its expiration time, so a TTL of zero yields an entry that is never
    /// returned.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Expiry check against a caller-supplied clock reading, used by sweeps.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    /// Returns remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(current_timestamp_ms())
    }

    /// Returns the value if it holds a `T`.
    pub fn downcast<T: Clone + 'static>(&self) -> Option<T> {
        self.value.downcast_ref::<T>().cloned()
    }
}

impl std::fmt::Debug for LocalEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEntry")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
