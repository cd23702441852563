//! Local Layer Module
//!
//! Process-local expiring map guarded by a single mutex. Expired entries are
//! evicted lazily on read, or by a sweep that runs once the map grows past
//! its watermark. There is no timer thread.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::entry::{current_timestamp_ms, LocalEntry};
use crate::cache::GlobPattern;

// == Local Layer ==
/// In-process cache layer storing values unserialized.
#[derive(Debug)]
pub struct LocalLayer {
    /// Key-value storage
    entries: Mutex<HashMap<String, LocalEntry>>,
    /// Entry count above which `set` sweeps expired entries
    watermark: usize,
}

impl LocalLayer {
    // == Constructor ==
    /// Creates an empty local layer with the given sweep watermark.
    pub fn new(watermark: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            watermark,
        }
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Expired entries are removed and reported as absent. An entry holding a
    /// different type than `T` is reported as absent and left in place.
    pub fn get<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;

        if entry.is_expired() {
            entries.remove(key);
            debug!(key = %key, "local entry expired");
            return None;
        }

        let value = entry.downcast::<T>();
        if value.is_none() {
            debug!(key = %key, "local entry holds a different type");
        }
        value
    }

    // == Set ==
    /// Stores a value for `ttl_seconds`, overwriting any previous entry.
    ///
    /// Growing past the watermark triggers a full sweep of expired entries.
    pub fn set<T: Send + Sync + 'static>(&self, key: &str, value: T, ttl_seconds: u64) -> bool {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), LocalEntry::new(Arc::new(value), ttl_seconds));

        if entries.len() > self.watermark {
            let removed = sweep(&mut entries);
            debug!(
                removed,
                remaining = entries.len(),
                "local layer passed watermark, swept expired entries"
            );
        }
        true
    }

    // == Delete ==
    /// Removes an entry by key, returning true if one was present.
    pub fn delete(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    // == Matching Keys ==
    /// Returns all held keys matching the pattern, expired or not.
    pub fn matching_keys(&self, pattern: &GlobPattern) -> HashSet<String> {
        self.entries
            .lock()
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect()
    }

    /// Removes every entry whose key matches the pattern. Returns the removed
    /// keys.
    pub fn remove_matching(&self, pattern: &GlobPattern) -> HashSet<String> {
        let mut entries = self.entries.lock();
        let removed: HashSet<String> = entries
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();
        for key in &removed {
            entries.remove(key);
        }
        removed
    }

    /// Returns true if a live entry exists for the key. Does not evict.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Remaining TTL of a live entry in milliseconds.
    pub fn ttl_remaining_ms(&self, key: &str) -> Option<u64> {
        self.entries
            .lock()
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(LocalEntry::ttl_remaining_ms)
    }

    // == Sweep Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        sweep(&mut self.entries.lock())
    }

    // == Length ==
    /// Number of held entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the layer holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// The configured sweep watermark.
    pub fn watermark(&self) -> usize {
        self.watermark
    }
}

fn sweep(entries: &mut HashMap<String, LocalEntry>) -> usize {
    let now = current_timestamp_ms();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired_at(now));
    before - entries.len()
}
