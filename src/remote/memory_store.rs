//! In-process remote store.
//!
//! Holds bytes exactly as a shared store would, including its own expiry, so
//! the manager's remote code path runs without a Redis server. `set_available`
//! simulates an outage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use super::RemoteStore;
use crate::cache::GlobPattern;

/// Held entries above which a write sweeps expired ones.
const DEFAULT_WATERMARK: usize = 1000;

#[derive(Debug, Clone)]
struct StoredBytes {
    data: Vec<u8>,
    expires_at: Instant,
}

/// Remote store backed by a process-local map.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredBytes>>,
    available: AtomicBool,
    watermark: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty, available store.
    pub fn new() -> Self {
        Self::with_watermark(DEFAULT_WATERMARK)
    }

    /// Creates an empty store that sweeps expired entries once it holds more
    /// than `watermark` of them.
    pub fn with_watermark(watermark: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            watermark,
        }
    }

    /// Creates a store that is unavailable from the start.
    pub fn unavailable() -> Self {
        let store = Self::new();
        store.set_available(false);
        store
    }

    /// Switches the simulated outage on or off. Data survives an outage.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Live key count, ignoring availability.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|stored| stored.expires_at > now)
            .count()
    }

    /// Entries held, expired ones included.
    pub fn held(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no live keys are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if a live key exists, ignoring availability.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|stored| stored.expires_at > Instant::now())
    }

    /// Raw bytes under a key, ignoring availability. For inspection.
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .get(key)
            .filter(|stored| stored.expires_at > Instant::now())
            .map(|stored| stored.data.clone())
    }
}

impl RemoteStore for MemoryStore {
    fn available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        if !self.available() {
            return None;
        }
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(stored) if stored.expires_at > Instant::now() => {
                return Some(stored.data.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    fn setex(&self, key: &str, value: &[u8], ttl_seconds: u64) -> bool {
        // Redis rejects SETEX with a zero TTL
        if !self.available() || ttl_seconds == 0 {
            return false;
        }
        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(ttl_seconds))
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(u32::MAX as u64));
        let mut entries = self.entries.lock();
        entries.insert(
            key.to_string(),
            StoredBytes {
                data: value.to_vec(),
                expires_at,
            },
        );

        if entries.len() > self.watermark {
            let now = Instant::now();
            let before = entries.len();
            entries.retain(|_, stored| stored.expires_at > now);
            debug!(
                removed = before - entries.len(),
                remaining = entries.len(),
                "memory store passed watermark, swept expired entries"
            );
        }
        true
    }

    fn delete(&self, key: &str) -> bool {
        if !self.available() {
            return false;
        }
        self.entries
            .lock()
            .remove(key)
            .is_some_and(|stored| stored.expires_at > Instant::now())
    }

    fn keys_matching(&self, pattern: &GlobPattern) -> Vec<String> {
        if !self.available() {
            return Vec::new();
        }
        let now = Instant::now();
        self.entries
            .lock()
            .iter()
            .filter(|(key, stored)| stored.expires_at > now && pattern.matches(key))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn delete_many(&self, keys: &[String]) -> usize {
        if !self.available() {
            return 0;
        }
        let now = Instant::now();
        let mut entries = self.entries.lock();
        keys.iter()
            .filter_map(|key| entries.remove(key))
            .filter(|stored| stored.expires_at > now)
            .count()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
