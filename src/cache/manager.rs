//! Cache Manager Module
//!
//! Read-through / write-through orchestration of the local and remote layers.
//!
//! ```text
//! get: local ──miss──> remote ──hit──> decode ──> promote to local ──> caller
//! set: encode ──> remote SETEX(ttl)      local(min(ttl, local cap))
//! ```
//!
//! Layer failures never reach the caller. Only an empty key or a malformed
//! pattern is reported as an error.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::cache::{codec, CacheCounters, CacheStats, GlobPattern, LocalLayer};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::remote::{RedisStore, RemoteStore};

// == Cacheable ==
/// Values the manager can hold: stored as-is locally, encoded for the remote.
pub trait Cacheable: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Cacheable for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

// == Cache Manager ==
/// Two-layer cache shared by every caller in the process.
///
/// Construct once at startup, share behind an `Arc`, drop at shutdown.
pub struct CacheManager {
    local: LocalLayer,
    remote: Arc<dyn RemoteStore>,
    counters: CacheCounters,
    local_ttl_cap: u64,
    default_ttl: u64,
}

impl CacheManager {
    // == Constructors ==
    /// Builds a manager from configuration, connecting to Redis if configured.
    pub fn new(config: &Config) -> Self {
        let remote = RedisStore::connect(&config.remote_url, config.remote_timeout());
        Self::with_remote(config, Arc::new(remote))
    }

    /// Builds a manager over an already constructed remote store.
    pub fn with_remote(config: &Config, remote: Arc<dyn RemoteStore>) -> Self {
        debug!(
            remote = remote.name(),
            remote_available = remote.available(),
            watermark = config.local_entry_watermark,
            local_ttl_cap = config.local_ttl_cap,
            "Cache manager initialized"
        );
        Self {
            local: LocalLayer::new(config.local_entry_watermark),
            remote,
            counters: CacheCounters::new(),
            local_ttl_cap: config.local_ttl_cap,
            default_ttl: config.default_ttl,
        }
    }

    /// Builds a local-only manager.
    pub fn local_only(config: &Config) -> Self {
        Self::with_remote(config, Arc::new(RedisStore::disabled()))
    }

    // == Get ==
    /// Looks a key up in the local layer, then the remote layer.
    ///
    /// A remote hit is promoted into the local layer. Undecodable remote bytes
    /// count as a miss.
    pub fn get<T: Cacheable>(&self, key: &str) -> Result<Option<T>> {
        validate_key(key)?;

        if let Some(value) = self.local.get::<T>(key) {
            self.counters.record_local_hit();
            debug!(key = %key, "cache hit (local)");
            return Ok(Some(value));
        }

        if let Some(value) = self.remote_get::<T>(key) {
            self.counters.record_remote_hit();
            let promote_ttl = self.default_ttl.min(self.local_ttl_cap);
            self.local.set(key, value.clone(), promote_ttl);
            debug!(key = %key, ttl = promote_ttl, "cache hit (remote), promoted");
            return Ok(Some(value));
        }

        self.counters.record_miss();
        debug!(key = %key, "cache miss");
        Ok(None)
    }

    fn remote_get<T: Cacheable>(&self, key: &str) -> Option<T> {
        if !self.remote.available() {
            return None;
        }
        let bytes = self.remote.get(key)?;
        match codec::decode::<T>(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Undecodable remote entry treated as miss");
                None
            }
        }
    }

    // == Set ==
    /// Writes a value to both layers.
    ///
    /// The remote copy lives `ttl_seconds`, the local copy at most the local
    /// cap. Returns true if at least one layer accepted the write. A zero TTL
    /// stores nothing and returns false.
    pub fn set<T: Cacheable>(&self, key: &str, value: T, ttl_seconds: u64) -> Result<bool> {
        validate_key(key)?;

        if ttl_seconds == 0 {
            debug!(key = %key, "zero TTL, nothing stored");
            return Ok(false);
        }

        let remote_ok = self.remote_set(key, &value, ttl_seconds);
        let local_ok = self.local.set(key, value, ttl_seconds.min(self.local_ttl_cap));

        let stored = remote_ok || local_ok;
        if stored {
            self.counters.record_set();
        }
        debug!(key = %key, ttl = ttl_seconds, remote = remote_ok, local = local_ok, "cache set");
        Ok(stored)
    }

    fn remote_set<T: Cacheable>(&self, key: &str, value: &T, ttl_seconds: u64) -> bool {
        if !self.remote.available() {
            return false;
        }
        match codec::encode(value) {
            Ok(bytes) => self.remote.setex(key, &bytes, ttl_seconds),
            Err(e) => {
                warn!(key = %key, error = %e, "Value not encodable, stored locally only");
                false
            }
        }
    }

    // == Delete ==
    /// Removes a key from both layers. Returns true if either held it.
    pub fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        let local_ok = self.local.delete(key);
        let remote_ok = self.remote.available() && self.remote.delete(key);

        let deleted = local_ok || remote_ok;
        if deleted {
            self.counters.record_deletes(1);
        }
        debug!(key = %key, local = local_ok, remote = remote_ok, "cache delete");
        Ok(deleted)
    }

    // == Clear Pattern ==
    /// Removes every key matching the glob pattern from both layers.
    ///
    /// Returns the number of distinct keys removed. A key held by both layers
    /// counts once.
    pub fn clear_pattern(&self, pattern: &str) -> Result<usize> {
        let pattern = GlobPattern::parse(pattern)?;
        Ok(self.clear_parsed(&pattern))
    }

    pub(crate) fn clear_parsed(&self, pattern: &GlobPattern) -> usize {
        let local_removed = self.local.remove_matching(pattern);

        let remote_only_removed = if self.remote.available() {
            let (shared, remote_only): (Vec<String>, Vec<String>) = self
                .remote
                .keys_matching(pattern)
                .into_iter()
                .partition(|key| local_removed.contains(key));
            if !shared.is_empty() {
                self.remote.delete_many(&shared);
            }
            self.remote.delete_many(&remote_only)
        } else {
            0
        };

        let total = local_removed.len() + remote_only_removed;
        self.counters.record_deletes(total as u64);
        debug!(
            pattern = %pattern,
            local = local_removed.len(),
            remote_only = remote_only_removed,
            "cache pattern cleared"
        );
        total
    }

    // == Stats ==
    /// Snapshot of counters and gauges. Safe to call from any thread.
    pub fn stats(&self) -> CacheStats {
        self.counters
            .snapshot(self.local.len(), self.remote.available())
    }

    /// Sweeps expired entries out of the local layer.
    pub fn sweep_local(&self) -> usize {
        self.local.sweep_expired()
    }

    /// The local layer, for inspection.
    pub fn local(&self) -> &LocalLayer {
        &self.local
    }

    /// Latest known remote availability.
    pub fn remote_available(&self) -> bool {
        self.remote.available()
    }

    /// Upper bound on local entry lifetime in seconds.
    pub fn local_ttl_cap(&self) -> u64 {
        self.local_ttl_cap
    }

    /// TTL used by callers that do not pick one.
    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("remote", &self.remote.name())
            .field("remote_available", &self.remote.available())
            .field("local_entries", &self.local.len())
            .field("local_ttl_cap", &self.local_ttl_cap)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
    }
    Ok(())
}
