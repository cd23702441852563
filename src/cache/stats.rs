//! Cache Statistics Module
//!
//! Tracks hit/miss, write and delete counters for the cache manager.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time snapshot of cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups answered by either layer
    pub hits: u64,
    /// Lookups answered by neither layer
    pub misses: u64,
    /// hits / (hits + misses), 0.0 before any lookup
    pub hit_rate: f64,
    /// Successful writes
    pub sets: u64,
    /// Entries removed by delete or pattern invalidation
    pub deletes: u64,
    /// Hits served by the local layer
    pub local_hits: u64,
    /// Hits served by the remote layer
    pub remote_hits: u64,
    /// Entries currently held by the local layer
    pub local_entry_count: usize,
    /// Latest known remote layer availability
    pub remote_available: bool,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn compute_hit_rate(hits: u64, misses: u64) -> f64 {
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

// == Counters ==
/// Monotonic counters shared by all threads using a manager.
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    local_hits: AtomicU64,
    remote_hits: AtomicU64,
}

impl CacheCounters {
    // == Constructor ==
    /// Creates counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a hit served by the local layer.
    pub fn record_local_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.local_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a hit served by the remote layer.
    pub fn record_remote_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.remote_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the miss counter.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the set counter.
    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds `count` removed entries to the delete counter.
    pub fn record_deletes(&self, count: u64) {
        self.deletes.fetch_add(count, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Builds a snapshot combining the counters with the supplied gauges.
    pub fn snapshot(&self, local_entry_count: usize, remote_available: bool) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        CacheStats {
            hits,
            misses,
            hit_rate: CacheStats::compute_hit_rate(hits, misses),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            local_hits: self.local_hits.load(Ordering::Relaxed),
            remote_hits: self.remote_hits.load(Ordering::Relaxed),
            local_entry_count,
            remote_available,
        }
    }
}
