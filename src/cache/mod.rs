//! Cache Module
//!
//! Two-layer caching: an in-process TTL map in front of a shared remote store.

pub mod codec;
mod entry;
mod local;
mod manager;
mod pattern;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use codec::Format;
pub use entry::{current_timestamp_ms, LocalEntry};
pub use local::LocalLayer;
pub use manager::{CacheManager, Cacheable};
pub use pattern::GlobPattern;
pub use stats::{CacheCounters, CacheStats};
