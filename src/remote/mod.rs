//! Remote Layer Module
//!
//! Adapters for the shared key/value store behind the local layer.
//!
//! Every adapter method reports failure through its return value and never
//! raises: a store that is down looks like an empty store that refuses writes.
//!
//! # Implementations
//! - [`RedisStore`]: blocking Redis client with bounded timeouts
//! - [`MemoryStore`]: in-process stand-in with a switchable outage

mod memory_store;
mod redis_store;

pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;

use crate::cache::GlobPattern;

// == Remote Store Trait ==
/// Contract of the remote layer. Values are opaque bytes.
pub trait RemoteStore: Send + Sync {
    /// Latest known availability of the store.
    fn available(&self) -> bool;

    /// Fetches the bytes stored under `key`.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Stores bytes under `key`, expiring after `ttl_seconds`.
    fn setex(&self, key: &str, value: &[u8], ttl_seconds: u64) -> bool;

    /// Removes `key`, returning true if it existed.
    fn delete(&self, key: &str) -> bool;

    /// Lists keys matching the glob pattern.
    fn keys_matching(&self, pattern: &GlobPattern) -> Vec<String>;

    /// Removes the given keys, returning how many existed.
    fn delete_many(&self, keys: &[String]) -> usize;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
