//! Tiercache - a two-layer read-through cache
//!
//! A bounded in-process TTL map sits in front of a shared Redis store. Values
//! are typed on the way in and out, the remote copy is tagged JSON or
//! MessagePack, and an unreachable remote degrades to local-only caching.
//! The `memo` module builds function memoization and write-side pattern
//! invalidation on top of the manager.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod memo;
pub mod models;
pub mod remote;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheManager, CacheStats, Cacheable, GlobPattern};
pub use config::Config;
pub use error::{CacheError, Result};
pub use memo::{CacheIdentity, CallKey, Invalidating, KeyArgument, Memoized};
pub use remote::{MemoryStore, RedisStore, RemoteStore};
pub use tasks::spawn_sweep_task;
