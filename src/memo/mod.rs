//! Memo Module
//!
//! Higher-order wrappers over a shared [`CacheManager`](crate::cache::CacheManager):
//! memoization of expensive reads and pattern invalidation after writes.

mod invalidate;
mod key;
mod memoize;

pub use invalidate::Invalidating;
pub use key::{escape_glob, CacheIdentity, CallKey, KeyArgument, MAX_KEY_LENGTH};
pub use memoize::{ByArguments, KeyDerivation, Memoized};
