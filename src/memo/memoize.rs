//! Memoization over the cache manager.

use std::sync::Arc;

use tracing::{debug, warn};

use super::key::{CallKey, KeyArgument};
use crate::cache::{CacheManager, Cacheable};

// == Key Derivation ==
/// How a memoized operation turns its arguments into a cache key.
pub trait KeyDerivation<A: ?Sized> {
    fn derive(&self, args: &A) -> String;
}

/// Default derivation: operation identity plus the arguments rendered
/// through [`KeyArgument`], so identified entities key as `type:id`.
#[derive(Debug, Clone, Copy)]
pub struct ByArguments {
    module: &'static str,
    name: &'static str,
}

impl<A: KeyArgument + ?Sized> KeyDerivation<A> for ByArguments {
    fn derive(&self, args: &A) -> String {
        CallKey::new(self.module, self.name).argument(args).build()
    }
}

impl<A: ?Sized, G: Fn(&A) -> String> KeyDerivation<A> for G {
    fn derive(&self, args: &A) -> String {
        self(args)
    }
}

// == Memoized ==
/// An operation whose results are cached in a shared [`CacheManager`].
///
/// Calling it with arguments seen within the TTL window returns the cached
/// result without running the operation.
///
/// ```ignore
/// let returns = Memoized::new(manager.clone(), module_path!(), "sector_returns", 600,
///     |sector: &str| expensive_sector_returns(sector));
/// let tech = returns.call("tech");
/// ```
pub struct Memoized<F, K = ByArguments> {
    manager: Arc<CacheManager>,
    ttl_seconds: u64,
    func: F,
    key: K,
}

impl<F> Memoized<F, ByArguments> {
    /// Wraps `func`, keying calls by `module::name` and the arguments.
    pub fn new(
        manager: Arc<CacheManager>,
        module: &'static str,
        name: &'static str,
        ttl_seconds: u64,
        func: F,
    ) -> Self {
        Self {
            manager,
            ttl_seconds,
            func,
            key: ByArguments { module, name },
        }
    }
}

impl<F, K> Memoized<F, K> {
    /// Replaces the key derivation, e.g. with a closure `|args: &A| -> String`.
    pub fn with_key<K2>(self, key: K2) -> Memoized<F, K2> {
        Memoized {
            manager: self.manager,
            ttl_seconds: self.ttl_seconds,
            func: self.func,
            key,
        }
    }

    /// The cache key a call with `args` would use.
    pub fn key_for<A: ?Sized>(&self, args: &A) -> String
    where
        K: KeyDerivation<A>,
    {
        self.key.derive(args)
    }

    // == Call ==
    /// Returns the cached result for `args`, computing and storing it on a miss.
    pub fn call<A, R>(&self, args: &A) -> R
    where
        A: ?Sized,
        F: Fn(&A) -> R,
        K: KeyDerivation<A>,
        R: Cacheable,
    {
        let key = self.key.derive(args);
        self.manager
            .get_or_compute(&key, self.ttl_seconds, || (self.func)(args))
    }

    /// Like [`call`](Self::call) for fallible operations. Errors are returned
    /// as-is and never cached.
    pub fn try_call<A, R, E>(&self, args: &A) -> Result<R, E>
    where
        A: ?Sized,
        F: Fn(&A) -> Result<R, E>,
        K: KeyDerivation<A>,
        R: Cacheable,
    {
        let key = self.key.derive(args);
        self.manager
            .try_get_or_compute(&key, self.ttl_seconds, || (self.func)(args))
    }
}

impl CacheManager {
    // == Get Or Compute ==
    /// Returns the cached value for `key`, or runs `compute` and caches its
    /// result for `ttl_seconds`.
    ///
    /// An invalid key bypasses the cache and always computes.
    pub fn get_or_compute<T, C>(&self, key: &str, ttl_seconds: u64, compute: C) -> T
    where
        T: Cacheable,
        C: FnOnce() -> T,
    {
        match self.get::<T>(key) {
            Ok(Some(value)) => return value,
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "Bypassing cache for call");
                return compute();
            }
        }

        let value = compute();
        // Key already validated by get
        let _ = self.set(key, value.clone(), ttl_seconds);
        debug!(key = %key, "memoized result stored");
        value
    }

    /// Fallible variant of [`get_or_compute`](Self::get_or_compute). Only
    /// `Ok` results are cached.
    pub fn try_get_or_compute<T, E, C>(&self, key: &str, ttl_seconds: u64, compute: C) -> Result<T, E>
    where
        T: Cacheable,
        C: FnOnce() -> Result<T, E>,
    {
        match self.get::<T>(key) {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, error = %e, "Bypassing cache for call");
                return compute();
            }
        }

        let value = compute()?;
        let _ = self.set(key, value.clone(), ttl_seconds);
        Ok(value)
    }
}
