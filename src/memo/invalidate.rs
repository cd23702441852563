//! Pattern invalidation after mutations.

use std::sync::Arc;

use crate::cache::{CacheManager, GlobPattern};
use crate::error::Result;

// == Invalidating ==
/// An operation followed by a bulk invalidation of cached reads.
///
/// The pattern is cleared after every completed call, whatever the operation
/// returned: a failed mutation may still have changed something. If the
/// operation panics, nothing is cleared.
pub struct Invalidating<F> {
    manager: Arc<CacheManager>,
    pattern: GlobPattern,
    func: F,
}

impl<F> Invalidating<F> {
    /// Wraps `func`. The pattern is parsed here, so calls cannot fail on it.
    pub fn new(manager: Arc<CacheManager>, pattern: &str, func: F) -> Result<Self> {
        Ok(Self {
            manager,
            pattern: GlobPattern::parse(pattern)?,
            func,
        })
    }

    /// The pattern cleared after each call.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Runs the operation, then clears the pattern.
    pub fn call<A, R>(&self, args: &A) -> R
    where
        A: ?Sized,
        F: Fn(&A) -> R,
    {
        let result = (self.func)(args);
        self.manager.clear_parsed(&self.pattern);
        result
    }
}

impl CacheManager {
    /// Runs `mutate`, then clears every key matching `pattern`.
    ///
    /// The pattern is checked before `mutate` runs, so an invalid pattern
    /// leaves the mutation unexecuted.
    pub fn invalidate_after<R>(&self, pattern: &str, mutate: impl FnOnce() -> R) -> Result<R> {
        let pattern = GlobPattern::parse(pattern)?;
        let result = mutate();
        self.clear_parsed(&pattern);
        Ok(result)
    }
}
