//! Cache key derivation for memoized operations.
//!
//! A key is the operation's identity followed by its arguments:
//!
//! ```text
//! analytics::sector_returns("tech",30,period="1y")
//! portfolio::risk(Portfolio:42)
//! ```
//!
//! Keys longer than [`MAX_KEY_LENGTH`] keep the operation prefix and replace
//! the argument list with a SHA-256 digest. The digest is one-way: the
//! arguments cannot be recovered from such a key.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use sha2::{Digest, Sha256};

/// Keys longer than this are hashed.
pub const MAX_KEY_LENGTH: usize = 100;

// == Cache Identity ==
/// Arguments with a stable identity, keyed as `type:id` instead of by value.
pub trait CacheIdentity {
    /// Type name used in the key, e.g. `"Portfolio"`.
    fn cache_type(&self) -> &str;
    /// Stable identifier, e.g. a database id.
    fn cache_id(&self) -> String;
}

// == Key Arguments ==
/// How an argument of a default-keyed memoized call appears in its key.
///
/// Types with a [`CacheIdentity`] render as `type:id`. Primitives, strings
/// and std collections render through `Debug`. A tuple spreads into one
/// positional argument per element, and `()` adds none.
pub trait KeyArgument {
    fn key_part(&self) -> String;
}

impl<E: CacheIdentity + ?Sized> KeyArgument for E {
    fn key_part(&self) -> String {
        format!("{}:{}", self.cache_type(), self.cache_id())
    }
}

macro_rules! debug_key_argument {
    ($($ty:ty),* $(,)?) => {
        $(
            impl KeyArgument for $ty {
                fn key_part(&self) -> String {
                    format!("{:?}", self)
                }
            }
        )*
    };
}

debug_key_argument!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, str,
    String,
);

impl<T: Debug> KeyArgument for [T] {
    fn key_part(&self) -> String {
        format!("{:?}", self)
    }
}

impl<T: Debug> KeyArgument for Vec<T> {
    fn key_part(&self) -> String {
        format!("{:?}", self)
    }
}

impl<T: Debug> KeyArgument for Option<T> {
    fn key_part(&self) -> String {
        format!("{:?}", self)
    }
}

impl<T: Debug> KeyArgument for BTreeSet<T> {
    fn key_part(&self) -> String {
        format!("{:?}", self)
    }
}

impl<K: Debug, V: Debug> KeyArgument for BTreeMap<K, V> {
    fn key_part(&self) -> String {
        format!("{:?}", self)
    }
}

impl KeyArgument for () {
    fn key_part(&self) -> String {
        String::new()
    }
}

macro_rules! tuple_key_argument {
    ($($name:ident),+) => {
        impl<$($name: KeyArgument),+> KeyArgument for ($($name,)+) {
            #[allow(non_snake_case)]
            fn key_part(&self) -> String {
                let ($($name,)+) = self;
                let parts: Vec<String> = vec![$($name.key_part()),+];
                parts.join(",")
            }
        }
    };
}

tuple_key_argument!(A);
tuple_key_argument!(A, B);
tuple_key_argument!(A, B, C);
tuple_key_argument!(A, B, C, D);
tuple_key_argument!(A, B, C, D, E);
tuple_key_argument!(A, B, C, D, E, F);

// == Call Key ==
/// Builder for the cache key of one call.
///
/// Positional arguments use their `Debug` form, so ordered collections give
/// deterministic keys and `HashMap` arguments do not. Keyword arguments are
/// sorted by name.
#[derive(Debug, Clone)]
pub struct CallKey {
    operation: String,
    args: Vec<String>,
    kwargs: BTreeMap<String, String>,
}

impl CallKey {
    /// Starts a key for `module::name`.
    pub fn new(module: &str, name: &str) -> Self {
        Self {
            operation: format!("{}::{}", module, name),
            args: Vec::new(),
            kwargs: BTreeMap::new(),
        }
    }

    /// Adds a positional argument keyed by its `Debug` form.
    pub fn arg<A: Debug + ?Sized>(mut self, value: &A) -> Self {
        self.args.push(format!("{:?}", value));
        self
    }

    /// Adds a positional argument keyed by its identity.
    pub fn entity<E: CacheIdentity + ?Sized>(mut self, value: &E) -> Self {
        self.args
            .push(format!("{}:{}", value.cache_type(), value.cache_id()));
        self
    }

    /// Adds an argument rendered through [`KeyArgument`]. Used by the default
    /// key of [`Memoized`](crate::memo::Memoized).
    pub fn argument<A: KeyArgument + ?Sized>(mut self, value: &A) -> Self {
        let part = value.key_part();
        if !part.is_empty() {
            self.args.push(part);
        }
        self
    }

    /// Adds a keyword argument.
    pub fn kwarg<A: Debug + ?Sized>(mut self, name: &str, value: &A) -> Self {
        self.kwargs.insert(name.to_string(), format!("{:?}", value));
        self
    }

    /// Glob pattern covering every key of this operation.
    pub fn operation_pattern(&self) -> String {
        format!("{}*", escape_glob(&self.operation))
    }

    // == Build ==
    /// Renders the key, hashing the argument part if the key is too long.
    pub fn build(&self) -> String {
        let rendered = self.render();
        if rendered.len() <= MAX_KEY_LENGTH {
            return rendered;
        }

        let digest = Sha256::digest(rendered.as_bytes());
        format!("{}#{}", self.operation, hex::encode(digest))
    }

    fn render(&self) -> String {
        let kwargs = self.kwargs.iter().map(|(k, v)| format!("{}={}", k, v));
        let parts: Vec<String> = self.args.iter().cloned().chain(kwargs).collect();
        format!("{}({})", self.operation, parts.join(","))
    }
}

/// Escapes glob metacharacters so `text` matches only itself.
pub fn escape_glob(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
