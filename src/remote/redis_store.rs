//! Redis-backed remote store.
//!
//! One blocking connection, opened eagerly with connect/read/write timeouts.
//! A failed connect leaves the adapter unavailable for its lifetime, and a
//! transport error later on discards the connection and does the same.
//! Reconnecting means building a new adapter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use redis::{Commands, Connection, RedisError, RedisResult};
use tracing::{debug, info, warn};

use super::RemoteStore;
use crate::cache::GlobPattern;

/// Keys requested per SCAN round trip.
const SCAN_BATCH: usize = 100;

/// Remote store speaking to a Redis server.
pub struct RedisStore {
    /// Server address for logs, without credentials
    addr: String,
    conn: Mutex<Option<Connection>>,
    available: AtomicBool,
}

impl RedisStore {
    // == Constructor ==
    /// Connects to `url`, bounding connect and every command by `timeout`.
    ///
    /// Never fails: an empty URL or an unreachable server yields an adapter
    /// whose `available()` is false.
    pub fn connect(url: &str, timeout: Duration) -> Self {
        if url.is_empty() {
            info!("No remote cache configured, running local-only");
            return Self::disabled();
        }

        let client = match redis::Client::open(url) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Invalid remote cache URL, running local-only");
                return Self::disabled();
            }
        };
        let addr = client.get_connection_info().addr.to_string();

        match open_connection(&client, timeout) {
            Ok(conn) => {
                info!(addr = %addr, "Remote cache connected");
                Self {
                    addr,
                    conn: Mutex::new(Some(conn)),
                    available: AtomicBool::new(true),
                }
            }
            Err(e) => {
                warn!(addr = %addr, error = %e, "Remote cache unreachable, running local-only");
                Self {
                    addr,
                    conn: Mutex::new(None),
                    available: AtomicBool::new(false),
                }
            }
        }
    }

    /// An adapter with no connection at all.
    pub fn disabled() -> Self {
        Self {
            addr: String::new(),
            conn: Mutex::new(None),
            available: AtomicBool::new(false),
        }
    }

    /// Runs a command on the connection, swallowing and logging any error.
    fn with_conn<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut Connection) -> RedisResult<T>,
    ) -> Option<T> {
        let mut guard = self.conn.lock();
        let conn = guard.as_mut()?;

        match f(conn) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(op, addr = %self.addr, error = %e, "Remote cache command failed");
                if is_transport_error(&e) {
                    *guard = None;
                    self.available.store(false, Ordering::SeqCst);
                    warn!(addr = %self.addr, "Remote cache marked unavailable");
                }
                None
            }
        }
    }
}

fn open_connection(client: &redis::Client, timeout: Duration) -> RedisResult<Connection> {
    let mut conn = client.get_connection_with_timeout(timeout)?;
    conn.set_read_timeout(Some(timeout))?;
    conn.set_write_timeout(Some(timeout))?;
    redis::cmd("PING").query::<String>(&mut conn)?;
    Ok(conn)
}

/// Errors after which the connection cannot be trusted: a timed out reply
/// may still arrive and desynchronize the next command.
fn is_transport_error(e: &RedisError) -> bool {
    e.is_io_error() || e.is_timeout() || e.is_connection_dropped() || e.is_connection_refusal()
}

impl RemoteStore for RedisStore {
    fn available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.with_conn("GET", |conn| conn.get::<_, Option<Vec<u8>>>(key))
            .flatten()
    }

    fn setex(&self, key: &str, value: &[u8], ttl_seconds: u64) -> bool {
        if ttl_seconds == 0 {
            debug!(key = %key, "Skipping remote write with zero TTL");
            return false;
        }
        self.with_conn("SETEX", |conn| conn.set_ex::<_, _, ()>(key, value, ttl_seconds))
            .is_some()
    }

    fn delete(&self, key: &str) -> bool {
        self.with_conn("DEL", |conn| conn.del::<_, i64>(key))
            .is_some_and(|deleted| deleted > 0)
    }

    fn keys_matching(&self, pattern: &GlobPattern) -> Vec<String> {
        self.with_conn("SCAN", |conn| {
            let mut keys = Vec::new();
            let mut cursor: u64 = 0;
            loop {
                let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern.as_str())
                    .arg("COUNT")
                    .arg(SCAN_BATCH)
                    .query(conn)?;
                keys.extend(batch);
                cursor = next;
                if cursor == 0 {
                    break;
                }
            }
            // SCAN may return a key more than once
            keys.sort_unstable();
            keys.dedup();
            Ok(keys)
        })
        .unwrap_or_default()
    }

    fn delete_many(&self, keys: &[String]) -> usize {
        if keys.is_empty() {
            return 0;
        }
        self.with_conn("DEL", |conn| conn.del::<_, i64>(keys))
            .map_or(0, |deleted| deleted.max(0) as usize)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("addr", &self.addr)
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_inert(store: &RedisStore) {
        let pattern = GlobPattern::parse("*").unwrap();
        assert!(!store.available());
        assert_eq!(store.get("k"), None);
        assert!(!store.setex("k", b"v", 60));
        assert!(!store.delete("k"));
        assert!(store.keys_matching(&pattern).is_empty());
        assert_eq!(store.delete_many(&["k".to_string()]), 0);
    }

    #[test]
    fn test_empty_url_is_disabled() {
        let store = RedisStore::connect("", Duration::from_millis(100));
        assert_inert(&store);
    }

    #[test]
    fn test_invalid_url_is_disabled() {
        let store = RedisStore::connect("not a redis url", Duration::from_millis(100));
        assert_inert(&store);
    }

    #[test]
    fn test_unreachable_server_is_unavailable() {
        // Nothing listens on port 1
        let store = RedisStore::connect("redis://127.0.0.1:1/", Duration::from_millis(200));
        assert_inert(&store);
        assert_eq!(store.name(), "redis");
    }
}
