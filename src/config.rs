//! Configuration Module
//!
//! Handles loading cache manager and host configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Cache manager and host configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection string; empty disables the remote layer
    pub remote_url: String,
    /// Local entry count above which a `set` sweeps expired entries
    pub local_entry_watermark: usize,
    /// Upper bound in seconds on how long an entry lives in the local layer
    pub local_ttl_cap: u64,
    /// TTL in seconds assumed for remote entries when promoting them locally
    pub default_ttl: u64,
    /// Connect, read and write timeout for the remote store in milliseconds
    pub remote_timeout_ms: u64,
    /// Periodic local sweep interval in seconds, 0 disables the task
    pub sweep_interval: u64,
    /// HTTP server port of the hosting binary
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_REMOTE_URL` - Redis URL, e.g. `redis://127.0.0.1:6379` (default: empty)
    /// - `CACHE_LOCAL_WATERMARK` - Local sweep watermark (default: 1000)
    /// - `CACHE_LOCAL_TTL_CAP` - Local TTL cap in seconds (default: 300)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `CACHE_REMOTE_TIMEOUT_MS` - Remote timeout in milliseconds (default: 500)
    /// - `CACHE_SWEEP_INTERVAL` - Periodic sweep in seconds (default: 0, disabled)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            remote_url: env::var("CACHE_REMOTE_URL")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.remote_url),
            local_entry_watermark: env_or("CACHE_LOCAL_WATERMARK", defaults.local_entry_watermark),
            local_ttl_cap: env_or("CACHE_LOCAL_TTL_CAP", defaults.local_ttl_cap),
            default_ttl: env_or("CACHE_DEFAULT_TTL", defaults.default_ttl),
            remote_timeout_ms: env_or("CACHE_REMOTE_TIMEOUT_MS", defaults.remote_timeout_ms),
            sweep_interval: env_or("CACHE_SWEEP_INTERVAL", defaults.sweep_interval),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Returns true when a remote connection target is configured.
    pub fn remote_enabled(&self) -> bool {
        !self.remote_url.is_empty()
    }

    /// Remote store timeout as a Duration.
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_url: String::new(),
            local_entry_watermark: 1000,
            local_ttl_cap: 300,
            default_ttl: 3600,
            remote_timeout_ms: 500,
            sweep_interval: 0,
            server_port: 3000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.remote_url.is_empty());
        assert!(!config.remote_enabled());
        assert_eq!(config.local_entry_watermark, 1000);
        assert_eq!(config.local_ttl_cap, 300);
        assert_eq!(config.default_ttl, 3600);
        assert_eq!(config.remote_timeout(), Duration::from_millis(500));
        assert_eq!(config.sweep_interval, 0);
        assert_eq!(config.server_port, 3000);
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the environment to avoid races between tests
        env::remove_var("CACHE_REMOTE_URL");
        env::remove_var("CACHE_LOCAL_TTL_CAP");
        env::set_var("CACHE_LOCAL_WATERMARK", "50");
        env::set_var("CACHE_DEFAULT_TTL", "not-a-number");

        let config = Config::from_env();
        assert!(!config.remote_enabled());
        assert_eq!(config.local_entry_watermark, 50);
        assert_eq!(config.local_ttl_cap, 300);
        assert_eq!(config.default_ttl, 3600);

        env::set_var("CACHE_REMOTE_URL", " redis://10.0.0.1:6379 ");
        let config = Config::from_env();
        assert_eq!(config.remote_url, "redis://10.0.0.1:6379");
        assert!(config.remote_enabled());

        env::remove_var("CACHE_REMOTE_URL");
        env::remove_var("CACHE_LOCAL_WATERMARK");
        env::remove_var("CACHE_DEFAULT_TTL");
    }
}
