//! Local Sweep Task
//!
//! Periodically removes expired entries from the local layer, for write-heavy
//! workloads where entries are rarely read again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheManager;

/// Spawns a task that sweeps the manager's local layer every
/// `interval_secs` seconds.
///
/// The sweep holds the local mutex for one pass over the map, so it runs on
/// the blocking pool rather than an async worker.
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let manager = Arc::new(CacheManager::new(&config));
/// let sweep_handle = spawn_sweep_task(manager.clone(), 60);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(manager: Arc<CacheManager>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting local sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let manager = Arc::clone(&manager);
            let removed = tokio::task::spawn_blocking(move || manager.sweep_local())
                .await
                .unwrap_or(0);

            if removed > 0 {
                info!("Local sweep: removed {} expired entries", removed);
            } else {
                debug!("Local sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn manager() -> Arc<CacheManager> {
        Arc::new(CacheManager::local_only(&Config::default()))
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let manager = manager();
        manager.set("expire_soon", "value".to_string(), 1).unwrap();

        let handle = spawn_sweep_task(manager.clone(), 1);

        tokio::time::sleep(Duration::from_millis(2500)).await;

        // Removed without anyone reading it
        assert_eq!(manager.local().len(), 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let manager = manager();
        manager.set("long_lived", "value".to_string(), 3600).unwrap();

        let handle = spawn_sweep_task(manager.clone(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(
            manager.get::<String>("long_lived").unwrap().as_deref(),
            Some("value")
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let handle = spawn_sweep_task(manager(), 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
