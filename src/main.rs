//! Tiercache server binary
//!
//! Serves the cache operations API over a manager built from the environment.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiercache::api::{create_router, AppState};
use tiercache::{spawn_sweep_task, CacheManager, Config};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache manager, connecting the remote layer if configured
/// 4. Start the periodic local sweep if enabled
/// 5. Serve the operations API until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiercache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tiercache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: remote_enabled={}, watermark={}, local_ttl_cap={}s, default_ttl={}s, port={}",
        config.remote_enabled(),
        config.local_entry_watermark,
        config.local_ttl_cap,
        config.default_ttl,
        config.server_port
    );

    // Connecting may block for up to the remote timeout
    let manager = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || CacheManager::new(&config))
            .await
            .context("cache manager initialization panicked")?
    };
    let manager = Arc::new(manager);
    info!("Cache manager initialized: {:?}", manager);

    let sweep_handle = if config.sweep_interval > 0 {
        let handle = spawn_sweep_task(manager.clone(), config.sweep_interval);
        info!("Background sweep task started");
        Some(handle)
    } else {
        None
    };

    let app = create_router(AppState::new(manager.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweep_handle))
        .await
        .context("server error")?;

    let stats = manager.stats();
    info!(
        "Server shutdown complete: hits={}, misses={}, hit_rate={:.3}",
        stats.hits, stats.misses, stats.hit_rate
    );
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the sweep task if one is running.
async fn shutdown_signal(sweep_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = sweep_handle {
        handle.abort();
        warn!("Sweep task aborted");
    }
}
