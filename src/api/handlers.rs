//! API Handlers
//!
//! HTTP request handlers for the cache operations endpoints.
//!
//! The manager is synchronous and may block on the remote store, so every
//! handler hands its work to the blocking pool.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::CacheManager;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, InvalidateResponse, SetRequest, SetResponse,
    StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared two-layer cache
    pub manager: Arc<CacheManager>,
}

impl AppState {
    /// Creates a new AppState around an existing manager.
    pub fn new(manager: Arc<CacheManager>) -> Self {
        Self { manager }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Connects the remote layer when one is configured.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(CacheManager::new(config)))
    }
}

/// Runs a manager call on the blocking pool.
async fn with_manager<T, F>(state: &AppState, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&CacheManager) -> Result<T> + Send + 'static,
{
    let manager = Arc::clone(&state.manager);
    tokio::task::spawn_blocking(move || f(&manager))
        .await
        .map_err(|e| CacheError::Internal(format!("cache task failed: {}", e)))?
}

/// Handler for PUT /set
///
/// Stores a JSON value in both layers. Without a `ttl` the manager's
/// default TTL applies.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let SetRequest { key, value, ttl } = req;
    let stored_key = key.clone();
    with_manager(&state, move |manager| {
        let ttl = ttl.unwrap_or_else(|| manager.default_ttl());
        manager.set(&stored_key, value, ttl)
    })
    .await?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let lookup = key.clone();
    let value = with_manager(&state, move |manager| manager.get::<Value>(&lookup)).await?;

    match value {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let target = key.clone();
    let removed = with_manager(&state, move |manager| manager.delete(&target)).await?;

    if !removed {
        return Err(CacheError::NotFound(key));
    }
    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for DELETE /invalidate/:pattern
///
/// Removes every key matching the glob pattern from both layers.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    let glob = pattern.clone();
    let removed = with_manager(&state, move |manager| manager.clear_pattern(&glob)).await?;

    Ok(Json(InvalidateResponse::new(pattern, removed)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let stats = with_manager(&state, |manager| Ok(manager.stats())).await?;
    Ok(Json(stats))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::new(state.manager.remote_available()))
}
