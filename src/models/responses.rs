//! Response DTOs for the operations API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: Value,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for pattern invalidation (DELETE /invalidate/:pattern)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    /// The pattern that was cleared
    pub pattern: String,
    /// Entries removed across both layers
    pub removed: usize,
}

impl InvalidateResponse {
    /// Creates a new InvalidateResponse
    pub fn new(pattern: impl Into<String>, removed: usize) -> Self {
        Self {
            pattern: pattern.into(),
            removed,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
pub type StatsResponse = CacheStats;

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status: "healthy", or "degraded" when running local-only
    pub status: String,
    /// Whether the remote layer is reachable
    pub remote_available: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a HealthResponse reflecting remote availability
    pub fn new(remote_available: bool) -> Self {
        let status = if remote_available { "healthy" } else { "degraded" };
        Self {
            status: status.to_string(),
            remote_available,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
