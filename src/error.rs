//! Error types for the cache manager
//!
//! Provides unified error handling using thiserror.
//!
//! Only caller misuse surfaces as a `CacheError` from the manager. Transport
//! and serialization failures are logged and degraded into misses, so
//! `CodecError` never leaves the crate's cache layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Caller-visible error type.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Empty key passed to a cache operation
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Glob pattern that cannot be parsed
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Key not found in either layer (HTTP surface only)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data (HTTP surface only)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        CacheError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

// == Codec Error Enum ==
/// Failures of the entry codec.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MessagePack encoding failed: {0}")]
    MsgpackEncode(#[from] rmp_serde::encode::Error),

    #[error("MessagePack decoding failed: {0}")]
    MsgpackDecode(#[from] rmp_serde::decode::Error),

    #[error("JSON round trip changed the value")]
    JsonLossy,

    #[error("empty record")]
    Empty,

    #[error("unknown format tag {0:#04x}")]
    UnknownTag(u8),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            CacheError::InvalidPattern { .. } => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache manager.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let resp = CacheError::NotFound("k".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = CacheError::invalid_pattern("[a", "unterminated class").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = CacheError::Internal("boom".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_invalid_pattern_message() {
        let err = CacheError::invalid_pattern("user:[", "unterminated character class");
        assert_eq!(
            err.to_string(),
            "Invalid pattern 'user:[': unterminated character class"
        );
    }
}
