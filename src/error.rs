//! Error types for the fetch cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Fetch Cache Error Enum ==
/// Unified error type for fetching, caching and expiring responses.
///
/// Only `Network` and `InvalidRequest` ever reach a `fetch_and_cache` caller.
/// The other variants are produced by background work and end up in the logs.
#[derive(Error, Debug)]
pub enum FetchCacheError {
    /// The transport failed before a response was obtained
    #[error("Network error: {0}")]
    Network(String),

    /// Opening or writing the content cache failed
    #[error("Cache write failed: {0}")]
    CacheWrite(String),

    /// Opening, reading or writing the metadata index failed
    #[error("Metadata store error: {0}")]
    Metadata(String),

    /// Removing a key during an eviction pass failed
    #[error("Eviction of {key} failed: {reason}")]
    EvictionDelete { key: String, reason: String },

    /// Malformed URL, method or header
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Key or cache not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for FetchCacheError {
    fn from(err: reqwest::Error) -> Self {
        FetchCacheError::Network(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for FetchCacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            FetchCacheError::Network(_) => StatusCode::BAD_GATEWAY,
            FetchCacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            FetchCacheError::NotFound(_) => StatusCode::NOT_FOUND,
            FetchCacheError::CacheWrite(_)
            | FetchCacheError::Metadata(_)
            | FetchCacheError::EvictionDelete { .. }
            | FetchCacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the fetch cache.
pub type Result<T> = std::result::Result<T, FetchCacheError>;
