//! Response types
//!
//! `CachedResponse` is the payload handed to callers and stored in content
//! caches. The remaining types are JSON bodies returned by the HTTP front end.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::Result;
use crate::models::requests::parse_header;

// == Cached Response ==
/// A fully buffered upstream response.
///
/// Cloning shares the body buffer, so the caller and the cache write can each
/// hold their own copy without reading the body twice.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    /// Creates a response with no headers.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Appends a header, validating both name and value.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let (name, value) = parse_header(name, value)?;
        self.headers.append(name, value);
        Ok(self)
    }
}

/// Headers that describe the upstream connection rather than the payload.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    [
        header::CONNECTION,
        header::TRANSFER_ENCODING,
        header::CONTENT_LENGTH,
        header::UPGRADE,
        header::TE,
    ]
    .contains(name)
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in self.headers.iter() {
            if !is_hop_by_hop(name) {
                headers.append(name.clone(), value.clone());
            }
        }
        response
    }
}

/// Response body for POST /cache/rename
#[derive(Debug, Clone, Serialize)]
pub struct RenameResponse {
    pub message: String,
    pub source: String,
    pub destination: String,
}

impl RenameResponse {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        let source = source.into();
        let destination = destination.into();
        Self {
            message: format!("Cache '{}' renamed to '{}'", source, destination),
            source,
            destination,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_into_response_drops_hop_by_hop() {
        let cached = CachedResponse::new(StatusCode::CREATED, "payload")
            .with_header("content-type", "text/plain")
            .unwrap()
            .with_header("transfer-encoding", "chunked")
            .unwrap();

        let response = cached.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("content-type").unwrap(), "text/plain");
        assert!(response.headers().get("transfer-encoding").is_none());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"payload");
    }

    #[test]
    fn test_clone_shares_body() {
        let original = CachedResponse::new(StatusCode::OK, vec![1u8, 2, 3]);
        let copy = original.clone();
        assert_eq!(original.body.as_ptr(), copy.body.as_ptr());
    }

    #[test]
    fn test_rename_response_serialize() {
        let resp = RenameResponse::new("old", "new");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("renamed"));
        assert!(json.contains("\"destination\":\"new\""));
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
