//! Network transport
//!
//! Issues outgoing requests and buffers the response.

use async_trait::async_trait;
use axum::http::{HeaderMap, Method};
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::CachedResponse;

/// A request ready to be put on the wire.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
}

/// Sends requests. Any failure to obtain a response is a `Network` error;
/// non-2xx statuses are responses, not errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: OutgoingRequest) -> Result<CachedResponse>;
}

// == Reqwest Transport ==
/// HTTP client for fetching upstream resources
///
/// The client follows redirects (reqwest's default limit of 10 hops).
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a new transport with a default client
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Create a transport around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<CachedResponse> {
        debug!(method = %request.method, url = %request.url, "Fetching upstream");

        let response = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %request.url, error = %e, "Upstream fetch failed");
                e
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        debug!(
            url = %request.url,
            status = %status,
            size = body.len(),
            "Fetched upstream response"
        );

        Ok(CachedResponse {
            status,
            headers,
            body,
        })
    }
}
