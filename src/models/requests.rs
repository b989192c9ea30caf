//! Request types
//!
//! `CacheRequest` is the request identity used as the content-store key.
//! The remaining types are the bodies accepted by the HTTP front end.

use std::collections::BTreeMap;
use std::str::FromStr;

use axum::http::{header::HeaderName, HeaderMap, HeaderValue, Method};
use serde::Deserialize;
use url::Url;

use crate::config::FetchOptions;
use crate::error::{FetchCacheError, Result};

// == Cache Request ==
/// A request to fetch, identified in the caches by its normalized URL.
#[derive(Debug, Clone)]
pub struct CacheRequest {
    /// HTTP method
    pub method: Method,
    /// Normalized absolute URL (fragment stripped)
    pub url: String,
    /// Headers sent with the request
    pub headers: HeaderMap,
}

impl CacheRequest {
    // == Constructor ==
    /// Creates a request after normalizing `url`.
    pub fn new(method: Method, url: &str) -> Result<Self> {
        Ok(Self {
            method,
            url: normalize_url(url)?,
            headers: HeaderMap::new(),
        })
    }

    /// Shorthand for a GET request.
    pub fn get(url: &str) -> Result<Self> {
        Self::new(Method::GET, url)
    }

    /// Appends a header, validating both name and value.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let (name, value) = parse_header(name, value)?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// The content-store key for this request.
    pub fn key(&self) -> &str {
        &self.url
    }
}

// == URL Normalization ==
/// Parses `raw` as an absolute URL and drops any fragment.
pub fn normalize_url(raw: &str) -> Result<String> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| FetchCacheError::InvalidRequest(format!("Invalid URL '{}': {}", raw, e)))?;
    url.set_fragment(None);
    Ok(url.into())
}

pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_str(name)
        .map_err(|_| FetchCacheError::InvalidRequest(format!("Invalid header name '{}'", name)))?;
    let header_value = HeaderValue::from_str(value).map_err(|_| {
        FetchCacheError::InvalidRequest(format!("Invalid value for header '{}'", name))
    })?;
    Ok((header_name, header_value))
}

/// Request body for POST /fetch
#[derive(Debug, Clone, Deserialize)]
pub struct FetchRequestBody {
    /// Absolute URL to fetch
    pub url: String,
    /// HTTP method, GET when omitted
    #[serde(default)]
    pub method: Option<String>,
    /// Headers forwarded with the request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Per-call overrides of the process defaults
    #[serde(default)]
    pub options: FetchOptions,
}

impl FetchRequestBody {
    /// Converts the body into a validated `CacheRequest`.
    pub fn into_cache_request(self) -> Result<CacheRequest> {
        let method = match self.method.as_deref() {
            None => Method::GET,
            Some(raw) => Method::from_str(&raw.to_ascii_uppercase()).map_err(|_| {
                FetchCacheError::InvalidRequest(format!("Invalid method '{}'", raw))
            })?,
        };

        let mut request = CacheRequest::new(method, &self.url)?;
        for (name, value) in &self.headers {
            request = request.with_header(name, value)?;
        }
        Ok(request)
    }
}

/// Request body for POST /cache/rename
#[derive(Debug, Clone, Deserialize)]
pub struct RenameRequest {
    pub source: String,
    pub destination: String,
}

impl RenameRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.source.is_empty() || self.destination.is_empty() {
            return Some("Cache names cannot be empty".to_string());
        }
        if self.source == self.destination {
            return Some("Source and destination must differ".to_string());
        }
        None
    }
}

/// Query string for GET /cache/:name
#[derive(Debug, Clone, Deserialize)]
pub struct LookupQuery {
    pub url: String,
}
