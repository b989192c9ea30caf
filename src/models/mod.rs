//! Request and response models
//!
//! Holds the request identity and buffered response that flow through the
//! caches, plus the DTOs serialized by the HTTP front end.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{normalize_url, CacheRequest, FetchRequestBody, LookupQuery, RenameRequest};
pub use responses::{CachedResponse, HealthResponse, RenameResponse};
