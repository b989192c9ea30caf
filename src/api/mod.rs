//! API Module
//!
//! HTTP handlers and routing for the fetch cache.
//!
//! # Endpoints
//! - `POST /fetch` - Fetch a URL through the cache
//! - `GET /cache/:name?url=` - Exact-key lookup in a cache
//! - `POST /cache/:name/reconcile` - Repair a cache's timestamp index
//! - `POST /caches/rename` - Rename a cache
//! - `GET /stats` - Fetch and eviction counters
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
