//! Fetch Cache - fetch-and-cache with LRU and TTL expiration
//!
//! Fetches upstream resources, keeps successful GET responses in named
//! content caches, and bounds each cache by entry count and age using a
//! durable per-URL timestamp index.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use config::{CachePolicy, Config, FetchOptions};
pub use error::{FetchCacheError, Result};
pub use fetcher::{debug_log, Fetcher, ReconcileReport};
pub use tasks::spawn_cleanup_queue;
