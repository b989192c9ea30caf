//! Content Store Module
//!
//! Named caches mapping a request identity to a buffered response.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{CacheRequest, CachedResponse};

// == Content Store ==
/// Registry of named content caches.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Opens the cache called `name`, creating it if needed.
    async fn open(&self, name: &str) -> Result<Arc<dyn ContentCache>>;

    /// Deletes the cache called `name`. Returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Whether a cache called `name` exists.
    async fn has(&self, name: &str) -> Result<bool>;
}

/// One named cache, keyed by request URL.
#[async_trait]
pub trait ContentCache: Send + Sync {
    /// Stores `response` under `request`, replacing any previous entry.
    async fn put(&self, request: CacheRequest, response: CachedResponse) -> Result<()>;

    /// Exact-key lookup.
    async fn lookup(&self, request: &CacheRequest) -> Result<Option<CachedResponse>>;

    /// Removes the entry for `url`. Returns whether it existed.
    async fn delete(&self, url: &str) -> Result<bool>;

    /// Requests of every stored entry, in no particular order.
    async fn keys(&self) -> Result<Vec<CacheRequest>>;
}

// == Memory Content Store ==
/// Process-local content store.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    caches: RwLock<HashMap<String, Arc<MemoryCache>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn open(&self, name: &str) -> Result<Arc<dyn ContentCache>> {
        if let Some(cache) = self.caches.read().await.get(name) {
            return Ok(cache.clone());
        }

        let mut caches = self.caches.write().await;
        let cache = caches
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCache::default()))
            .clone();
        Ok(cache)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.caches.write().await.remove(name).is_some())
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.caches.read().await.contains_key(name))
    }
}

/// A single in-memory cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (CacheRequest, CachedResponse)>>,
}

#[async_trait]
impl ContentCache for MemoryCache {
    async fn put(&self, request: CacheRequest, response: CachedResponse) -> Result<()> {
        let key = request.key().to_string();
        self.entries.write().await.insert(key, (request, response));
        Ok(())
    }

    async fn lookup(&self, request: &CacheRequest) -> Result<Option<CachedResponse>> {
        let entries = self.entries.read().await;
        Ok(entries.get(request.key()).map(|(_, response)| response.clone()))
    }

    async fn delete(&self, url: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(url).is_some())
    }

    async fn keys(&self) -> Result<Vec<CacheRequest>> {
        let entries = self.entries.read().await;
        Ok(entries.values().map(|(request, _)| request.clone()).collect())
    }
}
