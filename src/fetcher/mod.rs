//! Fetcher Module
//!
//! Fetches through a `Transport`, writes cacheable responses into the named
//! content cache in the background, and schedules eviction passes on the
//! cleanup queue.
//!
//! The content write and the metadata write are not transactional. A crash
//! between them leaves the timestamp index missing entries that the content
//! cache still holds; `Fetcher::reconcile_cache` repairs that.

pub mod headers;
pub mod transport;

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::Method;
use futures::future::try_join_all;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{CacheStats, Clock, ContentStore, FetchStats, MetadataStore, SystemClock};
use crate::config::{Config, FetchOptions, ResolvedOptions};
use crate::error::{FetchCacheError, Result};
use crate::models::{CacheRequest, CachedResponse};
use crate::tasks::{CleanupQueue, EvictionPass};

pub use headers::{build_outgoing, custom_headers};
pub use transport::{OutgoingRequest, ReqwestTransport, Transport};

// == Debug Hook ==
/// Logs `message` on the `fetch_cache::debug` target when `enabled`.
pub fn debug_log(enabled: bool, message: &str) {
    if enabled {
        info!(target: "fetch_cache::debug", "{}", message);
    }
}

/// Result of reconciling a cache with its timestamp index.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileReport {
    /// Index entries dropped because the content entry was gone
    pub removed: Vec<String>,
    /// Content entries that had no index entry and were stamped now
    pub stamped: Vec<String>,
}

// == Fetcher ==
/// Fetch-and-cache orchestrator.
pub struct Fetcher {
    defaults: Config,
    transport: Arc<dyn Transport>,
    content: Arc<dyn ContentStore>,
    metadata: Arc<dyn MetadataStore>,
    queue: CleanupQueue,
    clock: Arc<dyn Clock>,
    stats: Arc<FetchStats>,
}

impl Fetcher {
    /// Creates a fetcher using the system clock.
    pub fn new(
        defaults: Config,
        transport: Arc<dyn Transport>,
        content: Arc<dyn ContentStore>,
        metadata: Arc<dyn MetadataStore>,
        queue: CleanupQueue,
    ) -> Self {
        Self {
            defaults,
            transport,
            content,
            metadata,
            queue,
            clock: Arc::new(SystemClock),
            stats: Arc::new(FetchStats::new()),
        }
    }

    /// Replaces the clock used to stamp writes and evaluate ages.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn defaults(&self) -> &Config {
        &self.defaults
    }

    pub fn content(&self) -> &Arc<dyn ContentStore> {
        &self.content
    }

    pub fn queue(&self) -> &CleanupQueue {
        &self.queue
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Fetch And Cache ==
    /// Fetches `request` and returns the response.
    ///
    /// Successful GET responses are also written to the resolved cache by a
    /// detached task; its failures are logged and never reach the caller.
    pub async fn fetch_and_cache(
        &self,
        request: CacheRequest,
        options: &FetchOptions,
    ) -> Result<CachedResponse> {
        let (response, _background) = self.fetch_and_cache_with_handle(request, options).await?;
        Ok(response)
    }

    /// Same as [`Fetcher::fetch_and_cache`], also returning the handle of the
    /// background cache write when one was started.
    pub async fn fetch_and_cache_with_handle(
        &self,
        request: CacheRequest,
        options: &FetchOptions,
    ) -> Result<(CachedResponse, Option<JoinHandle<()>>)> {
        let resolved = self.defaults.resolve(options);
        let outgoing = build_outgoing(&request, resolved.headers.as_ref())?;

        let response = match self.transport.send(outgoing).await {
            Ok(response) => response,
            Err(e) => {
                self.stats.record_network_error();
                debug_log(resolved.debug, &format!("Fetch of {} failed: {}", request.url, e));
                return Err(match e {
                    FetchCacheError::Network(_) => e,
                    other => FetchCacheError::Network(other.to_string()),
                });
            }
        };
        self.stats.record_fetch();

        let cacheable = request.method == Method::GET
            && resolved.success_responses.matches(response.status.as_u16());
        if !cacheable {
            return Ok((response, None));
        }

        let handle = self.spawn_cache_write(request, response.clone(), resolved);
        Ok((response, Some(handle)))
    }

    fn spawn_cache_write(
        &self,
        request: CacheRequest,
        response: CachedResponse,
        resolved: ResolvedOptions,
    ) -> JoinHandle<()> {
        let content = self.content.clone();
        let metadata = self.metadata.clone();
        let queue = self.queue.clone();
        let clock = self.clock.clone();
        let stats = self.stats.clone();

        tokio::spawn(async move {
            let url = request.url.clone();
            let write = async {
                let cache = content
                    .open(&resolved.cache_name)
                    .await
                    .map_err(|e| FetchCacheError::CacheWrite(e.to_string()))?;
                cache
                    .put(request, response)
                    .await
                    .map_err(|e| FetchCacheError::CacheWrite(e.to_string()))?;
                Ok::<_, FetchCacheError>(cache)
            };

            let cache = match write.await {
                Ok(cache) => cache,
                Err(e) => {
                    stats.record_cache_write_failure();
                    warn!(cache = %resolved.cache_name, url = %url, error = %e, "Background cache write failed");
                    return;
                }
            };
            stats.record_cache_write();

            let Some(policy) = resolved.expiration else {
                return;
            };

            let pass = EvictionPass {
                url: url.clone(),
                cache,
                policy,
                metadata,
                clock,
                stats,
                debug: resolved.debug,
            };
            queue.enqueue(format!("expire {}", url), async move {
                pass.run().await.map(|_| ())
            });
        })
    }

    // == Rename Cache ==
    /// Replaces `destination` with a copy of `source`, then deletes `source`.
    ///
    /// Writes to `source` made while the copy is running may be lost.
    pub async fn rename_cache(&self, source: &str, destination: &str) -> Result<()> {
        debug_log(
            self.defaults.debug,
            &format!("Renaming cache: [{}] to [{}]", source, destination),
        );

        self.content.delete(destination).await?;
        let source_cache = self.content.open(source).await?;
        let dest_cache = self.content.open(destination).await?;

        let requests = source_cache.keys().await?;
        let copies = requests.into_iter().map(|request| {
            let source_cache = source_cache.clone();
            let dest_cache = dest_cache.clone();
            async move {
                if let Some(response) = source_cache.lookup(&request).await? {
                    dest_cache.put(request, response).await?;
                }
                Ok::<_, FetchCacheError>(())
            }
        });
        try_join_all(copies).await?;

        self.content.delete(source).await?;
        info!(source, destination, "Cache renamed");
        Ok(())
    }

    // == Reconcile Cache ==
    /// Brings the timestamp index of `cache_name` back in line with its
    /// content. Runs on the cleanup queue so it never interleaves with an
    /// eviction pass.
    pub async fn reconcile_cache(&self, cache_name: &str) -> Result<ReconcileReport> {
        let cache_name = cache_name.to_string();
        let content = self.content.clone();
        let metadata = self.metadata.clone();
        let clock = self.clock.clone();

        self.queue
            .run(format!("reconcile {}", cache_name), async move {
                if !content.has(&cache_name).await? {
                    return Err(FetchCacheError::NotFound(format!("cache '{}'", cache_name)));
                }
                let cache = content.open(&cache_name).await?;
                let index = metadata.open(&cache_name).await?;

                let stored: HashSet<String> =
                    cache.keys().await?.into_iter().map(|r| r.url).collect();
                let snapshot = index.snapshot().await?;

                let removed: Vec<String> = snapshot
                    .urls()
                    .filter(|url| !stored.contains(*url))
                    .map(str::to_string)
                    .collect();
                index.delete_keys(&removed).await?;

                let mut stamped: Vec<String> = stored
                    .into_iter()
                    .filter(|url| !snapshot.contains(url))
                    .collect();
                stamped.sort();
                let now = clock.now_ms();
                for url in &stamped {
                    index.set_timestamp(url, now).await?;
                }

                info!(
                    cache = %cache_name,
                    removed = removed.len(),
                    stamped = stamped.len(),
                    "Cache reconciled"
                );
                Ok(ReconcileReport { removed, stamped })
            })
            .await
    }
}
