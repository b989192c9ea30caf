//! API Handlers
//!
//! HTTP request handlers for each endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::{CacheStats, FileMetadataStore, MemoryContentStore};
use crate::config::Config;
use crate::error::{FetchCacheError, Result};
use crate::fetcher::{Fetcher, ReconcileReport, ReqwestTransport};
use crate::models::{
    CacheRequest, CachedResponse, FetchRequestBody, HealthResponse, LookupQuery, RenameRequest,
    RenameResponse,
};
use crate::tasks::CleanupQueue;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<Fetcher>,
}

impl AppState {
    /// Creates a new AppState around an existing fetcher.
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Uses the reqwest transport, an in-memory content store and a
    /// file-backed metadata store rooted at `config.metadata_dir`.
    pub fn from_config(config: &Config, queue: CleanupQueue) -> Self {
        let fetcher = Fetcher::new(
            config.clone(),
            Arc::new(ReqwestTransport::new()),
            Arc::new(MemoryContentStore::new()),
            Arc::new(FileMetadataStore::new(config.metadata_dir.clone())),
            queue,
        );
        Self::new(fetcher)
    }
}

/// Handler for POST /fetch
///
/// Fetches the described request, caching it per the merged options, and
/// relays the upstream response.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Json(body): Json<FetchRequestBody>,
) -> Result<CachedResponse> {
    let options = body.options.clone();
    let request = body.into_cache_request()?;
    state.fetcher.fetch_and_cache(request, &options).await
}

/// Handler for GET /cache/:name?url=
///
/// Exact-key lookup in a content cache.
pub async fn lookup_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<LookupQuery>,
) -> Result<CachedResponse> {
    let content = state.fetcher.content();
    if !content.has(&name).await? {
        return Err(FetchCacheError::NotFound(format!("cache '{}'", name)));
    }

    let request = CacheRequest::get(&query.url)?;
    content
        .open(&name)
        .await?
        .lookup(&request)
        .await?
        .ok_or_else(|| FetchCacheError::NotFound(request.url))
}

/// Handler for POST /caches/rename
pub async fn rename_handler(
    State(state): State<AppState>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<RenameResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(FetchCacheError::InvalidRequest(error_msg));
    }

    state
        .fetcher
        .rename_cache(&req.source, &req.destination)
        .await?;

    Ok(Json(RenameResponse::new(req.source, req.destination)))
}

/// Handler for POST /cache/:name/reconcile
pub async fn reconcile_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ReconcileReport>> {
    let report = state.fetcher.reconcile_cache(&name).await?;
    Ok(Json(report))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.fetcher.stats())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
