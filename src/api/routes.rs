//! API Routes
//!
//! Configures the Axum router with all endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    fetch_handler, health_handler, lookup_handler, reconcile_handler, rename_handler,
    stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /fetch` - Fetch through the cache
/// - `GET /cache/:name?url=` - Look up a cached response
/// - `POST /cache/:name/reconcile` - Repair a cache's timestamp index
/// - `POST /caches/rename` - Rename a cache
/// - `GET /stats` - Fetch and eviction counters
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router with all endpoints
    Router::new()
        .route("/fetch", post(fetch_handler))
        .route("/cache/:name", get(lookup_handler))
        .route("/cache/:name/reconcile", post(reconcile_handler))
        .route("/caches/rename", post(rename_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
