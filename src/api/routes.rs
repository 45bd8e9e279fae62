//! API Routes
//!
//! Configures the Axum router: operational endpoints under `/_proxy`, every
//! other path handled by the caching proxy.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, proxy_handler, stats_handler, AppState};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /_proxy/health` - Health check endpoint
/// - `GET /_proxy/stats` - Proxy statistics
/// - `GET /<any path>` - Cached resource
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/_proxy/health", get(health_handler))
        .route("/_proxy/stats", get(stats_handler))
        .fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
