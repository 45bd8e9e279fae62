//! API Handlers
//!
//! The proxy entry point plus the operational endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{CacheStore, ResourceKey};
use crate::config::Config;
use crate::error::Result;
use crate::models::{HealthResponse, StatsResponse};
use crate::origin::HttpOrigin;
use crate::proxy::CacheProxy;
use crate::tasks::{refresh_channel, spawn_refresh_workers};

use super::file_response::file_response;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Cache orchestrator
    pub proxy: Arc<CacheProxy>,
}

impl AppState {
    /// Creates a new AppState around an orchestrator.
    pub fn new(proxy: Arc<CacheProxy>) -> Self {
        Self { proxy }
    }

    /// Builds the store, origin client, orchestrator and refresh workers
    /// from configuration.
    ///
    /// # Returns
    /// The state plus the refresh worker handles, to be aborted on shutdown.
    pub fn start(config: &Config) -> Result<(Self, Vec<JoinHandle<()>>)> {
        let store = Arc::new(CacheStore::open(&config.cache_dir)?);
        let origin = Arc::new(HttpOrigin::from_config(config)?);
        let (refresh_tx, refresh_rx) = refresh_channel(config.refresh_queue_capacity);

        let proxy = Arc::new(CacheProxy::new(
            store,
            origin,
            config.freshness_policy(),
            refresh_tx,
        ));
        let workers = spawn_refresh_workers(proxy.clone(), refresh_rx, config.refresh_workers);

        Ok((Self::new(proxy), workers))
    }
}

/// Fallback handler: every path not claimed by another route is a resource.
///
/// Unsafe paths are rejected before storage or origin is touched; origin
/// and storage failures reach the client only as a generic 500. Clients may
/// revalidate with `If-Modified-Since` and ask for a single byte `Range`.
pub async fn proxy_handler(
    State(state): State<AppState>,
    remote: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response> {
    if method != Method::GET && method != Method::HEAD {
        return Ok(StatusCode::METHOD_NOT_ALLOWED.into_response());
    }

    let client = remote
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    info!("{} incoming request: {}", client, uri.path());

    let key = ResourceKey::from_request_path(uri.path()).inspect_err(|e| {
        warn!("{} rejected request: {}", client, e);
    })?;

    let served = state.proxy.get(&key).await.inspect_err(|e| {
        warn!("{} Failed to fetch file: {}, error: {}", client, key, e);
    })?;

    let content_type = mime_guess::from_path(key.as_str())
        .first_or_octet_stream()
        .to_string();

    Ok(file_response(
        served,
        &headers,
        content_type,
        method == Method::HEAD,
    ))
}

/// Handler for GET /_proxy/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.proxy.stats()))
}

/// Handler for GET /_proxy/health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
