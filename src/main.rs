//! Image Cache Proxy - An HTTPS caching reverse proxy
//!
//! Serves resources from an on-disk cache, fills misses from a single
//! upstream origin and refreshes aging entries in the background.

use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use rustls::crypto::CryptoProvider;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_cache_proxy::{api::create_router, AppState, Config};

/// Main entry point for the caching proxy.
///
/// # Startup Sequence
/// 1. Install the TLS crypto provider
/// 2. Initialize tracing (stdout, plus the optional access log file)
/// 3. Load and validate configuration from environment variables
/// 4. Open the cache store, origin client and refresh workers
/// 5. Load the TLS certificate and key
/// 6. Serve HTTPS on the configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Both the listener and the origin client run on ring
    let _ = CryptoProvider::install_default(rustls::crypto::ring::default_provider());

    let access_log = match Config::access_log_from_env() {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_cache_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(access_log)
        .init();

    info!("Starting Image Cache Proxy");

    let config = Config::from_env();
    config.validate()?;
    info!(
        "Configuration loaded: cache_dir={}, origin={}, expiry={}s, refresh={}s, timeout={}s, port={}",
        config.cache_dir.display(),
        config.origin_url,
        config.expiry_secs,
        config.refresh_secs,
        config.request_timeout_secs,
        config.server_port
    );

    let (state, refresh_workers) = AppState::start(&config)?;
    info!("Cache store opened at {}", config.cache_dir.display());

    let tls = RustlsConfig::from_pem_file(&config.tls_cert_path, &config.tls_key_path)
        .await
        .with_context(|| {
            format!(
                "failed to load TLS material from {} / {}",
                config.tls_cert_path.display(),
                config.tls_key_path.display()
            )
        })?;

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone(), refresh_workers));

    info!("Server listening on https://{}", addr);
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server failed")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the refresh workers and lets in-flight
/// requests finish.
async fn shutdown_signal(handle: Handle, refresh_workers: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for worker in &refresh_workers {
        worker.abort();
    }
    warn!("Refresh workers aborted");

    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
