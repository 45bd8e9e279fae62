//! Image Cache Proxy - An HTTPS caching reverse proxy
//!
//! Serves resources from an on-disk cache, fills misses from a single
//! upstream origin and refreshes aging entries in the background.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod origin;
pub mod proxy;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use proxy::CacheProxy;
