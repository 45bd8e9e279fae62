//! API Module
//!
//! HTTP handlers and routing for the caching proxy.
//!
//! # Endpoints
//! - `GET /_proxy/health` - Health check endpoint
//! - `GET /_proxy/stats` - Proxy statistics
//! - `GET /<any path>` - Cached resource, fetched from the origin when needed

pub mod file_response;
pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
