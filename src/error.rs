//! Error types for the caching proxy
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Body returned for every failure that must not leak upstream details.
pub const GENERIC_FAILURE_MESSAGE: &str = "Unable to fetch the requested file";

// == Fetch Error Enum ==
/// Failure while retrieving a resource from the origin.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// DNS, connect, TLS handshake, timeout or body read failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Origin answered with a non-success status
    #[error("origin returned status {0}")]
    UpstreamStatus(u16),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

// == Proxy Error Enum ==
/// Unified error type for the caching proxy.
///
/// Cloneable so that a single-flight fill can hand the same outcome to every
/// waiting request.
#[derive(Error, Debug, Clone)]
pub enum ProxyError {
    /// Request path cannot be used as a resource key
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Cache directory or file could not be created, written or read
    #[error("Storage error: {0}")]
    Storage(String),

    /// Origin fetch failed
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Configuration is unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        ProxyError::Storage(format!("{}: {}", context, err))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ProxyError::InvalidPath(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ProxyError::Storage(_)
            | ProxyError::Fetch(_)
            | ProxyError::Config(_)
            | ProxyError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                GENERIC_FAILURE_MESSAGE.to_string(),
            ),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;
