//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::cache::FreshnessPolicy;
use crate::error::{ProxyError, Result};

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults
/// and stay fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory of the on-disk cache
    pub cache_dir: PathBuf,
    /// Base URL of the single upstream origin
    pub origin_url: String,
    /// Age in seconds at which an entry stops being servable
    pub expiry_secs: u64,
    /// Age in seconds at which a served entry gets refreshed in the background
    pub refresh_secs: u64,
    /// Origin request timeout in seconds
    pub request_timeout_secs: u64,
    /// HTTPS listen port
    pub server_port: u16,
    /// PEM certificate chain for the listener
    pub tls_cert_path: PathBuf,
    /// PEM private key for the listener
    pub tls_key_path: PathBuf,
    /// Disable origin certificate validation (insecure, opt-in only)
    pub origin_insecure_skip_verify: bool,
    /// Number of background refresh workers
    pub refresh_workers: usize,
    /// Capacity of the background refresh queue
    pub refresh_queue_capacity: usize,
    /// Optional file receiving a plain-text copy of the log
    pub access_log: Option<PathBuf>,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    parse_or(name, env::var(name).ok(), default)
}

/// Parses a set variable, keeping `default` (with a warning) when the value
/// does not parse.
fn parse_or<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!("Ignoring unparsable {}={:?}, using the default", name, raw);
            default
        }
    }
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DIR` - Cache root directory (default: ./cache)
    /// - `ORIGIN_URL` - Upstream base URL (default: http://real.example.com)
    /// - `CACHE_EXPIRY_SECS` - Expiry threshold (default: 259200, 72h)
    /// - `CACHE_REFRESH_SECS` - Refresh threshold (default: 259200, 72h)
    /// - `REQUEST_TIMEOUT_SECS` - Origin request timeout (default: 50)
    /// - `SERVER_PORT` - HTTPS port (default: 443)
    /// - `TLS_CERT_PATH` / `TLS_KEY_PATH` - PEM files (default: cert.pem / key.key)
    /// - `ORIGIN_INSECURE_SKIP_VERIFY` - Skip origin cert checks (default: false)
    /// - `REFRESH_WORKERS` - Refresh pool size (default: 4)
    /// - `REFRESH_QUEUE_CAPACITY` - Refresh queue bound (default: 256)
    /// - `ACCESS_LOG` - Optional log file path
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            origin_url: env::var("ORIGIN_URL").unwrap_or(defaults.origin_url),
            expiry_secs: env_or("CACHE_EXPIRY_SECS", defaults.expiry_secs),
            refresh_secs: env_or("CACHE_REFRESH_SECS", defaults.refresh_secs),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            tls_cert_path: env::var("TLS_CERT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.tls_cert_path),
            tls_key_path: env::var("TLS_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.tls_key_path),
            origin_insecure_skip_verify: env_or(
                "ORIGIN_INSECURE_SKIP_VERIFY",
                defaults.origin_insecure_skip_verify,
            ),
            refresh_workers: env_or("REFRESH_WORKERS", defaults.refresh_workers),
            refresh_queue_capacity: env_or(
                "REFRESH_QUEUE_CAPACITY",
                defaults.refresh_queue_capacity,
            ),
            access_log: Self::access_log_from_env(),
        }
    }

    /// Reads `ACCESS_LOG` alone, so logging can be set up before the rest
    /// of the configuration is parsed.
    pub fn access_log_from_env() -> Option<PathBuf> {
        env::var("ACCESS_LOG").ok().map(PathBuf::from)
    }

    /// Rejects combinations the proxy cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_secs > self.expiry_secs {
            return Err(ProxyError::Config(format!(
                "refresh threshold ({}s) must not exceed expiry threshold ({}s)",
                self.refresh_secs, self.expiry_secs
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ProxyError::Config(
                "request timeout must be at least one second".to_string(),
            ));
        }
        if self.refresh_workers == 0 || self.refresh_queue_capacity == 0 {
            return Err(ProxyError::Config(
                "refresh workers and queue capacity must be non-zero".to_string(),
            ));
        }
        reqwest::Url::parse(&self.origin_url)
            .map_err(|e| ProxyError::Config(format!("invalid origin url: {}", e)))?;
        Ok(())
    }

    pub fn freshness_policy(&self) -> FreshnessPolicy {
        FreshnessPolicy::new(
            Duration::from_secs(self.expiry_secs),
            Duration::from_secs(self.refresh_secs),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache"),
            origin_url: "http://real.example.com".to_string(),
            expiry_secs: 72 * 60 * 60,
            refresh_secs: 72 * 60 * 60,
            request_timeout_secs: 50,
            server_port: 443,
            tls_cert_path: PathBuf::from("cert.pem"),
            tls_key_path: PathBuf::from("key.key"),
            origin_insecure_skip_verify: false,
            refresh_workers: 4,
            refresh_queue_capacity: 256,
            access_log: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_dir, PathBuf::from("./cache"));
        assert_eq!(config.expiry_secs, 259_200);
        assert_eq!(config.refresh_secs, 259_200);
        assert_eq!(config.request_timeout_secs, 50);
        assert_eq!(config.server_port, 443);
        assert!(!config.origin_insecure_skip_verify);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_refresh_longer_than_expiry_rejected() {
        let config = Config {
            expiry_secs: 60,
            refresh_secs: 120,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_invalid_origin_rejected() {
        let config = Config {
            origin_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_freshness_policy_uses_both_thresholds() {
        let config = Config {
            expiry_secs: 100,
            refresh_secs: 40,
            ..Config::default()
        };
        let policy = config.freshness_policy();
        assert_eq!(policy.expiry(), Duration::from_secs(100));
        assert_eq!(policy.refresh(), Duration::from_secs(40));
    }

    #[test]
    fn test_unparsable_value_keeps_default() {
        assert_eq!(parse_or("CACHE_REFRESH_SECS", Some("3h".to_string()), 60u64), 60);
        assert!(!parse_or("ORIGIN_INSECURE_SKIP_VERIFY", Some("1".to_string()), false));
    }

    #[test]
    fn test_set_value_parsed() {
        assert_eq!(parse_or("CACHE_REFRESH_SECS", Some(" 120 ".to_string()), 60u64), 120);
        assert!(parse_or("ORIGIN_INSECURE_SKIP_VERIFY", Some("true".to_string()), false));
        assert_eq!(parse_or("SERVER_PORT", None, 443u16), 443);
    }
}
