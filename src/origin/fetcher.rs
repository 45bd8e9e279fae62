//! HTTP(S) origin fetcher backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::cache::ResourceKey;
use crate::config::Config;
use crate::error::{FetchError, ProxyError, Result};
use crate::origin::Origin;

// == Http Origin ==
/// Fetches resources from `base_url` joined with the key's segments.
#[derive(Debug, Clone)]
pub struct HttpOrigin {
    client: Client,
    base_url: Url,
}

impl HttpOrigin {
    // == Constructor ==
    /// Builds the client once; the timeout applies to every request.
    ///
    /// # Arguments
    /// * `base_url` - Origin base, e.g. `https://images.example.com/static`
    /// * `timeout` - Fixed per-request deadline
    /// * `insecure_skip_verify` - Accept any origin certificate
    pub fn new(base_url: &str, timeout: Duration, insecure_skip_verify: bool) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ProxyError::Config(format!("invalid origin url: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ProxyError::Config(format!(
                "origin url cannot be a base: {}",
                base_url
            )));
        }

        if insecure_skip_verify {
            warn!(
                "Origin certificate verification is DISABLED for {}; \
                 connections are open to man-in-the-middle attacks",
                base_url
            );
        }

        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure_skip_verify)
            .build()
            .map_err(|e| ProxyError::Config(format!("failed to build origin client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Creates the fetcher from proxy configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.origin_url,
            config.request_timeout(),
            config.origin_insecure_skip_verify,
        )
    }

    // == URL Building ==
    /// Upstream URL of a key; segments are percent-encoded again.
    pub fn url_for(&self, key: &ResourceKey) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(key.segments());
        }
        url
    }
}

#[async_trait]
impl Origin for HttpOrigin {
    async fn fetch(&self, key: &ResourceKey) -> std::result::Result<Bytes, FetchError> {
        let url = self.url_for(key);
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamStatus(status.as_u16()));
        }

        Ok(response.bytes().await?)
    }
}
