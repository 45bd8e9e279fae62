//! Origin Module
//!
//! Retrieval of full resource content from the single upstream origin.

mod fetcher;

use async_trait::async_trait;
use bytes::Bytes;

use crate::cache::ResourceKey;
use crate::error::FetchError;

pub use fetcher::HttpOrigin;

/// Source of truth the cache is filled from.
///
/// Every call is a full, unconditional fetch.
#[async_trait]
pub trait Origin: Send + Sync {
    async fn fetch(&self, key: &ResourceKey) -> Result<Bytes, FetchError>;
}
