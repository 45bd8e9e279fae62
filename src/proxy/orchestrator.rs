//! Cache Orchestrator
//!
//! Binds lookup, origin fetch and store writes into one decision per request,
//! and schedules background refreshes for entries served past their refresh
//! threshold.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::cache::{
    CacheStats, CacheStore, CachedEntry, Freshness, FreshnessPolicy, ProxyStats, ResourceKey,
};
use crate::error::Result;
use crate::origin::Origin;
use crate::proxy::SingleFlight;
use crate::tasks::RefreshJob;

/// Where a response body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedFrom {
    Cache,
    Origin,
}

/// Body handed back to the request handler.
#[derive(Debug, Clone)]
pub struct Served {
    pub body: Bytes,
    pub source: ServedFrom,
    /// Modification time of the stored copy
    pub modified: SystemTime,
}

// == Cache Proxy ==
/// Policy layer over the store and the origin.
pub struct CacheProxy {
    store: Arc<CacheStore>,
    origin: Arc<dyn Origin>,
    policy: FreshnessPolicy,
    stats: ProxyStats,
    fills: SingleFlight<(Bytes, SystemTime)>,
    refresh_tx: mpsc::Sender<RefreshJob>,
    /// Keys with a refresh queued or running
    pending_refreshes: Mutex<HashSet<ResourceKey>>,
}

impl CacheProxy {
    // == Constructor ==
    /// Creates the orchestrator.
    ///
    /// # Arguments
    /// * `store` - Shared on-disk store
    /// * `origin` - Upstream fetcher
    /// * `policy` - Expiry and refresh thresholds
    /// * `refresh_tx` - Sending half of the background refresh queue
    pub fn new(
        store: Arc<CacheStore>,
        origin: Arc<dyn Origin>,
        policy: FreshnessPolicy,
        refresh_tx: mpsc::Sender<RefreshJob>,
    ) -> Self {
        Self {
            store,
            origin,
            policy,
            stats: ProxyStats::new(),
            fills: SingleFlight::new(),
            refresh_tx,
            pending_refreshes: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Get ==
    /// Resolves a request for `key`.
    ///
    /// Misses and expired entries are filled from the origin before
    /// answering. Servable entries are answered from disk; if they are past
    /// the refresh threshold a background refresh is queued as well.
    pub async fn get(&self, key: &ResourceKey) -> Result<Served> {
        let entry = self.store.lookup(key).await;
        let age = entry.as_ref().map(CachedEntry::age);

        match (self.policy.classify(age), entry, age) {
            (Freshness::Fresh, Some(entry), _) => self.serve_cached(key, &entry).await,
            (Freshness::RefreshDue, Some(entry), Some(age)) => {
                let served = self.serve_cached(key, &entry).await?;
                if served.source == ServedFrom::Cache {
                    self.schedule_refresh(key.clone(), age).await;
                }
                Ok(served)
            }
            (Freshness::Stale, _, _) => {
                self.stats.record_stale_fill();
                debug!("Entry for {} expired, refilling", key);
                self.fill(key).await
            }
            _ => {
                self.stats.record_miss();
                debug!("No entry for {}, fetching", key);
                self.fill(key).await
            }
        }
    }

    async fn serve_cached(&self, key: &ResourceKey, entry: &CachedEntry) -> Result<Served> {
        match self.store.read(entry).await {
            Ok(body) => {
                self.stats.record_hit();
                info!("Serving from cache: {}", key);
                Ok(Served {
                    body,
                    source: ServedFrom::Cache,
                    modified: entry.modified,
                })
            }
            Err(e) => {
                warn!("Cached entry for {} unreadable ({}), refilling", key, e);
                self.stats.record_miss();
                self.fill(key).await
            }
        }
    }

    // == Fill ==
    /// Fetches `key` from the origin and commits it to the store.
    ///
    /// On failure the store is left untouched, including any stale entry.
    async fn fill(&self, key: &ResourceKey) -> Result<Served> {
        let (body, modified) = self.fills.run(key, || self.fetch_and_store(key)).await?;
        Ok(Served {
            body,
            source: ServedFrom::Origin,
            modified,
        })
    }

    async fn fetch_and_store(&self, key: &ResourceKey) -> Result<(Bytes, SystemTime)> {
        let body = match self.origin.fetch(key).await {
            Ok(body) => body,
            Err(e) => {
                self.stats.record_fetch_error();
                return Err(e.into());
            }
        };

        let entry = self.store.write(key, body.clone()).await?;
        info!("Stored newly fetched file: {} ({} bytes)", key, body.len());
        Ok((body, entry.modified))
    }

    // == Background Refresh ==
    /// Queues a refresh of `key`, observed at `age`, unless one is already
    /// queued or running. Never blocks: a full queue drops the job.
    pub async fn schedule_refresh(&self, key: ResourceKey, age: Duration) {
        if !self.pending_refreshes.lock().await.insert(key.clone()) {
            debug!("Refresh already pending for {}", key);
            return;
        }

        match self.refresh_tx.try_send(RefreshJob { key, age }) {
            Ok(()) => {
                self.stats.record_refresh_scheduled();
            }
            Err(err) => {
                let job = match err {
                    mpsc::error::TrySendError::Full(job) | mpsc::error::TrySendError::Closed(job) => job,
                };
                warn!("Refresh queue unavailable, dropping refresh of {}", job.key);
                self.stats.record_refresh_dropped();
                self.pending_refreshes.lock().await.remove(&job.key);
            }
        }
    }

    /// Runs one refresh job. Failures are logged and counted only; the
    /// request that triggered the job has already been answered.
    pub async fn refresh(&self, job: RefreshJob) {
        if self.policy.refresh_due(job.age) {
            info!("Refreshing cache asynchronously: {}", job.key);
            match self.fill(&job.key).await {
                Ok(_) => {
                    self.stats.record_refresh_completed();
                }
                Err(e) => {
                    self.stats.record_refresh_failed();
                    warn!("Failed to refresh cache for: {}, error: {}", job.key, e);
                }
            }
        }

        self.pending_refreshes.lock().await.remove(&job.key);
    }
}
