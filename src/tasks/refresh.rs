//! Background Refresh Workers
//!
//! A bounded queue of refresh jobs drained by a fixed pool of workers, so
//! the number of concurrent revalidations stays bounded however many
//! stale hits arrive.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ResourceKey;
use crate::proxy::CacheProxy;

/// A revalidation request for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshJob {
    /// Key to refetch
    pub key: ResourceKey,
    /// Entry age observed when the job was dispatched
    pub age: Duration,
}

/// Creates the bounded refresh queue.
pub fn refresh_channel(capacity: usize) -> (mpsc::Sender<RefreshJob>, mpsc::Receiver<RefreshJob>) {
    mpsc::channel(capacity)
}

/// Spawns `workers` tasks that process refresh jobs until the queue closes.
///
/// # Returns
/// One JoinHandle per worker, which can be used to abort the pool during
/// graceful shutdown.
///
/// # Example
/// ```ignore
/// let (tx, rx) = refresh_channel(256);
/// let proxy = Arc::new(CacheProxy::new(store, origin, policy, tx));
/// let workers = spawn_refresh_workers(proxy.clone(), rx, 4);
/// // Later, during shutdown:
/// workers.iter().for_each(|w| w.abort());
/// ```
pub fn spawn_refresh_workers(
    proxy: Arc<CacheProxy>,
    jobs: mpsc::Receiver<RefreshJob>,
    workers: usize,
) -> Vec<JoinHandle<()>> {
    let jobs = Arc::new(Mutex::new(jobs));
    info!("Starting {} background refresh workers", workers);

    (0..workers)
        .map(|id| {
            let proxy = proxy.clone();
            let jobs = jobs.clone();
            tokio::spawn(async move {
                loop {
                    let next = { jobs.lock().await.recv().await };
                    match next {
                        Some(job) => proxy.refresh(job).await,
                        None => break,
                    }
                }
                debug!("Refresh worker {} stopped", id);
            })
        })
        .collect()
}
