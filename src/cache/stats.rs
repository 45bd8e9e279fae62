//! Cache Statistics Module
//!
//! Tracks proxy counters: hits, misses, origin failures and background refreshes.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Proxy Stats ==
/// Lock-free counters shared by request handlers and refresh workers.
#[derive(Debug, Default)]
pub struct ProxyStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stale_fills: AtomicU64,
    fetch_errors: AtomicU64,
    refreshes_scheduled: AtomicU64,
    refreshes_completed: AtomicU64,
    refreshes_failed: AtomicU64,
    refreshes_dropped: AtomicU64,
}

impl ProxyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_fill(&self) {
        self.stale_fills.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_error(&self) {
        self.fetch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_scheduled(&self) {
        self.refreshes_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_completed(&self) {
        self.refreshes_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_failed(&self) {
        self.refreshes_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh_dropped(&self) {
        self.refreshes_dropped.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the current counter values.
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_fills: self.stale_fills.load(Ordering::Relaxed),
            fetch_errors: self.fetch_errors.load(Ordering::Relaxed),
            refreshes_scheduled: self.refreshes_scheduled.load(Ordering::Relaxed),
            refreshes_completed: self.refreshes_completed.load(Ordering::Relaxed),
            refreshes_failed: self.refreshes_failed.load(Ordering::Relaxed),
            refreshes_dropped: self.refreshes_dropped.load(Ordering::Relaxed),
        }
    }
}

// == Cache Stats ==
/// Point-in-time copy of [`ProxyStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Requests served straight from disk
    pub hits: u64,
    /// Requests with no entry on disk
    pub misses: u64,
    /// Requests whose entry had expired and was refilled
    pub stale_fills: u64,
    /// Origin fetches that failed, foreground or background
    pub fetch_errors: u64,
    /// Background refreshes accepted into the queue
    pub refreshes_scheduled: u64,
    /// Background refreshes that rewrote their entry
    pub refreshes_completed: u64,
    /// Background refreshes that failed
    pub refreshes_failed: u64,
    /// Background refreshes dropped because the queue was full
    pub refreshes_dropped: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses + stale_fills), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.stale_fills;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = ProxyStats::new().snapshot();
        assert_eq!(stats, CacheStats::default());
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let stats = ProxyStats::new();
        for _ in 0..6 {
            stats.record_hit();
        }
        stats.record_miss();
        stats.record_stale_fill();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.hits, 6);
        assert!((snapshot.hit_rate() - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_refresh_counters() {
        let stats = ProxyStats::new();
        stats.record_refresh_scheduled();
        stats.record_refresh_scheduled();
        stats.record_refresh_completed();
        stats.record_refresh_failed();
        stats.record_refresh_dropped();
        stats.record_fetch_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.refreshes_scheduled, 2);
        assert_eq!(snapshot.refreshes_completed, 1);
        assert_eq!(snapshot.refreshes_failed, 1);
        assert_eq!(snapshot.refreshes_dropped, 1);
        assert_eq!(snapshot.fetch_errors, 1);
    }
}
