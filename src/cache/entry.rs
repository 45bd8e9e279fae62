//! Cache Entry Module
//!
//! Metadata of a persisted resource and the age-based freshness policy.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

// == Cached Entry ==
/// A resource present in the store.
///
/// No expiry is stored; the file modification time is the only timestamp.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    /// Absolute location of the content file
    pub path: PathBuf,
    /// Last successful write
    pub modified: SystemTime,
    /// Content length in bytes
    pub len: u64,
}

impl CachedEntry {
    // == Age ==
    /// Time elapsed since the last write.
    ///
    /// A modification time in the future counts as age zero.
    pub fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.modified)
            .unwrap_or(Duration::ZERO)
    }
}

// == Freshness ==
/// Outcome of classifying an entry's age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Nothing stored under the key
    Miss,
    /// Servable, no refresh needed
    Fresh,
    /// Servable, but a background refresh should follow
    RefreshDue,
    /// Too old to serve; must be refilled from the origin
    Stale,
}

// == Freshness Policy ==
/// Expiry and refresh thresholds, configured independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    expiry: Duration,
    refresh: Duration,
}

impl FreshnessPolicy {
    /// Creates a policy from the two thresholds.
    ///
    /// # Arguments
    /// * `expiry` - Age from which an entry is no longer served
    /// * `refresh` - Age from which a served entry is revalidated in the background
    pub fn new(expiry: Duration, refresh: Duration) -> Self {
        Self { expiry, refresh }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    pub fn refresh(&self) -> Duration {
        self.refresh
    }

    // == Classify ==
    /// Classifies an entry by age.
    ///
    /// Boundary condition: an age equal to a threshold counts as having
    /// crossed it, so `age == expiry` is stale and `age == refresh` is due.
    pub fn classify(&self, age: Option<Duration>) -> Freshness {
        match age {
            None => Freshness::Miss,
            Some(age) if age >= self.expiry => Freshness::Stale,
            Some(age) if age >= self.refresh => Freshness::RefreshDue,
            Some(_) => Freshness::Fresh,
        }
    }

    /// Whether a refresh is due for an entry of the given age.
    pub fn refresh_due(&self, age: Duration) -> bool {
        age >= self.refresh
    }
}
