//! Cache Module
//!
//! On-disk resource cache: key normalization, freshness policy and the
//! lock-guarded store.

mod entry;
mod key;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{CachedEntry, Freshness, FreshnessPolicy};
pub use key::ResourceKey;
pub use stats::{CacheStats, ProxyStats};
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed canonical key length in bytes
pub const MAX_KEY_LENGTH: usize = 1024;

/// Maximum allowed length of a single path segment in bytes
pub const MAX_SEGMENT_LENGTH: usize = 255;

/// File name prefix of in-progress writes; never valid in a key
pub const STAGING_PREFIX: &str = ".inflight-";
