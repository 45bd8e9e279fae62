//! Proxy Module
//!
//! The cache orchestrator and its fill coalescing.

mod orchestrator;
mod single_flight;

pub use orchestrator::{CacheProxy, Served, ServedFrom};
pub use single_flight::SingleFlight;
