//! Background Tasks Module
//!
//! Contains background tasks that run alongside request handling.
//!
//! # Tasks
//! - Refresh: revalidates entries served past their refresh threshold

mod refresh;

pub use refresh::{refresh_channel, spawn_refresh_workers, RefreshJob};
