//! Response models for the operational endpoints
//!
//! This module defines the DTOs serialized by the health and stats routes.

pub mod responses;

// Re-export commonly used types
pub use responses::{HealthResponse, StatsResponse};
