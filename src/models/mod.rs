//! Response models for the gateway's own endpoints
//!
//! Backend data is passed through as JSON maps; only the health and cache
//! statistics endpoints have fixed shapes.

pub mod responses;

pub use responses::{HealthResponse, StatsResponse};
