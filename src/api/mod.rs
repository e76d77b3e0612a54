//! API Module
//!
//! HTTP handlers and routing for the gateway.
//!
//! # Endpoints
//! - one route per endpoint of the service config
//! - `GET /__health` - Health check endpoint
//! - `GET /__cache/stats` - Memory cache statistics

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
