//! Gateway HTTP Cache - pluggable response caching for API gateway backends
//!
//! Backends opt in through their `extra_config`; cached responses live in a
//! shared in-memory store or in Redis (single node or cluster).

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod factory;
pub mod gateway;
pub mod models;
pub mod tasks;
pub mod transport;

pub use api::AppState;
pub use config::{CacheConfig, Config};
pub use factory::{backend_factory, new_http_client};
pub use tasks::spawn_cleanup_task;
