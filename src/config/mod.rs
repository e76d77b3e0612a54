//! Configuration Module
//!
//! Server settings from the environment and per-backend cache settings.

pub mod cache;
pub mod duration;
mod server;

pub use cache::{CacheBackend, CacheConfig, RedisConfig, RedisMode, NAMESPACE};
pub use duration::{parse_duration, DurationError};
pub use server::Config;
