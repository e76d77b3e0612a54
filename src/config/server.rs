//! Server Configuration
//!
//! Loads the gateway server settings from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::cache::DEFAULT_MEMORY_MAX_ENTRIES;
use crate::config::duration::parse_duration;

/// Gateway server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Path of the JSON file describing the gateway endpoints
    pub gateway_config: PathBuf,
    /// Maximum number of responses kept by the shared memory cache
    pub memory_max_entries: usize,
    /// Optional upper bound on how long the memory cache keeps a response
    pub memory_ttl: Option<Duration>,
    /// Interval between sweeps of expired memory cache entries
    pub cleanup_interval: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `GATEWAY_CONFIG` - endpoint definitions file (default: gateway.json)
    /// - `MEMORY_CACHE_MAX_ENTRIES` - memory cache capacity, at least 1 (default: 10000)
    /// - `MEMORY_CACHE_TTL` - duration string such as `10m` (default: unset)
    /// - `CLEANUP_INTERVAL` - sweep frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            gateway_config: env::var("GATEWAY_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.gateway_config),
            memory_max_entries: env::var("MEMORY_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| parse_max_entries(&v))
                .unwrap_or(defaults.memory_max_entries),
            memory_ttl: env::var("MEMORY_CACHE_TTL")
                .ok()
                .and_then(|v| match parse_duration(&v) {
                    Ok(ttl) => Some(ttl),
                    Err(e) => {
                        warn!("Ignoring MEMORY_CACHE_TTL: {}", e);
                        None
                    }
                }),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
        }
    }
}

/// A capacity of 0 would reject every insert, so it is raised to 1.
fn parse_max_entries(raw: &str) -> Option<usize> {
    match raw.parse::<usize>() {
        Ok(0) => {
            warn!("MEMORY_CACHE_MAX_ENTRIES=0 would disable the memory cache, using 1");
            Some(1)
        }
        Ok(n) => Some(n),
        Err(e) => {
            warn!("Ignoring MEMORY_CACHE_MAX_ENTRIES: {}", e);
            None
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8080,
            gateway_config: PathBuf::from("gateway.json"),
            memory_max_entries: DEFAULT_MEMORY_MAX_ENTRIES,
            memory_ttl: None,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.gateway_config, PathBuf::from("gateway.json"));
        assert_eq!(config.memory_max_entries, 10_000);
        assert!(config.memory_ttl.is_none());
        assert_eq!(config.cleanup_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_max_entries_is_at_least_one() {
        assert_eq!(parse_max_entries("0"), Some(1));
        assert_eq!(parse_max_entries("250"), Some(250));
        assert_eq!(parse_max_entries("-3"), None);
        assert_eq!(parse_max_entries("many"), None);
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("SERVER_PORT", "9090");
        env::set_var("MEMORY_CACHE_TTL", "90s");
        env::remove_var("GATEWAY_CONFIG");
        env::remove_var("MEMORY_CACHE_MAX_ENTRIES");
        env::remove_var("CLEANUP_INTERVAL");

        let config = Config::from_env();
        assert_eq!(config.server_port, 9090);
        assert_eq!(config.memory_ttl, Some(Duration::from_secs(90)));
        assert_eq!(config.gateway_config, PathBuf::from("gateway.json"));
        assert_eq!(config.memory_max_entries, 10_000);
        assert_eq!(config.cleanup_interval, Duration::from_secs(60));

        env::remove_var("SERVER_PORT");
        env::remove_var("MEMORY_CACHE_TTL");
    }
}
