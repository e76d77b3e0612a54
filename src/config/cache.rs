//! HTTP cache settings of a backend
//!
//! The cache is configured per backend, inside the backend's `extra_config`
//! under [`NAMESPACE`]:
//!
//! ```json
//! {
//!   "github.com/devopsfaith/krakend-httpcache": {
//!     "type": "redis",
//!     "redis": { "mode": "redis", "address": "localhost:6379", "ttl": "10m" }
//!   }
//! }
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::duration::parse_duration;
use crate::error::ConfigError;
use crate::gateway::{BackendConfig, ExtraConfig};

// == Public Constants ==
/// Key of the cache settings inside a backend's extra config
pub const NAMESPACE: &str = "github.com/devopsfaith/krakend-httpcache";

pub const BACKEND_MEMORY: &str = "memory";
pub const BACKEND_REDIS: &str = "redis";

pub const REDIS_MODE_REDIS: &str = "redis";
pub const REDIS_MODE_CLUSTER: &str = "rediscluster";

pub const REDIS_DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_millis(100);
pub const REDIS_DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);
pub const REDIS_DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(200);
pub const REDIS_DEFAULT_MAX_RETRIES: u32 = 0;
pub const REDIS_DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const REDIS_DEFAULT_IDLE_CHECK_FREQUENCY: Duration = Duration::from_secs(60);
pub const REDIS_DEFAULT_POOL_SIZE: usize = 10;
pub const REDIS_DEFAULT_POOL_TIMEOUT: Duration = Duration::from_millis(10);
pub const REDIS_DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

// == Cache Backend ==
/// Storage used by the caching transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-wide in-memory cache shared by every memory backend
    #[default]
    Memory,
    /// Redis or Redis Cluster
    Redis,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackend::Memory => BACKEND_MEMORY,
            CacheBackend::Redis => BACKEND_REDIS,
        }
    }
}

impl FromStr for CacheBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            BACKEND_MEMORY => Ok(CacheBackend::Memory),
            BACKEND_REDIS => Ok(CacheBackend::Redis),
            _ => Err(ConfigError::invalid("type")),
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Redis Mode ==
/// Topology of the Redis deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedisMode {
    /// A single Redis node
    #[serde(rename = "redis")]
    Redis,
    /// A Redis Cluster reached through one seed node
    #[serde(rename = "rediscluster")]
    Cluster,
}

impl RedisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedisMode::Redis => REDIS_MODE_REDIS,
            RedisMode::Cluster => REDIS_MODE_CLUSTER,
        }
    }
}

impl FromStr for RedisMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            REDIS_MODE_REDIS => Ok(RedisMode::Redis),
            REDIS_MODE_CLUSTER => Ok(RedisMode::Cluster),
            _ => Err(ConfigError::invalid("mode")),
        }
    }
}

impl fmt::Display for RedisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Redis Config ==
/// Connection parameters of the Redis cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    pub mode: RedisMode,
    /// `host:port` of the node (or cluster seed node)
    pub address: String,
    pub dial_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Reconnection attempts after a connection-level failure; `-1` in the
    /// config disables retries
    pub max_retries: u32,
    /// Parsed for compatibility; the multiplexed connection never idles out
    pub idle_timeout: Duration,
    pub idle_check_frequency: Duration,
    /// Parsed for compatibility; every command shares one multiplexed connection
    pub pool_size: usize,
    pub pool_timeout: Duration,
    /// Expiration applied to every cached response
    pub ttl: Duration,
}

impl RedisConfig {
    /// Creates a config for `address` with every optional field at its default.
    pub fn new(mode: RedisMode, address: impl Into<String>) -> Self {
        Self {
            mode,
            address: address.into(),
            dial_timeout: REDIS_DEFAULT_DIAL_TIMEOUT,
            read_timeout: REDIS_DEFAULT_READ_TIMEOUT,
            write_timeout: REDIS_DEFAULT_WRITE_TIMEOUT,
            max_retries: REDIS_DEFAULT_MAX_RETRIES,
            idle_timeout: REDIS_DEFAULT_IDLE_TIMEOUT,
            idle_check_frequency: REDIS_DEFAULT_IDLE_CHECK_FREQUENCY,
            pool_size: REDIS_DEFAULT_POOL_SIZE,
            pool_timeout: REDIS_DEFAULT_POOL_TIMEOUT,
            ttl: REDIS_DEFAULT_TTL,
        }
    }

    fn from_map(cfg: &Map<String, Value>) -> Result<Self, ConfigError> {
        let mode = match cfg.get("mode") {
            Some(Value::String(mode)) => mode.parse()?,
            Some(_) => return Err(ConfigError::invalid("mode")),
            None => return Err(ConfigError::missing("mode")),
        };

        let address = match required(cfg, "address")? {
            Value::String(address) => address.clone(),
            _ => return Err(ConfigError::invalid("address")),
        };

        Ok(Self {
            mode,
            address,
            dial_timeout: duration_or(cfg, "dialTimeout", REDIS_DEFAULT_DIAL_TIMEOUT)?,
            read_timeout: duration_or(cfg, "readTimeout", REDIS_DEFAULT_READ_TIMEOUT)?,
            write_timeout: duration_or(cfg, "writeTimeout", REDIS_DEFAULT_WRITE_TIMEOUT)?,
            max_retries: retries_or(cfg, "maxRetries", REDIS_DEFAULT_MAX_RETRIES)?,
            idle_timeout: duration_or(cfg, "idleTimeout", REDIS_DEFAULT_IDLE_TIMEOUT)?,
            idle_check_frequency: duration_or(
                cfg,
                "idleCheckFrequency",
                REDIS_DEFAULT_IDLE_CHECK_FREQUENCY,
            )?,
            pool_size: integer_or(cfg, "poolSize", REDIS_DEFAULT_POOL_SIZE)?,
            pool_timeout: duration_or(cfg, "poolTimeout", REDIS_DEFAULT_POOL_TIMEOUT)?,
            ttl: duration_or(cfg, "ttl", REDIS_DEFAULT_TTL)?,
        })
    }
}

// == Cache Config ==
/// Cache settings of a single backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Present whenever the namespace carries a `redis` block
    pub redis: Option<RedisConfig>,
}

impl CacheConfig {
    /// Extracts the cache settings from a backend definition.
    pub fn from_backend(backend: &BackendConfig) -> Result<Self, ConfigError> {
        Self::from_extra_config(&backend.extra_config)
    }

    /// Extracts the cache settings from an `extra_config` map.
    pub fn from_extra_config(extra: &ExtraConfig) -> Result<Self, ConfigError> {
        let value = extra.get(NAMESPACE).ok_or(ConfigError::NoConfig)?;
        let cfg = value.as_object().ok_or(ConfigError::Mapping)?;

        let backend = match cfg.get("type") {
            Some(Value::String(kind)) => kind.parse()?,
            Some(_) => return Err(ConfigError::invalid("type")),
            None => CacheBackend::Memory,
        };

        let redis = match cfg.get(BACKEND_REDIS).and_then(Value::as_object) {
            Some(redis_cfg) => Some(RedisConfig::from_map(redis_cfg)?),
            None if backend == CacheBackend::Redis => {
                return Err(ConfigError::missing(BACKEND_REDIS))
            }
            None => None,
        };

        Ok(Self { backend, redis })
    }
}

// == Field Helpers ==
fn required<'a>(cfg: &'a Map<String, Value>, key: &str) -> Result<&'a Value, ConfigError> {
    cfg.get(key).ok_or_else(|| ConfigError::missing(key))
}

fn duration_or(
    cfg: &Map<String, Value>,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match cfg.get(key) {
        None => Ok(default),
        Some(Value::String(raw)) => parse_duration(raw).map_err(|_| ConfigError::invalid(key)),
        Some(_) => Err(ConfigError::invalid(key)),
    }
}

fn integer_or<T>(cfg: &Map<String, Value>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: TryFrom<u64>,
{
    match cfg.get(key) {
        None => Ok(default),
        Some(value) => value
            .as_u64()
            .and_then(|n| T::try_from(n).ok())
            .ok_or_else(|| ConfigError::invalid(key)),
    }
}

/// Like [`integer_or`], but `-1` means "no retries".
fn retries_or(cfg: &Map<String, Value>, key: &str, default: u32) -> Result<u32, ConfigError> {
    match cfg.get(key).and_then(Value::as_i64) {
        Some(-1) => Ok(0),
        _ => integer_or(cfg, key, default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extra(value: Value) -> ExtraConfig {
        let mut extra = ExtraConfig::new();
        extra.insert(NAMESPACE.to_string(), value);
        extra
    }

    #[test]
    fn test_empty_namespace_defaults_to_memory() {
        let cfg = CacheConfig::from_extra_config(&extra(json!({}))).unwrap();
        assert_eq!(cfg.backend, CacheBackend::Memory);
        assert!(cfg.redis.is_none());
    }

    #[test]
    fn test_memory_type() {
        let cfg = CacheConfig::from_extra_config(&extra(json!({"type": "memory"}))).unwrap();
        assert_eq!(cfg.backend, CacheBackend::Memory);
        assert!(cfg.redis.is_none());
    }

    #[test]
    fn test_redis_defaults() {
        let cfg = CacheConfig::from_extra_config(&extra(json!({
            "type": "redis",
            "redis": {"address": "localhost:6379", "mode": "redis"}
        })))
        .unwrap();

        assert_eq!(cfg.backend, CacheBackend::Redis);
        let redis = cfg.redis.unwrap();
        assert_eq!(redis, RedisConfig::new(RedisMode::Redis, "localhost:6379"));
        assert_eq!(redis.dial_timeout, REDIS_DEFAULT_DIAL_TIMEOUT);
        assert_eq!(redis.read_timeout, REDIS_DEFAULT_READ_TIMEOUT);
        assert_eq!(redis.write_timeout, REDIS_DEFAULT_WRITE_TIMEOUT);
        assert_eq!(redis.max_retries, REDIS_DEFAULT_MAX_RETRIES);
        assert_eq!(redis.idle_timeout, REDIS_DEFAULT_IDLE_TIMEOUT);
        assert_eq!(redis.idle_check_frequency, REDIS_DEFAULT_IDLE_CHECK_FREQUENCY);
        assert_eq!(redis.pool_size, REDIS_DEFAULT_POOL_SIZE);
        assert_eq!(redis.pool_timeout, REDIS_DEFAULT_POOL_TIMEOUT);
        assert_eq!(redis.ttl, REDIS_DEFAULT_TTL);
    }

    #[test]
    fn test_redis_values_from_config() {
        let cfg = CacheConfig::from_extra_config(&extra(json!({
            "type": "redis",
            "redis": {
                "address": "loremipsum:6379",
                "mode": "rediscluster",
                "dialTimeout": "10us",
                "readTimeout": "18us",
                "writeTimeout": "25us",
                "maxRetries": 666,
                "idleTimeout": "99s",
                "idleCheckFrequency": "14ms",
                "poolSize": 77,
                "poolTimeout": "878s",
                "ttl": "65432s"
            }
        })))
        .unwrap();

        let redis = cfg.redis.unwrap();
        assert_eq!(redis.address, "loremipsum:6379");
        assert_eq!(redis.mode, RedisMode::Cluster);
        assert_eq!(redis.dial_timeout, Duration::from_micros(10));
        assert_eq!(redis.read_timeout, Duration::from_micros(18));
        assert_eq!(redis.write_timeout, Duration::from_micros(25));
        assert_eq!(redis.max_retries, 666);
        assert_eq!(redis.idle_timeout, Duration::from_secs(99));
        assert_eq!(redis.idle_check_frequency, Duration::from_millis(14));
        assert_eq!(redis.pool_size, 77);
        assert_eq!(redis.pool_timeout, Duration::from_secs(878));
        assert_eq!(redis.ttl, Duration::from_secs(65432));
    }

    #[test]
    fn test_redis_block_is_validated_for_memory_type() {
        let err = CacheConfig::from_extra_config(&extra(json!({
            "type": "memory",
            "redis": {"address": "localhost:6379"}
        })))
        .unwrap_err();
        assert_eq!(err, ConfigError::missing("mode"));

        let cfg = CacheConfig::from_extra_config(&extra(json!({
            "type": "memory",
            "redis": {"address": "localhost:6379", "mode": "redis"}
        })))
        .unwrap();
        assert_eq!(cfg.backend, CacheBackend::Memory);
        assert!(cfg.redis.is_some());
    }

    #[test]
    fn test_missing_namespace() {
        let err = CacheConfig::from_extra_config(&ExtraConfig::new()).unwrap_err();
        assert_eq!(err, ConfigError::NoConfig);
    }

    #[test]
    fn test_namespace_not_an_object() {
        let err = CacheConfig::from_extra_config(&extra(json!("memory"))).unwrap_err();
        assert_eq!(err, ConfigError::Mapping);
    }

    #[test]
    fn test_missing_redis_block() {
        let err = CacheConfig::from_extra_config(&extra(json!({"type": "redis"}))).unwrap_err();
        assert_eq!(err, ConfigError::missing("redis"));

        let err = CacheConfig::from_extra_config(&extra(json!({
            "type": "redis",
            "redis": "localhost:6379"
        })))
        .unwrap_err();
        assert_eq!(err, ConfigError::missing("redis"));
    }

    #[test]
    fn test_missing_redis_mode() {
        let err = CacheConfig::from_extra_config(&extra(json!({
            "type": "redis",
            "redis": {}
        })))
        .unwrap_err();
        assert_eq!(err, ConfigError::missing("mode"));
    }

    #[test]
    fn test_invalid_redis_mode() {
        let err = CacheConfig::from_extra_config(&extra(json!({
            "type": "redis",
            "redis": {"mode": "sentinel", "address": "localhost:6379"}
        })))
        .unwrap_err();
        assert_eq!(err, ConfigError::invalid("mode"));
    }

    #[test]
    fn test_missing_redis_address() {
        let err = CacheConfig::from_extra_config(&extra(json!({
            "type": "redis",
            "redis": {"mode": "redis"}
        })))
        .unwrap_err();
        assert_eq!(err, ConfigError::missing("address"));
    }

    #[test]
    fn test_invalid_type() {
        let err = CacheConfig::from_extra_config(&extra(json!({"type": "disk"}))).unwrap_err();
        assert_eq!(err, ConfigError::invalid("type"));

        let err = CacheConfig::from_extra_config(&extra(json!({"type": 1}))).unwrap_err();
        assert_eq!(err, ConfigError::invalid("type"));
    }

    #[test]
    fn test_invalid_field_values() {
        let err = CacheConfig::from_extra_config(&extra(json!({
            "type": "redis",
            "redis": {"mode": "redis", "address": "localhost:6379", "ttl": "forever"}
        })))
        .unwrap_err();
        assert_eq!(err, ConfigError::invalid("ttl"));

        let err = CacheConfig::from_extra_config(&extra(json!({
            "type": "redis",
            "redis": {"mode": "redis", "address": "localhost:6379", "poolSize": -1}
        })))
        .unwrap_err();
        assert_eq!(err, ConfigError::invalid("poolSize"));

        let err = CacheConfig::from_extra_config(&extra(json!({
            "type": "redis",
            "redis": {"mode": "redis", "address": 6379}
        })))
        .unwrap_err();
        assert_eq!(err, ConfigError::invalid("address"));
    }

    #[test]
    fn test_max_retries_minus_one_disables_retries() {
        let cfg = CacheConfig::from_extra_config(&extra(json!({
            "type": "redis",
            "redis": {"mode": "redis", "address": "localhost:6379", "maxRetries": -1}
        })))
        .unwrap();
        assert_eq!(cfg.redis.unwrap().max_retries, 0);

        let err = CacheConfig::from_extra_config(&extra(json!({
            "type": "redis",
            "redis": {"mode": "redis", "address": "localhost:6379", "maxRetries": -2}
        })))
        .unwrap_err();
        assert_eq!(err, ConfigError::invalid("maxRetries"));
    }

    #[test]
    fn test_from_backend_reads_extra_config() {
        let backend = BackendConfig {
            extra_config: extra(json!({"type": "memory"})),
            ..BackendConfig::default()
        };
        let cfg = CacheConfig::from_backend(&backend).unwrap();
        assert_eq!(cfg.backend, CacheBackend::Memory);
    }
}
