//! HTTP client and backend proxy factories
//!
//! Picks the cache of each backend from its `extra_config` and hands out
//! clients that go through it.

use std::sync::{Arc, OnceLock};

use tracing::{debug, info, warn};

use crate::cache::{shared_memory_cache, RedisCache, RedisClient};
use crate::config::{CacheBackend, CacheConfig};
use crate::error::ConfigError;
use crate::gateway::{
    custom_http_proxy_factory, default_http_client_factory, BackendConfig, BackendFactory,
    HttpClient, HttpClientFactory,
};
use crate::transport::CacheTransport;

static MEMORY_CLIENT: OnceLock<HttpClient> = OnceLock::new();

/// Client over the process-wide memory cache, shared by every memory backend.
pub fn shared_memory_client() -> HttpClient {
    MEMORY_CLIENT
        .get_or_init(|| {
            HttpClient::caching(CacheTransport::new(Arc::new(shared_memory_cache())))
        })
        .clone()
}

// == HTTP Client Factory ==
/// Client factory for one backend.
///
/// Backends without cache settings, or with settings that do not parse, get
/// plain uncached clients.
pub fn new_http_client(backend: &BackendConfig) -> HttpClientFactory {
    let cfg = match CacheConfig::from_backend(backend) {
        Ok(cfg) => cfg,
        Err(ConfigError::NoConfig) => {
            debug!(backend = %backend.url_pattern, "No httpcache config, using plain client");
            return default_http_client_factory();
        }
        Err(e) => {
            warn!(backend = %backend.url_pattern, error = %e, "Ignoring httpcache config");
            return default_http_client_factory();
        }
    };

    match (cfg.backend, cfg.redis) {
        (CacheBackend::Memory, _) => {
            info!(backend = %backend.url_pattern, "Using shared memory cache");
            Arc::new(shared_memory_client)
        }
        (CacheBackend::Redis, Some(redis)) => {
            info!(
                backend = %backend.url_pattern,
                address = %redis.address,
                mode = %redis.mode,
                ttl = ?redis.ttl,
                "Using Redis cache"
            );
            let cache = RedisCache::new(RedisClient::from_config(&redis), redis.ttl);
            let client = HttpClient::caching(CacheTransport::new(Arc::new(cache)));
            Arc::new(move || client.clone())
        }
        (CacheBackend::Redis, None) => {
            warn!(backend = %backend.url_pattern, "Redis cache without redis settings, using plain client");
            default_http_client_factory()
        }
    }
}

// == Backend Factory ==
/// Proxy factory whose proxies use the cache configured for their backend.
pub fn backend_factory(backend: &BackendConfig) -> BackendFactory {
    custom_http_proxy_factory(new_http_client(backend))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKind;
    use crate::config::NAMESPACE;
    use serde_json::{json, Value};

    fn backend(cache: Option<Value>) -> BackendConfig {
        let mut backend = BackendConfig {
            host: vec!["http://127.0.0.1:1".to_string()],
            url_pattern: "/".to_string(),
            ..BackendConfig::default()
        };
        if let Some(cache) = cache {
            backend.extra_config.insert(NAMESPACE.to_string(), cache);
        }
        backend
    }

    #[test]
    fn test_no_config_gives_plain_client() {
        let client = new_http_client(&backend(None))();
        assert!(!client.is_caching());
    }

    #[test]
    fn test_invalid_config_gives_plain_client() {
        let client = new_http_client(&backend(Some(json!({"type": "redis"}))))();
        assert!(!client.is_caching());

        let client = new_http_client(&backend(Some(json!("memory"))))();
        assert!(!client.is_caching());
    }

    #[test]
    fn test_memory_clients_share_one_cache() {
        let factory = new_http_client(&backend(Some(json!({}))));
        let other = new_http_client(&backend(Some(json!({"type": "memory"}))));

        let (a, b) = (factory(), other());
        assert_eq!(a.cache_kind(), Some(CacheKind::Memory));

        let (a, b) = (a.transport().unwrap(), b.transport().unwrap());
        assert!(Arc::ptr_eq(a.cache(), b.cache()));
    }

    #[test]
    fn test_redis_modes() {
        let factory = new_http_client(&backend(Some(json!({
            "type": "redis",
            "redis": {"mode": "redis", "address": "ip:port"}
        }))));
        assert_eq!(factory().cache_kind(), Some(CacheKind::Redis));

        let factory = new_http_client(&backend(Some(json!({
            "type": "redis",
            "redis": {"mode": "rediscluster", "address": "ip:port"}
        }))));
        assert_eq!(factory().cache_kind(), Some(CacheKind::RedisCluster));
    }
}
