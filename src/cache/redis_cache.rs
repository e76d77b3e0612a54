//! Redis cache backend
//!
//! Adapts a [`RedisCommands`] implementation to the [`Cache`] trait. Every
//! stored value expires after the adapter's TTL.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cache::{Cache, CacheKind, RedisClient, RedisCommands};
use crate::config::RedisMode;

// == Redis Cache ==
pub struct RedisCache<C = RedisClient> {
    client: C,
    ttl: Duration,
}

impl<C: RedisCommands> RedisCache<C> {
    pub fn new(client: C, ttl: Duration) -> Self {
        Self { client, ttl }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[async_trait]
impl<C: RedisCommands> Cache for RedisCache<C> {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.client.get(key).await {
            Ok(Some(value)) => {
                debug!(key = key, "Redis cache hit");
                Some(value)
            }
            Ok(None) => {
                debug!(key = key, "Redis cache miss");
                None
            }
            Err(e) => {
                warn!(key = key, error = %e, "Redis GET failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) {
        if let Err(e) = self.client.set(key, &value, self.ttl).await {
            warn!(key = key, error = %e, "Redis SET failed");
        }
    }

    async fn delete(&self, key: &str) {
        if let Err(e) = self.client.del(key).await {
            warn!(key = key, error = %e, "Redis DEL failed");
        }
    }

    fn kind(&self) -> CacheKind {
        match self.client.mode() {
            RedisMode::Redis => CacheKind::Redis,
            RedisMode::Cluster => CacheKind::RedisCluster,
        }
    }
}
