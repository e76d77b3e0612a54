//! In-memory cache backend
//!
//! Wraps a [`CacheStore`] behind an async lock and exposes it through the
//! [`Cache`] trait. A single process-wide instance backs every backend
//! configured with the memory cache type.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::{Cache, CacheKind, CacheStats, CacheStore};
use crate::error::CacheError;

/// Capacity of the shared memory cache when not configured otherwise
pub const DEFAULT_MEMORY_MAX_ENTRIES: usize = 10_000;

static SHARED: OnceLock<MemoryCache> = OnceLock::new();

// == Memory Cache ==
#[derive(Clone, Debug)]
pub struct MemoryCache {
    store: Arc<RwLock<CacheStore>>,
}

impl MemoryCache {
    /// Creates an independent memory cache.
    pub fn new(max_entries: usize, default_ttl: Option<Duration>) -> Self {
        Self {
            store: Arc::new(RwLock::new(CacheStore::new(max_entries, default_ttl))),
        }
    }

    /// Shared handle to the underlying store.
    pub fn store(&self) -> Arc<RwLock<CacheStore>> {
        self.store.clone()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_MAX_ENTRIES, None)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        // Write lock: a read updates LRU order and stats.
        let mut store = self.store.write().await;
        match store.get(key) {
            Ok(value) => {
                debug!(key = key, "Memory cache hit");
                Some(value)
            }
            Err(_) => {
                debug!(key = key, "Memory cache miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) {
        let mut store = self.store.write().await;
        if let Err(e) = store.set(key.to_string(), value, None) {
            warn!(key = key, error = %e, "Memory cache write rejected");
        }
    }

    async fn delete(&self, key: &str) {
        let mut store = self.store.write().await;
        match store.delete(key) {
            Ok(()) | Err(CacheError::NotFound(_)) => {}
            Err(e) => warn!(key = key, error = %e, "Memory cache delete failed"),
        }
    }

    fn kind(&self) -> CacheKind {
        CacheKind::Memory
    }
}

// == Shared Instance ==
/// Sizes the process-wide memory cache.
///
/// Only the first call has an effect; returns `false` when the shared cache
/// was already created.
pub fn init_shared_memory_cache(max_entries: usize, default_ttl: Option<Duration>) -> bool {
    SHARED.set(MemoryCache::new(max_entries, default_ttl)).is_ok()
}

/// Handle to the process-wide memory cache, created with defaults on first use.
pub fn shared_memory_cache() -> MemoryCache {
    SHARED.get_or_init(MemoryCache::default).clone()
}
