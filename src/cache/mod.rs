//! Cache Module
//!
//! Storage backends for cached HTTP responses: a bounded in-memory store
//! with LRU eviction, and a Redis adapter (single node or cluster).

use async_trait::async_trait;
use serde::Serialize;

mod entry;
mod lru;
mod memory;
mod redis_cache;
mod redis_client;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use memory::{
    init_shared_memory_cache, shared_memory_cache, MemoryCache, DEFAULT_MEMORY_MAX_ENTRIES,
};
pub use redis_cache::RedisCache;
pub use redis_client::{RedisClient, RedisCommands};
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 4096;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 8 * 1024 * 1024; // 8 MB

// == Cache Trait ==
/// Byte store used by the caching transport.
///
/// Lookups never fail: a backend error is reported as a miss, and write
/// errors are logged and swallowed.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    async fn set(&self, key: &str, value: Vec<u8>);

    async fn delete(&self, key: &str);

    /// Which backend serves this cache.
    fn kind(&self) -> CacheKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    Memory,
    Redis,
    RedisCluster,
}
