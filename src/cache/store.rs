//! Cache Store Module
//!
//! Storage engine of the memory cache: a HashMap of byte values with LRU
//! eviction and optional per-entry expiration.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::{CacheEntry, CacheStats, LruTracker, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::error::CacheError;

type Result<T> = std::result::Result<T, CacheError>;

// == Cache Store ==
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Sum of the stored value sizes
    total_bytes: usize,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Expiration applied when a write carries none
    default_ttl: Option<Duration>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store holding at most `max_entries` values.
    ///
    /// Values written without a TTL expire after `default_ttl`, or never
    /// when it is `None`.
    pub fn new(max_entries: usize, default_ttl: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            total_bytes: 0,
            max_entries,
            default_ttl,
        }
    }

    // == Set ==
    /// Stores a value, overwriting any previous one and resetting its TTL.
    ///
    /// When the store is full the least recently used entry is evicted first.
    pub fn set(&mut self, key: String, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        if key.is_empty() || key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidEntry(format!(
                "Key must be between 1 and {} bytes",
                MAX_KEY_LENGTH
            )));
        }

        if value.len() > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidEntry(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        let is_overwrite = self.entries.contains_key(&key);

        if !is_overwrite && self.entries.len() >= self.max_entries {
            match self.lru.evict_oldest() {
                Some(evicted_key) => {
                    self.remove_entry(&evicted_key);
                    self.stats.record_eviction();
                }
                None => {
                    return Err(CacheError::CacheFull(
                        "Cache is full and eviction failed".to_string(),
                    ))
                }
            }
        }

        let entry = CacheEntry::new(value, ttl.or(self.default_ttl));
        self.total_bytes += entry.size();
        if let Some(previous) = self.entries.insert(key.clone(), entry) {
            self.total_bytes -= previous.size();
        }

        self.lru.touch(&key);
        self.stats.record_write();

        Ok(())
    }

    // == Get ==
    /// Returns a copy of the value if present and not expired.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.record_miss();
                return Err(CacheError::NotFound(key.to_string()));
            }
        };

        if expired {
            self.remove_entry(key);
            self.lru.remove(key);
            self.stats.record_miss();
            return Err(CacheError::Expired(key.to_string()));
        }

        self.stats.record_hit();
        self.lru.touch(key);
        self.entries
            .get(key)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    // == Delete ==
    pub fn delete(&mut self, key: &str) -> Result<()> {
        if self.remove_entry(key) {
            self.lru.remove(key);
            Ok(())
        } else {
            Err(CacheError::NotFound(key.to_string()))
        }
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_occupancy(self.entries.len(), self.total_bytes);
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and returns how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
            self.lru.remove(key);
        }

        expired_keys.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.total_bytes -= entry.size();
                true
            }
            None => false,
        }
    }
}
