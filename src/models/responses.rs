//! Response DTOs for the gateway's own endpoints
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheKind, CacheStats};

/// Response body for the cache statistics endpoint (GET /__cache/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Backend the statistics belong to
    pub cache: CacheKind,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of stored responses
    pub writes: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Bytes held by the cached responses
    pub total_bytes: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn memory(stats: &CacheStats) -> Self {
        Self {
            cache: CacheKind::Memory,
            hits: stats.hits,
            misses: stats.misses,
            writes: stats.writes,
            evictions: stats.evictions,
            total_entries: stats.total_entries,
            total_bytes: stats.total_bytes,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /__health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Number of endpoints mounted from the service config
    pub endpoints: usize,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy(endpoints: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            endpoints,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_response_from_cache_stats() {
        let mut stats = CacheStats::new();
        for _ in 0..4 {
            stats.record_hit();
        }
        stats.record_miss();
        stats.record_write();
        stats.set_occupancy(1, 128);

        let resp = StatsResponse::memory(&stats);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.total_bytes, 128);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["cache"], "memory");
        assert_eq!(json["writes"], 1);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::memory(&CacheStats::new());
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy(3);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
        assert!(json.contains("\"endpoints\":3"));
    }
}
