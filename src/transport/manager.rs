//! `CacheManager` over the crate's byte caches

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http_cache::{BoxError, CacheManager, HttpResponse};
use http_cache_semantics::CachePolicy;
use tracing::{debug, warn};

use crate::cache::Cache;
use crate::transport::codec::StoredResponse;

/// Stores the caching middleware's entries in a [`Cache`].
#[derive(Clone)]
pub struct CacheStorage {
    cache: Arc<dyn Cache>,
}

impl CacheStorage {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }
}

impl fmt::Debug for CacheStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStorage")
            .field("kind", &self.cache.kind())
            .finish()
    }
}

#[async_trait]
impl CacheManager for CacheStorage {
    async fn get(&self, cache_key: &str) -> Result<Option<(HttpResponse, CachePolicy)>, BoxError> {
        let Some(raw) = self.cache.get(cache_key).await else {
            return Ok(None);
        };

        match StoredResponse::decode(&raw) {
            Ok(stored) => Ok(Some(stored.into_parts())),
            Err(e) => {
                warn!(key = cache_key, error = %e, "Discarding undecodable cached response");
                self.cache.delete(cache_key).await;
                Ok(None)
            }
        }
    }

    async fn put(
        &self,
        cache_key: String,
        response: HttpResponse,
        policy: CachePolicy,
    ) -> Result<HttpResponse, BoxError> {
        let stored = StoredResponse::new(response, policy);
        let bytes = stored.encode()?;
        debug!(key = %cache_key, size = bytes.len(), "Storing response");
        self.cache.set(&cache_key, bytes).await;
        Ok(stored.response)
    }

    async fn delete(&self, cache_key: &str) -> Result<(), BoxError> {
        self.cache.delete(cache_key).await;
        Ok(())
    }
}
