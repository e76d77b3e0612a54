//! Transport Module
//!
//! HTTP caching transport: a `reqwest::Client` wrapped in the `http-cache`
//! middleware, which applies private-cache HTTP semantics (freshness,
//! revalidation, `Vary`, `no-store`, invalidation by unsafe methods) and
//! keeps its entries in a [`Cache`].

use std::sync::Arc;

use http::header::CACHE_CONTROL;
use http_cache::{CacheMode, HttpCache, HttpCacheOptions};
use http_cache_reqwest::Cache as CacheMiddleware;
use http_cache_semantics::CacheOptions;
use reqwest::header::HeaderValue;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use tracing::debug;

use crate::cache::Cache;
use crate::gateway::{shared_reqwest_client, HttpResponse};

mod codec;
mod manager;

pub use codec::StoredResponse;
pub use manager::CacheStorage;

/// Header set to `1` on responses served from the cache
pub const X_FROM_CACHE: &str = "x-from-cache";

/// Cache status header written by the caching middleware
pub const X_CACHE: &str = "x-cache";

// == Cache Transport ==
pub struct CacheTransport {
    cache: Arc<dyn Cache>,
    client: reqwest::Client,
    middleware: ClientWithMiddleware,
}

impl CacheTransport {
    /// Caching transport over the process-wide `reqwest::Client`.
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self::with_client(cache, shared_reqwest_client())
    }

    pub fn with_client(cache: Arc<dyn Cache>, client: reqwest::Client) -> Self {
        let http_cache = HttpCache {
            mode: CacheMode::Default,
            manager: CacheStorage::new(cache.clone()),
            options: HttpCacheOptions {
                cache_options: Some(CacheOptions {
                    shared: false,
                    ..CacheOptions::default()
                }),
                cache_mode_fn: Some(Arc::new(cache_mode)),
                ..HttpCacheOptions::default()
            },
        };
        let middleware = ClientBuilder::new(client.clone())
            .with(CacheMiddleware(http_cache))
            .build();

        Self {
            cache,
            client,
            middleware,
        }
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    /// Client used to build requests for [`CacheTransport::round_trip`].
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Sends `request` through the cache.
    ///
    /// Responses answered from a stored entry, fresh or revalidated with a
    /// `304`, carry `x-from-cache: 1`.
    pub async fn round_trip(
        &self,
        request: reqwest::Request,
    ) -> Result<HttpResponse, reqwest_middleware::Error> {
        let url = request.url().to_string();
        let mut response = HttpResponse::read(self.middleware.execute(request).await?).await?;

        if is_hit(&response) {
            debug!(url = %url, "Response served from cache");
            response
                .headers_mut()
                .insert(X_FROM_CACHE, HeaderValue::from_static("1"));
        }
        Ok(response)
    }
}

/// `Cache-Control: only-if-cached` requests never reach the origin.
fn cache_mode(parts: &http::request::Parts) -> CacheMode {
    let only_if_cached = parts
        .headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|directive| directive.trim().eq_ignore_ascii_case("only-if-cached"));

    if only_if_cached {
        CacheMode::OnlyIfCached
    } else {
        CacheMode::Default
    }
}

fn is_hit(response: &HttpResponse) -> bool {
    response
        .headers()
        .get(X_CACHE)
        .map(|v| v.as_bytes().eq_ignore_ascii_case(b"HIT"))
        .unwrap_or(false)
}
