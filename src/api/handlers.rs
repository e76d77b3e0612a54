//! API Handlers
//!
//! Gateway endpoints fan out to their backends through the proxies built by
//! [`backend_factory`]; the remaining handlers expose health and cache
//! statistics.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderValue, Uri},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures::future::join_all;
use serde_json::{Map, Value};
use tracing::warn;

use crate::cache::MemoryCache;
use crate::error::Result;
use crate::factory::backend_factory;
use crate::gateway::{proxy, EndpointConfig, Proxy};
use crate::models::{HealthResponse, StatsResponse};

/// Response header telling whether every backend answered
pub const COMPLETED_HEADER: &str = "x-gateway-completed";

/// Application state shared across the gateway's own handlers.
#[derive(Clone)]
pub struct AppState {
    /// Memory cache shared by every backend configured with it
    pub memory: MemoryCache,
    /// Number of mounted endpoints
    pub endpoints: usize,
}

impl AppState {
    pub fn new(memory: MemoryCache) -> Self {
        Self {
            memory,
            endpoints: 0,
        }
    }
}

// == Endpoint ==
/// One gateway endpoint with a proxy per backend.
pub struct EndpointProxy {
    pub endpoint: String,
    backends: Vec<Arc<dyn Proxy>>,
}

impl EndpointProxy {
    pub fn new(cfg: &EndpointConfig) -> Self {
        let backends = cfg
            .backend
            .iter()
            .map(|backend| backend_factory(backend)(backend))
            .collect();

        Self {
            endpoint: cfg.endpoint.clone(),
            backends,
        }
    }

    pub fn backends(&self) -> usize {
        self.backends.len()
    }
}

/// Handler shared by every configured endpoint.
///
/// Backends are called concurrently and their data merged; the request fails
/// only when no backend answered.
pub async fn endpoint_handler(
    endpoint: Arc<EndpointProxy>,
    params: HashMap<String, String>,
    uri: Uri,
    body: Bytes,
) -> Result<Response> {
    let request = proxy::Request {
        params,
        query: uri.query().map(str::to_string),
        body: (!body.is_empty()).then_some(body),
        ..proxy::Request::default()
    };

    let results = join_all(
        endpoint
            .backends
            .iter()
            .map(|backend| backend.call(request.clone())),
    )
    .await;

    let mut data = Map::new();
    let mut completed = true;
    let mut first_error = None;

    for result in results {
        match result {
            Ok(response) => {
                completed &= response.is_complete;
                data.extend(response.data);
            }
            Err(e) => {
                warn!(endpoint = %endpoint.endpoint, error = %e, "Backend call failed");
                completed = false;
                first_error.get_or_insert(e);
            }
        }
    }

    if data.is_empty() {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    let mut response = Json(Value::Object(data)).into_response();
    response.headers_mut().insert(
        COMPLETED_HEADER,
        HeaderValue::from_static(if completed { "true" } else { "false" }),
    );
    Ok(response)
}

/// Path parameters of a gateway endpoint, empty when it declares none.
pub fn path_params(params: Option<Path<HashMap<String, String>>>) -> HashMap<String, String> {
    params.map(|Path(params)| params).unwrap_or_default()
}

/// Handler for GET /__cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.memory.stats().await;
    Json(StatsResponse::memory(&stats))
}

/// Handler for GET /__health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.endpoints))
}
