//! API Routes
//!
//! Mounts the endpoints of a [`ServiceConfig`] plus the gateway's own
//! health and cache statistics endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::Path,
    http::Uri,
    routing::{get, on, MethodFilter},
    Router,
};
use bytes::Bytes;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use super::handlers::{
    cache_stats_handler, endpoint_handler, health_handler, path_params, AppState, EndpointProxy,
};
use crate::error::{GatewayError, Result};
use crate::gateway::ServiceConfig;

/// Creates the gateway router.
///
/// # Endpoints
/// - every endpoint of `service`, `{param}` placeholders bound from the path
/// - `GET /__health` - Health check endpoint
/// - `GET /__cache/stats` - Memory cache statistics
pub fn create_router(mut state: AppState, service: &ServiceConfig) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new();
    for cfg in &service.endpoints {
        let method = cfg.method()?;
        let filter = MethodFilter::try_from(method.clone()).map_err(|_| {
            GatewayError::ServiceConfig(format!("unsupported method {} on {}", method, cfg.endpoint))
        })?;

        let endpoint = Arc::new(EndpointProxy::new(cfg));
        info!(
            method = %method,
            endpoint = %cfg.endpoint,
            backends = endpoint.backends(),
            "Mounting endpoint"
        );

        let handler = move |params: Option<Path<HashMap<String, String>>>, uri: Uri, body: Bytes| {
            let endpoint = endpoint.clone();
            async move { endpoint_handler(endpoint, path_params(params), uri, body).await }
        };
        router = router.route(&axum_path(&cfg.endpoint), on(filter, handler));
    }
    state.endpoints = service.endpoints.len();

    Ok(router
        .route("/__health", get(health_handler))
        .route("/__cache/stats", get(cache_stats_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Converts `{param}` segments into axum's `:param` syntax.
fn axum_path(endpoint: &str) -> String {
    endpoint
        .split('/')
        .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => format!(":{}", name),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
