//! Gateway Module
//!
//! The host framework the cache plugs into: service definition, HTTP client
//! abstraction and backend proxies.

mod client;
mod config;
pub mod proxy;

pub use client::{default_http_client_factory, HttpClient, HttpClientFactory, HttpResponse};
pub(crate) use client::shared_reqwest_client;
pub use config::{
    backend_url, BackendConfig, EndpointConfig, ExtraConfig, ServiceConfig, ENCODING_JSON,
    ENCODING_SAFE_JSON, ENCODING_STRING,
};
pub use proxy::{custom_http_proxy_factory, BackendFactory, Proxy};
