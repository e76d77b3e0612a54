//! Error types for the HTTP cache backends and the gateway
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Config Error Enum ==
/// Errors raised while extracting the cache settings of a backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The backend carries no cache namespace at all
    #[error("no config found for httpcache")]
    NoConfig,

    /// The namespace exists but is not a JSON object
    #[error("could not map httpcache config")]
    Mapping,

    /// A mandatory field is absent
    #[error("Missing required httpcache config field [{0}]")]
    MissingRequired(String),

    /// A field is present but holds an unusable value
    #[error("Invalid value for httpcache config field [{0}]")]
    InvalidValue(String),
}

impl ConfigError {
    pub(crate) fn missing(field: &str) -> Self {
        ConfigError::MissingRequired(field.to_string())
    }

    pub(crate) fn invalid(field: &str) -> Self {
        ConfigError::InvalidValue(field.to_string())
    }
}

// == Cache Error Enum ==
/// Errors returned by the in-memory cache store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key has expired
    #[error("Key expired: {0}")]
    Expired(String),

    /// Key or value rejected by the store limits
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    /// Cache is full and eviction failed
    #[error("Cache full: {0}")]
    CacheFull(String),
}

// == Gateway Error Enum ==
/// Errors surfaced by backend proxies and the gateway server.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Backend settings could not be read
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request to the backend failed
    #[error("Backend request failed: {0}")]
    Http(#[from] reqwest_middleware::Error),

    /// The backend answered with a status the proxy does not accept
    #[error("Invalid status code from backend: {0}")]
    InvalidStatusCode(u16),

    /// The backend body could not be decoded
    #[error("Could not decode backend response: {0}")]
    Decode(String),

    /// The incoming request could not be turned into a backend request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The service definition could not be loaded
    #[error("Could not load service config: {0}")]
    ServiceConfig(String),

    /// Internal gateway error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status used when the error reaches a client of the gateway.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Http(_)
            | GatewayError::InvalidStatusCode(_)
            | GatewayError::Decode(_) => StatusCode::BAD_GATEWAY,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Config(_)
            | GatewayError::ServiceConfig(_)
            | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
