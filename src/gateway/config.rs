//! Service definition of the gateway
//!
//! Mirrors the JSON file the gateway is started with: a list of endpoints,
//! each one fanning out to one or more backends.

use std::collections::HashMap;
use std::path::Path;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, Result};

/// Free-form per-component settings, keyed by namespace.
pub type ExtraConfig = serde_json::Map<String, Value>;

pub const ENCODING_JSON: &str = "json";
pub const ENCODING_SAFE_JSON: &str = "safejson";
pub const ENCODING_STRING: &str = "string";

// == Backend Config ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Candidate hosts, the first one is used
    pub host: Vec<String>,
    /// Path of the backend resource, with `{param}` placeholders
    pub url_pattern: String,
    /// HTTP method, GET when empty
    pub method: String,
    /// `json` (default), `safejson` or `string`
    pub encoding: String,
    /// The backend answers with a JSON array
    pub is_collection: bool,
    /// Nests the backend data under this key
    pub group: Option<String>,
    pub extra_config: ExtraConfig,
}

impl BackendConfig {
    pub fn method(&self) -> Result<Method> {
        if self.method.is_empty() {
            return Ok(Method::GET);
        }
        Method::from_bytes(self.method.to_uppercase().as_bytes())
            .map_err(|_| GatewayError::ServiceConfig(format!("invalid method {}", self.method)))
    }

    pub fn encoding(&self) -> &str {
        if self.encoding.is_empty() {
            ENCODING_JSON
        } else {
            &self.encoding
        }
    }
}

// == Endpoint Config ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Path exposed by the gateway, with `{param}` placeholders
    pub endpoint: String,
    pub method: String,
    pub backend: Vec<BackendConfig>,
    pub extra_config: ExtraConfig,
}

impl EndpointConfig {
    pub fn method(&self) -> Result<Method> {
        if self.method.is_empty() {
            return Ok(Method::GET);
        }
        Method::from_bytes(self.method.to_uppercase().as_bytes())
            .map_err(|_| GatewayError::ServiceConfig(format!("invalid method {}", self.method)))
    }
}

// == Service Config ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    /// Hosts inherited by backends that declare none
    pub host: Vec<String>,
    pub endpoints: Vec<EndpointConfig>,
    pub extra_config: ExtraConfig,
}

impl ServiceConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let mut cfg: ServiceConfig =
            serde_json::from_str(raw).map_err(|e| GatewayError::ServiceConfig(e.to_string()))?;
        cfg.normalize();
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::ServiceConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    /// Fills backend hosts from the service defaults.
    fn normalize(&mut self) {
        for endpoint in &mut self.endpoints {
            for backend in &mut endpoint.backend {
                if backend.host.is_empty() {
                    backend.host = self.host.clone();
                }
            }
        }
    }
}

// == URL Building ==
/// Builds the backend URL, substituting `{param}` placeholders.
///
/// Unknown placeholders are left untouched.
pub fn backend_url(backend: &BackendConfig, params: &HashMap<String, String>) -> Result<String> {
    let host = backend
        .host
        .first()
        .ok_or_else(|| GatewayError::InvalidRequest("backend without host".to_string()))?;

    let mut path = backend.url_pattern.clone();
    for (name, value) in params {
        path = path.replace(&format!("{{{}}}", name), value);
    }

    let host = host.trim_end_matches('/');
    if path.starts_with('/') || path.is_empty() {
        Ok(format!("{}{}", host, path))
    } else {
        Ok(format!("{}/{}", host, path))
    }
}
