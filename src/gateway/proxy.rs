//! Backend proxies
//!
//! A [`Proxy`] turns a gateway request into a call to one backend and
//! decodes the answer into a [`Response`]. Proxies are built per backend by
//! a [`BackendFactory`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::error::{GatewayError, Result};
use crate::gateway::{
    backend_url, BackendConfig, HttpClientFactory, HttpResponse, ENCODING_SAFE_JSON,
    ENCODING_STRING,
};

/// Key holding array bodies and the content of `string` backends
pub const COLLECTION_KEY: &str = "collection";
pub const CONTENT_KEY: &str = "content";

// == Request ==
/// Request as seen by a backend proxy.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub method: Method,
    /// Values of the endpoint's `{param}` placeholders
    pub params: HashMap<String, String>,
    pub query: Option<String>,
    /// Headers forwarded to the backend
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

// == Response ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub status_code: u16,
    pub headers: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    pub data: Map<String, Value>,
    /// The backend answered and its body was fully decoded
    pub is_complete: bool,
    pub metadata: Metadata,
}

// == Proxy ==
#[async_trait]
pub trait Proxy: Send + Sync {
    async fn call(&self, request: Request) -> Result<Response>;
}

/// Builds the proxy serving one backend.
pub type BackendFactory = Arc<dyn Fn(&BackendConfig) -> Arc<dyn Proxy> + Send + Sync>;

/// Backend factory whose proxies send their requests with clients from
/// `client_factory`.
pub fn custom_http_proxy_factory(client_factory: HttpClientFactory) -> BackendFactory {
    Arc::new(move |backend: &BackendConfig| {
        Arc::new(HttpProxy {
            backend: backend.clone(),
            client_factory: client_factory.clone(),
        }) as Arc<dyn Proxy>
    })
}

struct HttpProxy {
    backend: BackendConfig,
    client_factory: HttpClientFactory,
}

#[async_trait]
impl Proxy for HttpProxy {
    async fn call(&self, request: Request) -> Result<Response> {
        let url = request_url(&self.backend, &request)?;

        let client = (self.client_factory)();
        let mut builder = client
            .request(self.backend.method()?, url.as_str())
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let outgoing = builder
            .build()
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;

        let response = client.execute(outgoing).await?;
        debug!(
            url = %url,
            status = response.status().as_u16(),
            from_cache = response.from_cache(),
            "Backend responded"
        );

        if response.status() != StatusCode::OK && response.status() != StatusCode::CREATED {
            return Err(GatewayError::InvalidStatusCode(response.status().as_u16()));
        }

        let data = decode(&self.backend, response.body())?;
        let data = match &self.backend.group {
            Some(group) => Map::from_iter([(group.clone(), Value::Object(data))]),
            None => data,
        };

        Ok(Response {
            data,
            is_complete: true,
            metadata: metadata(&response),
        })
    }
}

/// Backend URL with the incoming query string appended to the pattern's own.
fn request_url(backend: &BackendConfig, request: &Request) -> Result<Url> {
    let raw = backend_url(backend, &request.params)?;
    let mut url =
        Url::parse(&raw).map_err(|e| GatewayError::InvalidRequest(format!("{}: {}", raw, e)))?;

    if let Some(query) = request.query.as_deref().filter(|q| !q.is_empty()) {
        let merged = match url.query().filter(|q| !q.is_empty()) {
            Some(own) => format!("{}&{}", own, query),
            None => query.to_string(),
        };
        url.set_query(Some(&merged));
    }

    Ok(url)
}

// == Decoding ==
fn decode(backend: &BackendConfig, body: &[u8]) -> Result<Map<String, Value>> {
    match backend.encoding() {
        ENCODING_STRING => Ok(Map::from_iter([(
            CONTENT_KEY.to_string(),
            Value::String(String::from_utf8_lossy(body).into_owned()),
        )])),
        ENCODING_SAFE_JSON => match parse_json(body)? {
            Value::Object(map) => Ok(map),
            array @ Value::Array(_) => Ok(Map::from_iter([(COLLECTION_KEY.to_string(), array)])),
            other => Ok(Map::from_iter([(CONTENT_KEY.to_string(), other)])),
        },
        _ => match (parse_json(body)?, backend.is_collection) {
            (array @ Value::Array(_), true) => {
                Ok(Map::from_iter([(COLLECTION_KEY.to_string(), array)]))
            }
            (Value::Object(map), false) => Ok(map),
            (_, true) => Err(GatewayError::Decode("expected a JSON array".to_string())),
            (_, false) => Err(GatewayError::Decode("expected a JSON object".to_string())),
        },
    }
}

fn parse_json(body: &[u8]) -> Result<Value> {
    serde_json::from_slice(body).map_err(|e| GatewayError::Decode(e.to_string()))
}

fn metadata(response: &HttpResponse) -> Metadata {
    let mut headers: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in response.headers() {
        headers
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    Metadata {
        status_code: response.status().as_u16(),
        headers,
    }
}
