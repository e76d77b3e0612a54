//! HTTP client handed to backend proxies
//!
//! A client is either a plain `reqwest::Client` or a [`CacheTransport`]
//! wrapping one. Both answer with a fully buffered [`HttpResponse`].

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};

use crate::cache::CacheKind;
use crate::transport::{CacheTransport, X_FROM_CACHE};

/// Builds the client used for one backend request.
pub type HttpClientFactory = Arc<dyn Fn() -> HttpClient + Send + Sync>;

static DEFAULT_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Process-wide `reqwest::Client`, shared by plain and caching clients.
pub(crate) fn shared_reqwest_client() -> reqwest::Client {
    DEFAULT_CLIENT.get_or_init(reqwest::Client::new).clone()
}

/// Factory returning plain clients with no caching.
pub fn default_http_client_factory() -> HttpClientFactory {
    Arc::new(HttpClient::plain)
}

// == HTTP Response ==
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Reads the whole body of a `reqwest` response.
    pub async fn read(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self::new(status, headers, body))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Whether the response was served by a caching transport.
    pub fn from_cache(&self) -> bool {
        self.headers
            .get(X_FROM_CACHE)
            .map(|v| v.as_bytes() == b"1")
            .unwrap_or(false)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// == HTTP Client ==
#[derive(Clone)]
pub enum HttpClient {
    Plain(reqwest::Client),
    Caching(Arc<CacheTransport>),
}

impl HttpClient {
    pub fn plain() -> Self {
        HttpClient::Plain(shared_reqwest_client())
    }

    pub fn caching(transport: CacheTransport) -> Self {
        HttpClient::Caching(Arc::new(transport))
    }

    pub fn is_caching(&self) -> bool {
        matches!(self, HttpClient::Caching(_))
    }

    /// Backend behind the caching transport, if any.
    pub fn cache_kind(&self) -> Option<CacheKind> {
        match self {
            HttpClient::Plain(_) => None,
            HttpClient::Caching(transport) => Some(transport.cache().kind()),
        }
    }

    pub fn transport(&self) -> Option<&CacheTransport> {
        match self {
            HttpClient::Plain(_) => None,
            HttpClient::Caching(transport) => Some(transport),
        }
    }

    fn inner(&self) -> &reqwest::Client {
        match self {
            HttpClient::Plain(client) => client,
            HttpClient::Caching(transport) => transport.client(),
        }
    }

    /// Starts a request; send it with [`HttpClient::execute`].
    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.inner().request(method, url)
    }

    pub async fn execute(
        &self,
        request: reqwest::Request,
    ) -> Result<HttpResponse, reqwest_middleware::Error> {
        match self {
            HttpClient::Plain(client) => {
                Ok(HttpResponse::read(client.execute(request).await?).await?)
            }
            HttpClient::Caching(transport) => transport.round_trip(request).await,
        }
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse, reqwest_middleware::Error> {
        let request = self.request(Method::GET, url).build()?;
        self.execute(request).await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpClient::Plain(_) => f.write_str("HttpClient::Plain"),
            HttpClient::Caching(transport) => {
                write!(f, "HttpClient::Caching({:?})", transport.cache().kind())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_from_cache_marker() {
        let mut response = HttpResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::new());
        assert!(!response.from_cache());

        response
            .headers_mut()
            .insert(X_FROM_CACHE, HeaderValue::from_static("1"));
        assert!(response.from_cache());
    }

    #[test]
    fn test_default_factory_is_plain() {
        let client = default_http_client_factory()();
        assert!(!client.is_caching());
        assert_eq!(client.cache_kind(), None);
        assert!(client.transport().is_none());
    }

    #[tokio::test]
    async fn test_invalid_url_is_an_error() {
        assert!(HttpClient::plain().get("not a url").await.is_err());
    }
}
