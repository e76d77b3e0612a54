//! Local origin server shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use redis::RedisResult;
use serde_json::{json, Value};

use gateway_httpcache::cache::RedisCommands;
use gateway_httpcache::config::{RedisMode, NAMESPACE};
use gateway_httpcache::gateway::BackendConfig;

#[derive(Clone, Default)]
pub struct Counters {
    /// Full responses produced by the origin
    pub hits: Arc<AtomicUsize>,
    /// `304 Not Modified` answers
    pub revalidations: Arc<AtomicUsize>,
}

pub struct Origin {
    pub addr: SocketAddr,
    pub counters: Counters,
}

impl Origin {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn host(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.counters.hits.load(Ordering::SeqCst)
    }

    pub fn revalidations(&self) -> usize {
        self.counters.revalidations.load(Ordering::SeqCst)
    }

    /// Backend pointing at this origin with the given cache settings.
    pub fn backend(&self, url_pattern: &str, cache: Option<Value>) -> BackendConfig {
        let mut backend = BackendConfig {
            host: vec![self.host()],
            url_pattern: url_pattern.to_string(),
            ..BackendConfig::default()
        };
        if let Some(cache) = cache {
            backend.extra_config.insert(NAMESPACE.to_string(), cache);
        }
        backend
    }
}

fn count(counters: &Counters) -> usize {
    counters.hits.fetch_add(1, Ordering::SeqCst) + 1
}

async fn cached(State(counters): State<Counters>) -> impl IntoResponse {
    let hits = count(&counters);
    (
        [(header::CACHE_CONTROL, "public, max-age=300")],
        Json(json!({ "hits": hits })),
    )
}

async fn invalidate() -> StatusCode {
    StatusCode::OK
}

async fn uncached(State(counters): State<Counters>) -> Json<Value> {
    Json(json!({ "hits": count(&counters) }))
}

async fn no_store(State(counters): State<Counters>) -> impl IntoResponse {
    let hits = count(&counters);
    ([(header::CACHE_CONTROL, "no-store")], Json(json!({ "hits": hits })))
}

async fn etag(State(counters): State<Counters>, headers: HeaderMap) -> Response {
    if headers
        .get(header::IF_NONE_MATCH)
        .map(|v| v == "\"v1\"")
        .unwrap_or(false)
    {
        counters.revalidations.fetch_add(1, Ordering::SeqCst);
        return (StatusCode::NOT_MODIFIED, [(header::ETAG, "\"v1\"")]).into_response();
    }

    let hits = count(&counters);
    (
        [(header::CACHE_CONTROL, "max-age=0"), (header::ETAG, "\"v1\"")],
        Json(json!({ "version": 1, "hits": hits })),
    )
        .into_response()
}

async fn vary(State(counters): State<Counters>, headers: HeaderMap) -> impl IntoResponse {
    let hits = count(&counters);
    let variant = headers
        .get("x-variant")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    (
        [
            (header::CACHE_CONTROL, "max-age=300"),
            (header::VARY, "X-Variant"),
        ],
        Json(json!({ "variant": variant, "hits": hits })),
    )
}

async fn user(State(counters): State<Counters>, Path(id): Path<String>) -> impl IntoResponse {
    let hits = count(&counters);
    (
        [(header::CACHE_CONTROL, "max-age=300")],
        Json(json!({ "id": id, "hits": hits })),
    )
}

async fn posts(State(counters): State<Counters>) -> Json<Value> {
    count(&counters);
    Json(json!([{ "title": "first" }, { "title": "second" }]))
}

async fn fail(State(counters): State<Counters>) -> StatusCode {
    count(&counters);
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Starts an origin on an ephemeral port.
pub async fn spawn_origin() -> Origin {
    let counters = Counters::default();
    let app = Router::new()
        .route("/cached", get(cached).post(invalidate))
        .route("/uncached", get(uncached))
        .route("/no-store", get(no_store))
        .route("/etag", get(etag))
        .route("/vary", get(vary))
        .route("/users/:id", get(user))
        .route("/posts", get(posts))
        .route("/fail", get(fail))
        .with_state(counters.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Origin { addr, counters }
}

// == Recording Redis ==
/// In-memory stand-in for Redis that records every command it receives.
#[derive(Clone, Default)]
pub struct RecordingRedis {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingRedis {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.data.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl RedisCommands for RecordingRedis {
    async fn get(&self, key: &str) -> RedisResult<Option<Vec<u8>>> {
        self.calls.lock().unwrap().push(format!("GET {}", key));
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> RedisResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("SET {} {}s", key, ttl.as_secs()));
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn del(&self, key: &str) -> RedisResult<()> {
        self.calls.lock().unwrap().push(format!("DEL {}", key));
        self.data.lock().unwrap().remove(key);
        Ok(())
    }

    fn mode(&self) -> RedisMode {
        RedisMode::Redis
    }
}
