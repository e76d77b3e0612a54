//! Serialized form of a stored response
//!
//! An entry is the response together with the `CachePolicy` it was stored
//! under, encoded with bincode. Header values are kept as the UTF-8 strings
//! handed over by the caching middleware and the body as raw bytes.

use http_cache::HttpResponse;
use http_cache_semantics::CachePolicy;
use serde::{Deserialize, Serialize};

// == Stored Response ==
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResponse {
    pub response: HttpResponse,
    pub policy: CachePolicy,
}

impl StoredResponse {
    pub fn new(response: HttpResponse, policy: CachePolicy) -> Self {
        Self { response, policy }
    }

    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(raw: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(raw)
    }

    pub fn into_parts(self) -> (HttpResponse, CachePolicy) {
        (self.response, self.policy)
    }
}
