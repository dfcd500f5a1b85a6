//! Response DTOs for the demo HTTP surface

use serde::Serialize;
use serde_json::Value;

use crate::driver::RecordMetadata;

/// Response body for GET /get/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
}

/// Response body for POST /get_many
#[derive(Debug, Clone, Serialize)]
pub struct ValuesResponse {
    /// One entry per requested key, null on a miss
    pub values: Vec<Option<Value>>,
}

/// Response body for PUT /set and PUT /add
#[derive(Debug, Clone, Serialize)]
pub struct WriteResponse {
    pub key: String,
    pub success: bool,
}

/// Response body for DELETE /del/:key
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub key: String,
    pub deleted: bool,
}

/// Response body for GET /has/:key
#[derive(Debug, Clone, Serialize)]
pub struct HasResponse {
    pub key: String,
    pub exists: bool,
}

/// Response body for POST /inc/:key and POST /dec/:key
#[derive(Debug, Clone, Serialize)]
pub struct CounterResponse {
    pub key: String,
    /// New counter value, null when the store rejected the update
    pub value: Option<i64>,
}

/// Response body for GET /meta/:key
#[derive(Debug, Clone, Serialize)]
pub struct MetadataResponse {
    pub key: String,
    pub ttl: u32,
    pub generation: u32,
    pub never_expires: bool,
}

impl MetadataResponse {
    pub fn new(key: impl Into<String>, metadata: RecordMetadata) -> Self {
        Self {
            key: key.into(),
            ttl: metadata.ttl,
            generation: metadata.generation,
            never_expires: metadata.never_expires(),
        }
    }
}

/// Response body for PUT /set_many and POST /delete_many
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub keys: Vec<String>,
}

/// Response body for DELETE /clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// The store accepted the request; removal completes asynchronously
    pub accepted: bool,
}

/// Response body for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy" while the backend holds a connection, "closed" afterwards
    pub status: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(connected: bool) -> Self {
        Self {
            status: if connected { "healthy" } else { "closed" }.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
