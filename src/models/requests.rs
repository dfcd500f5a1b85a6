//! Request DTOs for the demo HTTP surface

use serde::Deserialize;
use serde_json::{Map, Value};

/// Maximum accepted key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for PUT /set and PUT /add
///
/// `timeout`: absent = backend default, 0 = never expire, n = n seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub timeout: Option<u32>,
}

impl SetRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }
}

/// Request body for PUT /set_many
#[derive(Debug, Clone, Deserialize)]
pub struct SetManyRequest {
    pub items: Map<String, Value>,
    #[serde(default)]
    pub timeout: Option<u32>,
}

impl SetManyRequest {
    pub fn validate(&self) -> Option<String> {
        self.items.keys().find_map(|key| validate_key(key))
    }
}

/// Request body for POST /get_many and POST /delete_many
#[derive(Debug, Clone, Deserialize)]
pub struct KeysRequest {
    pub keys: Vec<String>,
}

impl KeysRequest {
    pub fn validate(&self) -> Option<String> {
        self.keys.iter().find_map(|key| validate_key(key))
    }
}

/// Query string of POST /inc/:key and POST /dec/:key
#[derive(Debug, Clone, Deserialize)]
pub struct CounterQuery {
    #[serde(default = "default_delta")]
    pub delta: i64,
}

impl Default for CounterQuery {
    fn default() -> Self {
        Self {
            delta: default_delta(),
        }
    }
}

fn default_delta() -> i64 {
    1
}

/// Returns an error message for an unusable key.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    None
}
