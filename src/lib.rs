//! KV Cache - a cache backend over a pluggable key-value store
//!
//! Provides get/set/add/delete/counter and batch operations with TTL based expiration,
//! translated into calls against a [`StoreDriver`](driver::StoreDriver).

pub mod api;
pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheBackend;
pub use config::{BackendConfig, Config};
pub use driver::{MemoryStore, MemoryStoreConfig, StoreDriver};
pub use error::{CacheError, Result};
