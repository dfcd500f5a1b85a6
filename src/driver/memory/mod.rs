//! Memory Store Module
//!
//! In-process Store Driver with TTL expiration, generations, LRU capacity eviction and
//! asynchronous truncation. Serves as the reference driver and as the test double.

mod client;
mod entry;
mod lru;
mod stats;
mod store;

pub use client::{MemoryStore, MemoryStoreConfig};
pub use entry::StoredRecord;
pub use lru::LruTracker;
pub use stats::StoreStats;
pub use store::{RecordStore, SweepReport, TruncateRequest};
