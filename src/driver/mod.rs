//! Store Driver Module
//!
//! The narrow capability interface the cache backend consumes from a key-value store.
//! Any store that can express these operations can sit behind the backend.

pub mod memory;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::Host;

pub use memory::{MemoryStore, MemoryStoreConfig};

// == Public Constants ==
/// TTL reported for records that never expire (the 32-bit encoding of -1)
pub const TTL_NEVER_EXPIRE: u32 = u32::MAX;

/// Named values held by a record
pub type Bins = HashMap<String, Value>;

/// Result type returned by every driver call.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

// == Record Key ==
/// Composite record address: namespace, optional set (collection) and user key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RecordKey {
    pub namespace: String,
    /// `None` addresses the default (null) set
    pub set_name: Option<String>,
    pub user_key: String,
}

impl RecordKey {
    pub fn new(
        namespace: impl Into<String>,
        set_name: Option<String>,
        user_key: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            set_name,
            user_key: user_key.into(),
        }
    }

    /// Returns true if this key lives in the given namespace/set scope.
    pub fn in_scope(&self, namespace: &str, set_name: Option<&str>) -> bool {
        self.namespace == namespace && self.set_name.as_deref() == set_name
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.namespace,
            self.set_name.as_deref().unwrap_or(""),
            self.user_key
        )
    }
}

// == Record Metadata ==
/// Store-managed metadata of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordMetadata {
    /// Seconds until expiration, or [`TTL_NEVER_EXPIRE`]
    pub ttl: u32,
    /// Write counter, assigned by the store
    pub generation: u32,
}

impl RecordMetadata {
    pub fn never_expires(&self) -> bool {
        self.ttl == TTL_NEVER_EXPIRE
    }
}

/// A record as returned by a read.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: RecordKey,
    pub metadata: RecordMetadata,
    pub bins: Bins,
}

// == Write Directives ==
/// Expiration directive attached to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    NeverExpire,
    Seconds(u32),
}

/// How a write treats an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordExistsAction {
    /// Create the record or replace the existing one
    #[default]
    Upsert,
    /// Fail with [`DriverError::RecordExists`] if the record is present
    CreateOnly,
}

/// Per-call write policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WritePolicy {
    pub exists: RecordExistsAction,
    /// TTL the store must apply to this write instead of its namespace default
    pub ttl: Option<u32>,
}

/// Everything a write call needs besides the key and the bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteDirectives {
    pub expiration: Expiration,
    pub policy: WritePolicy,
}

// == Driver Error ==
/// Classified outcome of a failed driver call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("record not found")]
    RecordNotFound,

    #[error("record already exists")]
    RecordExists,

    /// The store refused the write because of its TTL policy
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("bin incompatible type: {0}")]
    BinIncompatibleType(String),

    /// Generic error signaled by the store for this request
    #[error("server error {code}: {message}")]
    ServerError { code: i32, message: String },

    #[error("client is not connected")]
    NotConnected,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("unknown store error: {0}")]
    Unknown(String),
}

/// How the backend must react to a [`DriverError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The addressed record does not exist
    NotFound,
    /// The store understood the request and declined it
    Rejected,
    /// Anything else; propagated to the caller unchanged
    Fatal,
}

impl DriverError {
    pub fn class(&self) -> ErrorClass {
        match self {
            DriverError::RecordNotFound => ErrorClass::NotFound,
            DriverError::RecordExists
            | DriverError::Forbidden(_)
            | DriverError::BinIncompatibleType(_)
            | DriverError::ServerError { .. } => ErrorClass::Rejected,
            DriverError::NotConnected | DriverError::Connection(_) | DriverError::Unknown(_) => {
                ErrorClass::Fatal
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }
}

// == Store Driver ==
/// Capabilities the cache backend needs from a key-value store.
///
/// Atomicity of `put` with [`RecordExistsAction::CreateOnly`], `remove` and
/// `increment` is the driver's responsibility.
#[async_trait]
pub trait StoreDriver: Send + Sync + 'static {
    /// Opens the connection. Calling it on a connected handle is a no-op.
    async fn connect(&self) -> DriverResult<()>;

    fn is_connected(&self) -> bool;

    /// Releases the connection. Calling it on a closed handle is a no-op.
    async fn close(&self) -> DriverResult<()>;

    /// Reads a record, or fails with [`DriverError::RecordNotFound`].
    async fn get(&self, key: &RecordKey) -> DriverResult<Record>;

    /// Probes a record without reading its bins.
    async fn exists(&self, key: &RecordKey) -> DriverResult<Option<RecordMetadata>>;

    async fn put(&self, key: &RecordKey, bins: Bins, directives: &WriteDirectives)
        -> DriverResult<()>;

    /// Removes a record, or fails with [`DriverError::RecordNotFound`].
    async fn remove(&self, key: &RecordKey) -> DriverResult<()>;

    /// Adds `delta` to an integer bin, creating record and bin as 0 when missing,
    /// and returns the record after the update.
    async fn increment(
        &self,
        key: &RecordKey,
        bin: &str,
        delta: i64,
        directives: &WriteDirectives,
    ) -> DriverResult<Record>;

    /// One outcome per key, in input order.
    async fn batch_get(&self, keys: &[RecordKey]) -> DriverResult<Vec<DriverResult<Record>>>;

    /// One outcome per key, in input order.
    async fn batch_remove(&self, keys: &[RecordKey]) -> DriverResult<Vec<DriverResult<()>>>;

    /// One outcome per record, in input order. All records share `directives`.
    async fn batch_write(
        &self,
        records: Vec<(RecordKey, Bins)>,
        directives: &WriteDirectives,
    ) -> DriverResult<Vec<DriverResult<()>>>;

    /// Requests removal of every record in the namespace/set scope.
    ///
    /// Returns once the request is accepted; removal completes asynchronously.
    async fn truncate(&self, namespace: &str, set_name: Option<&str>) -> DriverResult<()>;
}

/// Drivers that can be built from an endpoint list.
pub trait Connect: StoreDriver + Sized {
    fn from_hosts(hosts: &[Host]) -> DriverResult<Self>;
}
