//! Cache Backend
//!
//! Translates cache operations into Store Driver calls. Recognized store conditions
//! (missing record, write rejections, incompatible counter operands) become `None`,
//! `false` or omitted keys; every other driver error is propagated unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::timeout::normalize_timeout;
use super::{validate_scope, VALUE_BIN};
use crate::config::BackendConfig;
use crate::driver::{
    Bins, Connect, DriverError, DriverResult, ErrorClass, RecordExistsAction, RecordKey,
    RecordMetadata, StoreDriver, WriteDirectives,
};
use crate::error::{CacheError, Result};

// == Cache Backend ==
/// Cache backend bound to one namespace/set scope of a store.
///
/// The backend holds no record state. It exclusively owns its driver handle until
/// [`close`](Self::close) releases it; afterwards every operation fails with
/// [`CacheError::Closed`].
pub struct CacheBackend<D: StoreDriver> {
    client: RwLock<Option<Arc<D>>>,
    namespace: String,
    set_name: Option<String>,
    /// Seconds, 0 = never expire
    default_timeout: u32,
}

impl<D: StoreDriver> std::fmt::Debug for CacheBackend<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheBackend")
            .field("namespace", &self.namespace)
            .field("set_name", &self.set_name)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

impl<D: Connect> CacheBackend<D> {
    // == From Config ==
    /// Builds a backend from configuration.
    ///
    /// An injected `client` takes precedence over `config.hosts`.
    pub async fn from_config(config: &BackendConfig, client: Option<D>) -> Result<Self> {
        if client.is_none() && config.hosts.is_empty() {
            return Err(CacheError::Config(
                "must specify a client or hosts".to_string(),
            ));
        }
        let namespace = config
            .namespace
            .as_deref()
            .ok_or_else(|| CacheError::Config("namespace is required".to_string()))?;

        let client = match client {
            Some(client) => client,
            None => D::from_hosts(&config.hosts)?,
        };

        Self::new(
            client,
            namespace,
            config.set_name.clone(),
            config.default_timeout,
        )
        .await
    }
}

impl<D: StoreDriver> CacheBackend<D> {
    // == Constructor ==
    /// Validates the scope once, then connects `client` if it is not connected yet.
    ///
    /// # Arguments
    /// * `client` - Store driver handle, connected or connectable
    /// * `namespace` - At most 31 UTF-8 bytes
    /// * `set_name` - At most 63 UTF-8 bytes, `None` for the null set
    /// * `default_timeout` - Seconds used when a write gives no timeout, 0 = never expire
    pub async fn new(
        client: D,
        namespace: impl Into<String>,
        set_name: Option<String>,
        default_timeout: u32,
    ) -> Result<Self> {
        let namespace = namespace.into();
        validate_scope(&namespace, set_name.as_deref())?;

        if !client.is_connected() {
            client.connect().await?;
        }
        info!(
            "Cache backend ready: namespace={}, set={}, default_timeout={}s",
            namespace,
            set_name.as_deref().unwrap_or("<null>"),
            default_timeout
        );

        Ok(Self {
            client: RwLock::new(Some(Arc::new(client))),
            namespace,
            set_name,
            default_timeout,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set_name(&self) -> Option<&str> {
        self.set_name.as_deref()
    }

    pub fn default_timeout(&self) -> u32 {
        self.default_timeout
    }

    /// Returns true once [`close`](Self::close) has released the handle.
    pub async fn is_closed(&self) -> bool {
        self.client.read().await.is_none()
    }

    // == Get ==
    /// Looks up `key`. Missing records and missing values both yield `None`.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        let client = self.client().await?;
        let record = found("get", key, client.get(&self.record_key(key)).await)?;

        match record.and_then(|mut record| take_value(&mut record.bins)) {
            Some(value) => {
                debug!("Cache hit on key: {}", key);
                Ok(Some(value))
            }
            None => {
                debug!("Cache miss on key: {}", key);
                Ok(None)
            }
        }
    }

    /// Like [`get`](Self::get), deserializing the value into `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    // == Get Metadata ==
    /// TTL and generation of `key`, or `None` on a miss.
    pub async fn get_metadata(&self, key: &str) -> Result<Option<RecordMetadata>> {
        let client = self.client().await?;
        let outcome = client.exists(&self.record_key(key)).await;
        Ok(found("get_metadata", key, outcome)?.flatten())
    }

    // == Get Many ==
    /// Values for `keys` in one batch read, positionally aligned with the input.
    pub async fn get_many<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<Option<Value>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.client().await?;
        let record_keys: Vec<RecordKey> =
            keys.iter().map(|k| self.record_key(k.as_ref())).collect();

        let outcomes = match client.batch_get(&record_keys).await {
            Ok(outcomes) => outcomes,
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => {
                log_rejection("get_many", "*", &err);
                return Ok(vec![None; keys.len()]);
            }
        };
        outcomes
            .into_iter()
            .map(|outcome| match outcome {
                Ok(mut record) => Ok(take_value(&mut record.bins)),
                Err(err) if err.is_fatal() => Err(err.into()),
                Err(err) => {
                    debug!("Batch read skipped a key: {}", err);
                    Ok(None)
                }
            })
            .collect()
    }

    // == Get Dict ==
    /// Like [`get_many`](Self::get_many), keyed by the unique input keys.
    pub async fn get_dict<K: AsRef<str>>(
        &self,
        keys: &[K],
    ) -> Result<HashMap<String, Option<Value>>> {
        let values = self.get_many(keys).await?;
        Ok(keys
            .iter()
            .map(|k| k.as_ref().to_string())
            .zip(values)
            .collect())
    }

    // == Has ==
    /// Existence probe that does not read the value.
    pub async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get_metadata(key).await?.is_some())
    }

    // == Set ==
    /// Creates or overwrites `key`.
    ///
    /// `timeout`: `None` = default timeout, `Some(0)` = never expire, `Some(n)` = n seconds.
    /// Returns `false` when the store rejects the write.
    pub async fn set<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        timeout: Option<u32>,
    ) -> Result<bool> {
        self.put(key, value, timeout, RecordExistsAction::Upsert)
            .await
    }

    // == Add ==
    /// Like [`set`](Self::set) but returns `false` and leaves the value untouched when
    /// `key` already exists. Existence check and write are one store operation.
    pub async fn add<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        timeout: Option<u32>,
    ) -> Result<bool> {
        self.put(key, value, timeout, RecordExistsAction::CreateOnly)
            .await
    }

    // == Set Many ==
    /// Writes every entry in one batch with a shared timeout.
    ///
    /// Returns the keys that were written, in input order.
    pub async fn set_many<I, K, V>(&self, mapping: I, timeout: Option<u32>) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Serialize,
    {
        let entries = mapping
            .into_iter()
            .map(|(k, v)| -> Result<(String, Value)> {
                Ok((k.into(), serde_json::to_value(v)?))
            })
            .collect::<Result<Vec<(String, Value)>>>()?;
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let client = self.client().await?;
        let directives = self.directives(timeout, RecordExistsAction::Upsert);
        let records: Vec<(RecordKey, Bins)> = entries
            .iter()
            .map(|(k, v)| (self.record_key(k), value_bins(v.clone())))
            .collect();

        let outcomes = match client.batch_write(records, &directives).await {
            Ok(outcomes) => outcomes,
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => {
                log_rejection("set_many", "*", &err);
                return Ok(Vec::new());
            }
        };
        let mut written = Vec::with_capacity(entries.len());
        for ((key, _), outcome) in entries.into_iter().zip(outcomes) {
            if self.write_outcome("set_many", &key, outcome)? {
                written.push(key);
            }
        }
        Ok(written)
    }

    // == Delete ==
    /// Returns true iff `key` existed and was removed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let client = self.client().await?;
        let outcome = client.remove(&self.record_key(key)).await;
        self.write_outcome("delete", key, outcome)
    }

    // == Delete Many ==
    /// Removes `keys` in one batch; returns the keys that existed, in input order.
    pub async fn delete_many<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<String>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.client().await?;
        let record_keys: Vec<RecordKey> =
            keys.iter().map(|k| self.record_key(k.as_ref())).collect();

        let outcomes = match client.batch_remove(&record_keys).await {
            Ok(outcomes) => outcomes,
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => {
                log_rejection("delete_many", "*", &err);
                return Ok(Vec::new());
            }
        };
        let mut deleted = Vec::new();
        for (key, outcome) in keys.iter().zip(outcomes) {
            if self.write_outcome("delete_many", key.as_ref(), outcome)? {
                deleted.push(key.as_ref().to_string());
            }
        }
        Ok(deleted)
    }

    // == Inc ==
    /// Atomically adds `delta`; a missing key starts from 0.
    ///
    /// Returns the new value, or `None` when the store rejects the operation.
    pub async fn inc(&self, key: &str, delta: i64) -> Result<Option<i64>> {
        let client = self.client().await?;
        let directives = self.directives(None, RecordExistsAction::Upsert);

        match client
            .increment(&self.record_key(key), VALUE_BIN, delta, &directives)
            .await
        {
            Ok(record) => Ok(record.bins.get(VALUE_BIN).and_then(Value::as_i64)),
            Err(err) if err.is_fatal() => Err(err.into()),
            Err(err) => {
                log_rejection("inc", key, &err);
                Ok(None)
            }
        }
    }

    // == Dec ==
    pub async fn dec(&self, key: &str, delta: i64) -> Result<Option<i64>> {
        self.inc(key, delta.saturating_neg()).await
    }

    // == Clear ==
    /// Requests removal of every record in this backend's namespace/set.
    ///
    /// `true` means the store accepted the request. Removal is asynchronous: records
    /// may stay readable for a short while after this returns.
    pub async fn clear(&self) -> Result<bool> {
        let client = self.client().await?;
        match client
            .truncate(&self.namespace, self.set_name.as_deref())
            .await
        {
            Ok(()) => {
                info!(
                    "Clear requested for {}:{}",
                    self.namespace,
                    self.set_name.as_deref().unwrap_or("<null>")
                );
                Ok(true)
            }
            Err(err) if err.is_fatal() => Err(err.into()),
            Err(err) => {
                log_rejection("clear", "*", &err);
                Ok(false)
            }
        }
    }

    // == Close ==
    /// Releases the store connection.
    ///
    /// Returns true the first time it closes a connected handle, false afterwards or
    /// when the handle was never connected.
    pub async fn close(&self) -> Result<bool> {
        let taken = self.client.write().await.take();

        match taken {
            Some(client) if client.is_connected() => {
                debug!("Closing store client for namespace {}", self.namespace);
                client.close().await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // == Internals ==
    async fn client(&self) -> Result<Arc<D>> {
        self.client.read().await.clone().ok_or(CacheError::Closed)
    }

    fn record_key(&self, key: &str) -> RecordKey {
        RecordKey::new(self.namespace.clone(), self.set_name.clone(), key)
    }

    fn directives(&self, timeout: Option<u32>, exists: RecordExistsAction) -> WriteDirectives {
        normalize_timeout(timeout, self.default_timeout, exists)
    }

    async fn put<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        timeout: Option<u32>,
        exists: RecordExistsAction,
    ) -> Result<bool> {
        let bins = value_bins(serde_json::to_value(value)?);
        let client = self.client().await?;
        let directives = self.directives(timeout, exists);

        let outcome = client.put(&self.record_key(key), bins, &directives).await;
        self.write_outcome(op_name(exists), key, outcome)
    }

    /// Maps a write outcome to `true`/`false`, propagating fatal errors.
    fn write_outcome(&self, op: &str, key: &str, outcome: DriverResult<()>) -> Result<bool> {
        match outcome {
            Ok(()) => Ok(true),
            Err(err) if err.is_fatal() => Err(err.into()),
            Err(err) => {
                log_rejection(op, key, &err);
                Ok(false)
            }
        }
    }
}

fn op_name(exists: RecordExistsAction) -> &'static str {
    match exists {
        RecordExistsAction::Upsert => "set",
        RecordExistsAction::CreateOnly => "add",
    }
}

fn log_rejection(op: &str, key: &str, err: &DriverError) {
    match err {
        DriverError::Forbidden(msg) => error!(
            "Failed to set TTL on {} for key {}: store expiration is disabled ({})",
            op, key, msg
        ),
        DriverError::RecordNotFound | DriverError::RecordExists => {
            debug!("{} skipped for key {}: {}", op, key, err)
        }
        _ => error!("{} failed for key {}: {}", op, key, err),
    }
}

/// Turns a recognized read failure into `None` and propagates fatal ones.
fn found<T>(op: &str, key: &str, outcome: DriverResult<T>) -> Result<Option<T>> {
    match outcome {
        Ok(value) => Ok(Some(value)),
        Err(err) => match err.class() {
            ErrorClass::NotFound => Ok(None),
            ErrorClass::Rejected => {
                log_rejection(op, key, &err);
                Ok(None)
            }
            ErrorClass::Fatal => Err(err.into()),
        },
    }
}

fn value_bins(value: Value) -> Bins {
    Bins::from([(VALUE_BIN.to_string(), value)])
}

/// Takes the cached value out of `bins`; a null value counts as absent.
fn take_value(bins: &mut Bins) -> Option<Value> {
    bins.remove(VALUE_BIN).filter(|value| !value.is_null())
}
