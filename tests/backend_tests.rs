//! Integration Tests for the Cache Backend
//!
//! Exercises the backend contract end to end against the memory store, plus a wrapping
//! driver that counts calls and injects store failures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kv_cache::config::Host;
use kv_cache::driver::{
    Bins, Connect, DriverError, DriverResult, Record, RecordKey, RecordMetadata, StoreDriver,
    WriteDirectives, TTL_NEVER_EXPIRE,
};
use kv_cache::{BackendConfig, CacheBackend, CacheError, MemoryStore, MemoryStoreConfig};
use serde_json::json;

// == Helper Functions ==

fn fast_sweep_store() -> MemoryStore {
    MemoryStore::new(MemoryStoreConfig {
        sweep_interval_ms: 20,
        ..MemoryStoreConfig::default()
    })
}

async fn create_backend() -> CacheBackend<MemoryStore> {
    CacheBackend::new(fast_sweep_store(), "cachetest", Some("testset".to_string()), 300)
        .await
        .unwrap()
}

/// Driver wrapper recording which capabilities were called.
#[derive(Clone, Default)]
struct RecordingDriver {
    inner: MemoryStore,
    calls: Arc<Mutex<Vec<&'static str>>>,
    failure: Arc<Mutex<Option<DriverError>>>,
    closes: Arc<AtomicUsize>,
}

impl RecordingDriver {
    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn fail_with(&self, error: DriverError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    fn enter(&self, op: &'static str) -> DriverResult<()> {
        self.calls.lock().unwrap().push(op);
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Connect for RecordingDriver {
    fn from_hosts(hosts: &[Host]) -> DriverResult<Self> {
        Ok(Self {
            inner: MemoryStore::from_hosts(hosts)?,
            ..Self::default()
        })
    }
}

#[async_trait]
impl StoreDriver for RecordingDriver {
    async fn connect(&self) -> DriverResult<()> {
        self.inner.connect().await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    async fn close(&self) -> DriverResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }

    async fn get(&self, key: &RecordKey) -> DriverResult<Record> {
        self.enter("get")?;
        self.inner.get(key).await
    }

    async fn exists(&self, key: &RecordKey) -> DriverResult<Option<RecordMetadata>> {
        self.enter("exists")?;
        self.inner.exists(key).await
    }

    async fn put(
        &self,
        key: &RecordKey,
        bins: Bins,
        directives: &WriteDirectives,
    ) -> DriverResult<()> {
        self.enter("put")?;
        self.inner.put(key, bins, directives).await
    }

    async fn remove(&self, key: &RecordKey) -> DriverResult<()> {
        self.enter("remove")?;
        self.inner.remove(key).await
    }

    async fn increment(
        &self,
        key: &RecordKey,
        bin: &str,
        delta: i64,
        directives: &WriteDirectives,
    ) -> DriverResult<Record> {
        self.enter("increment")?;
        self.inner.increment(key, bin, delta, directives).await
    }

    async fn batch_get(&self, keys: &[RecordKey]) -> DriverResult<Vec<DriverResult<Record>>> {
        self.enter("batch_get")?;
        self.inner.batch_get(keys).await
    }

    async fn batch_remove(&self, keys: &[RecordKey]) -> DriverResult<Vec<DriverResult<()>>> {
        self.enter("batch_remove")?;
        self.inner.batch_remove(keys).await
    }

    async fn batch_write(
        &self,
        records: Vec<(RecordKey, Bins)>,
        directives: &WriteDirectives,
    ) -> DriverResult<Vec<DriverResult<()>>> {
        self.enter("batch_write")?;
        self.inner.batch_write(records, directives).await
    }

    async fn truncate(&self, namespace: &str, set_name: Option<&str>) -> DriverResult<()> {
        self.enter("truncate")?;
        self.inner.truncate(namespace, set_name).await
    }
}

async fn recording_backend() -> (RecordingDriver, CacheBackend<RecordingDriver>) {
    let driver = RecordingDriver::default();
    let cache = CacheBackend::new(driver.clone(), "cachetest", None, 300)
        .await
        .unwrap();
    (driver, cache)
}

// == Basic Operations ==

#[tokio::test]
async fn test_get_missing_key() {
    let cache = create_backend().await;

    assert_eq!(cache.get("absent").await.unwrap(), None);
    assert!(!cache.has("absent").await.unwrap());
    assert!(cache.get_metadata("absent").await.unwrap().is_none());
}

#[tokio::test]
async fn test_set_then_get() {
    let cache = create_backend().await;

    assert!(cache.set("k1", "v1", None).await.unwrap());
    assert_eq!(cache.get("k1").await.unwrap(), Some(json!("v1")));
    assert!(cache.has("k1").await.unwrap());

    assert!(cache.set("k1", &json!({"a": 1}), None).await.unwrap());
    assert_eq!(cache.get("k1").await.unwrap(), Some(json!({"a": 1})));
    assert_eq!(cache.get_metadata("k1").await.unwrap().unwrap().generation, 2);
}

#[tokio::test]
async fn test_add_does_not_overwrite() {
    let cache = create_backend().await;

    assert!(cache.add("k", "v1", None).await.unwrap());
    assert!(!cache.add("k", "v2", None).await.unwrap());
    assert_eq!(cache.get("k").await.unwrap(), Some(json!("v1")));
}

#[tokio::test]
async fn test_delete() {
    let cache = create_backend().await;

    cache.set("k", "v", None).await.unwrap();
    assert!(cache.delete("k").await.unwrap());
    assert!(!cache.delete("k").await.unwrap());
    assert_eq!(cache.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn test_inc_and_dec() {
    let cache = create_backend().await;

    assert_eq!(cache.inc("counter", 5).await.unwrap(), Some(5));
    assert_eq!(cache.inc("counter", 3).await.unwrap(), Some(8));
    assert_eq!(cache.dec("counter", 10).await.unwrap(), Some(-2));
    assert_eq!(cache.dec("other", 4).await.unwrap(), Some(-4));
    assert_eq!(cache.get("counter").await.unwrap(), Some(json!(-2)));
}

#[tokio::test]
async fn test_inc_is_atomic_under_concurrency() {
    let cache = Arc::new(create_backend().await);

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.inc("shared", 1).await.unwrap() })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(cache.get("shared").await.unwrap(), Some(json!(20)));
}

#[tokio::test]
async fn test_concurrent_add_has_single_winner() {
    let cache = Arc::new(create_backend().await);

    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.add("lock", &i, None).await.unwrap() })
        })
        .collect();

    let mut winners = 0;
    for task in tasks {
        if task.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

// == Timeouts ==

#[tokio::test]
async fn test_timeout_zero_never_expires() {
    let cache = create_backend().await;

    cache.set("k2", "v2", Some(0)).await.unwrap();
    let metadata = cache.get_metadata("k2").await.unwrap().unwrap();
    assert_eq!(metadata.ttl, TTL_NEVER_EXPIRE);
    assert_eq!(metadata.ttl, (-1i64 & 0xffff_ffff) as u32);
}

#[tokio::test]
async fn test_timeout_expires() {
    let cache = create_backend().await;

    cache.set("k1", "v1", Some(1)).await.unwrap();
    assert_eq!(cache.get("k1").await.unwrap(), Some(json!("v1")));
    assert_eq!(cache.get_metadata("k1").await.unwrap().unwrap().ttl, 1);

    tokio::time::sleep(Duration::from_millis(2000)).await;

    assert_eq!(cache.get("k1").await.unwrap(), None);
    assert!(!cache.has("k1").await.unwrap());
}

#[tokio::test]
async fn test_zero_default_timeout_never_expires() {
    let cache = CacheBackend::new(MemoryStore::default(), "cachetest", None, 0)
        .await
        .unwrap();

    cache.set("k", "v", None).await.unwrap();
    assert!(cache.get_metadata("k").await.unwrap().unwrap().never_expires());
}

#[tokio::test]
async fn test_ttl_rejected_when_store_expiration_disabled() {
    let store = MemoryStore::new(MemoryStoreConfig {
        expiration_enabled: false,
        ..MemoryStoreConfig::default()
    });
    let cache = CacheBackend::new(store, "cachetest", None, 300).await.unwrap();

    assert!(!cache.set("k", "v", Some(60)).await.unwrap());
    assert_eq!(cache.get("k").await.unwrap(), None);
    assert!(cache.set_many(vec![("a", 1), ("b", 2)], None).await.unwrap().is_empty());
    assert_eq!(cache.inc("n", 1).await.unwrap(), None);
    assert!(cache.set("k", "v", Some(0)).await.unwrap());
}

// == Batches ==

#[tokio::test]
async fn test_get_many_alignment() {
    let cache = create_backend().await;

    cache.set("k1", "v1", None).await.unwrap();
    cache.set("k2", "v2", None).await.unwrap();

    let values = cache.get_many(&["k1", "k2", "absent", "k1"]).await.unwrap();
    assert_eq!(
        values,
        vec![Some(json!("v1")), Some(json!("v2")), None, Some(json!("v1"))]
    );
}

#[tokio::test]
async fn test_batches_use_single_round_trip() {
    let (driver, cache) = recording_backend().await;

    cache
        .set_many(vec![("a", 1), ("b", 2), ("c", 3)], None)
        .await
        .unwrap();
    cache.get_many(&["a", "b", "c", "d"]).await.unwrap();
    cache.get_dict(&["a", "b"]).await.unwrap();
    cache.delete_many(&["a", "b", "zzz"]).await.unwrap();

    assert_eq!(
        driver.calls(),
        vec!["batch_write", "batch_get", "batch_get", "batch_remove"]
    );
}

#[tokio::test]
async fn test_has_does_not_read_value() {
    let (driver, cache) = recording_backend().await;

    cache.set("k", "v", None).await.unwrap();
    assert!(cache.has("k").await.unwrap());

    assert_eq!(driver.calls(), vec!["put", "exists"]);
}

#[tokio::test]
async fn test_add_is_single_store_call() {
    let (driver, cache) = recording_backend().await;

    cache.add("k", "v", None).await.unwrap();
    cache.add("k", "v", None).await.unwrap();
    cache.inc("n", 1).await.unwrap();
    cache.delete("k").await.unwrap();

    assert_eq!(driver.calls(), vec!["put", "put", "increment", "remove"]);
}

#[tokio::test]
async fn test_set_many_returns_written_keys() {
    let cache = create_backend().await;

    let written = cache
        .set_many(vec![("x", json!(1)), ("y", json!("two"))], Some(0))
        .await
        .unwrap();
    assert_eq!(written, vec!["x".to_string(), "y".to_string()]);
    assert!(cache.get_metadata("y").await.unwrap().unwrap().never_expires());
}

#[tokio::test]
async fn test_delete_many_omits_missing() {
    let cache = create_backend().await;

    cache.set("k1", "v", None).await.unwrap();
    cache.set("k2", "v", None).await.unwrap();

    let deleted = cache.delete_many(&["k1", "k2", "missing"]).await.unwrap();
    assert_eq!(deleted, vec!["k1".to_string(), "k2".to_string()]);
}

// == Clear ==

#[tokio::test]
async fn test_clear_is_scoped_and_eventually_visible() {
    let store = fast_sweep_store();
    let cache = CacheBackend::new(store.clone(), "cachetest", Some("a".to_string()), 300)
        .await
        .unwrap();
    let neighbour = CacheBackend::new(store.clone(), "cachetest", Some("b".to_string()), 300)
        .await
        .unwrap();

    cache.set("k", "v", None).await.unwrap();
    neighbour.set("k", "other", None).await.unwrap();

    assert!(cache.clear().await.unwrap());

    // Removal is asynchronous: poll for a bounded time
    let mut cleared = false;
    for _ in 0..50 {
        if cache.get("k").await.unwrap().is_none() {
            cleared = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(cleared, "clear should take effect after a bounded wait");
    assert_eq!(neighbour.get("k").await.unwrap(), Some(json!("other")));
    assert_eq!(store.stats().await.truncated, 1);
}

// == Close ==

#[tokio::test]
async fn test_close_twice() {
    let (driver, cache) = recording_backend().await;

    assert!(cache.close().await.unwrap());
    assert!(!cache.close().await.unwrap());
    assert_eq!(driver.closes.load(Ordering::SeqCst), 1);
    assert!(!driver.is_connected());
}

#[tokio::test]
async fn test_operations_after_close_fail_cleanly() {
    let cache = create_backend().await;
    cache.close().await.unwrap();

    assert!(matches!(cache.get("k").await, Err(CacheError::Closed)));
    assert!(matches!(cache.inc("k", 1).await, Err(CacheError::Closed)));
    assert!(matches!(cache.clear().await, Err(CacheError::Closed)));
    assert!(matches!(
        cache.delete_many(&["k"]).await,
        Err(CacheError::Closed)
    ));
}

#[tokio::test]
async fn test_close_with_externally_closed_client() {
    let store = MemoryStore::default();
    let cache = CacheBackend::new(store.clone(), "cachetest", None, 300)
        .await
        .unwrap();

    store.close().await.unwrap();
    assert!(!cache.close().await.unwrap());
}

// == Error Propagation ==

#[tokio::test]
async fn test_unrecognized_errors_propagate() {
    let (driver, cache) = recording_backend().await;
    driver.fail_with(DriverError::Connection("node unreachable".to_string()));

    assert!(matches!(
        cache.get("k").await,
        Err(CacheError::Store(DriverError::Connection(_)))
    ));
    assert!(matches!(cache.set("k", "v", None).await, Err(CacheError::Store(_))));
    assert!(matches!(cache.has("k").await, Err(CacheError::Store(_))));
    assert!(matches!(cache.inc("k", 1).await, Err(CacheError::Store(_))));
    assert!(matches!(cache.clear().await, Err(CacheError::Store(_))));
    assert!(matches!(
        cache.get_many(&["k"]).await,
        Err(CacheError::Store(_))
    ));
}

#[tokio::test]
async fn test_recognized_errors_become_results() {
    let (driver, cache) = recording_backend().await;
    driver.fail_with(DriverError::ServerError {
        code: 4,
        message: "parameter error".to_string(),
    });

    assert!(!cache.set("k", "v", None).await.unwrap());
    assert!(!cache.add("k", "v", None).await.unwrap());
    assert!(!cache.delete("k").await.unwrap());
    assert_eq!(cache.inc("k", 1).await.unwrap(), None);
    assert!(!cache.clear().await.unwrap());

    assert_eq!(cache.get("k").await.unwrap(), None);
    assert!(cache.get_metadata("k").await.unwrap().is_none());
    assert!(!cache.has("k").await.unwrap());
    assert_eq!(
        cache.get_many(&["a", "b", "a"]).await.unwrap(),
        vec![None, None, None]
    );
    assert!(cache
        .set_many(vec![("a", 1), ("b", 2)], None)
        .await
        .unwrap()
        .is_empty());
    assert!(cache.delete_many(&["a", "b"]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ttl_policy_rejection_is_consistent_across_writes() {
    let (driver, cache) = recording_backend().await;
    driver.fail_with(DriverError::Forbidden("nsup disabled".to_string()));

    assert!(!cache.set("k", "v", Some(10)).await.unwrap());
    assert!(cache
        .set_many(vec![("a", 1), ("b", 2)], Some(10))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(cache.inc("n", 1).await.unwrap(), None);
}

#[tokio::test]
async fn test_operations_on_disconnected_store_propagate() {
    let store = MemoryStore::default();
    let cache = CacheBackend::new(store.clone(), "cachetest", None, 300)
        .await
        .unwrap();
    store.close().await.unwrap();

    assert!(matches!(
        cache.get("k").await,
        Err(CacheError::Store(DriverError::NotConnected))
    ));
}

// == Construction ==

#[tokio::test]
async fn test_namespace_length_boundary() {
    let ok = CacheBackend::new(MemoryStore::default(), "n".repeat(31), None, 300).await;
    assert!(ok.is_ok());

    let too_long = CacheBackend::new(MemoryStore::default(), "n".repeat(32), None, 300).await;
    assert!(matches!(too_long, Err(CacheError::Config(_))));
}

#[tokio::test]
async fn test_set_name_length_boundary() {
    let ok = CacheBackend::new(MemoryStore::default(), "ns", Some("s".repeat(63)), 300).await;
    assert!(ok.is_ok());

    let too_long =
        CacheBackend::new(MemoryStore::default(), "ns", Some("s".repeat(64)), 300).await;
    assert!(matches!(too_long, Err(CacheError::Config(_))));
}

#[tokio::test]
async fn test_from_config_requires_connection_source() {
    let config = BackendConfig {
        namespace: Some("cache".to_string()),
        ..BackendConfig::default()
    };

    let result = CacheBackend::<MemoryStore>::from_config(&config, None).await;
    assert!(matches!(result, Err(CacheError::Config(_))));
}

#[tokio::test]
async fn test_from_config_requires_namespace() {
    let config = BackendConfig {
        hosts: vec!["127.0.0.1:3000".parse().unwrap()],
        ..BackendConfig::default()
    };

    let result = CacheBackend::<MemoryStore>::from_config(&config, None).await;
    assert!(matches!(result, Err(CacheError::Config(_))));
}

#[tokio::test]
async fn test_from_config_with_client_requires_namespace() {
    let store = MemoryStore::default();

    let result = CacheBackend::from_config(&BackendConfig::default(), Some(store.clone())).await;
    assert!(matches!(result, Err(CacheError::Config(_))));
    assert!(!store.is_connected());
}

#[tokio::test]
async fn test_from_config_with_hosts() {
    let config = BackendConfig {
        hosts: vec!["127.0.0.1:3000".parse().unwrap()],
        namespace: Some("cache".to_string()),
        set_name: Some("web".to_string()),
        default_timeout: 60,
    };

    let cache = CacheBackend::<RecordingDriver>::from_config(&config, None)
        .await
        .unwrap();
    assert_eq!(cache.namespace(), "cache");
    assert_eq!(cache.set_name(), Some("web"));
    assert_eq!(cache.default_timeout(), 60);

    cache.set("k", "v", None).await.unwrap();
    assert_eq!(cache.get_metadata("k").await.unwrap().unwrap().ttl, 60);
}

#[tokio::test]
async fn test_from_config_client_takes_precedence() {
    let config = BackendConfig {
        hosts: vec!["127.0.0.1:3000".parse().unwrap()],
        namespace: Some("cache".to_string()),
        ..BackendConfig::default()
    };
    let driver = RecordingDriver::default();

    let cache = CacheBackend::from_config(&config, Some(driver.clone()))
        .await
        .unwrap();
    cache.set("k", "v", None).await.unwrap();

    assert_eq!(driver.calls(), vec!["put"]);
}
