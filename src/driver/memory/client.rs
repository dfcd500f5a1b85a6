//! Memory Store Client
//!
//! Connection handle over a shared [`RecordStore`]. Cloning the handle shares the store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::stats::StoreStats;
use super::store::RecordStore;
use crate::config::Host;
use crate::driver::{
    Bins, Connect, DriverError, DriverResult, Record, RecordKey, RecordMetadata, StoreDriver,
    WriteDirectives,
};
use crate::tasks::spawn_sweeper;

// == Memory Store Config ==
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryStoreConfig {
    /// Maximum number of records before LRU eviction kicks in
    pub max_records: usize,
    /// Interval between expiration/truncate sweeps
    pub sweep_interval_ms: u64,
    /// When false, writes with a finite TTL are rejected as forbidden
    pub expiration_enabled: bool,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_records: 10_000,
            sweep_interval_ms: 100,
            expiration_enabled: true,
        }
    }
}

// == Memory Store ==
#[derive(Debug, Clone)]
pub struct MemoryStore {
    store: Arc<RwLock<RecordStore>>,
    connected: Arc<AtomicBool>,
    sweeper: Arc<Mutex<Option<JoinHandle<()>>>>,
    config: MemoryStoreConfig,
}

impl MemoryStore {
    pub fn new(config: MemoryStoreConfig) -> Self {
        Self {
            store: Arc::new(RwLock::new(RecordStore::new(
                config.max_records,
                config.expiration_enabled,
            ))),
            connected: Arc::new(AtomicBool::new(false)),
            sweeper: Arc::new(Mutex::new(None)),
            config,
        }
    }

    pub fn config(&self) -> &MemoryStoreConfig {
        &self.config
    }

    /// Snapshot of the store statistics.
    pub async fn stats(&self) -> StoreStats {
        self.store.read().await.stats()
    }

    fn ensure_connected(&self) -> DriverResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(DriverError::NotConnected)
        }
    }

    fn sweeper_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        // A poisoned slot still holds a valid handle
        self.sweeper
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryStoreConfig::default())
    }
}

impl Connect for MemoryStore {
    fn from_hosts(hosts: &[Host]) -> DriverResult<Self> {
        if hosts.is_empty() {
            return Err(DriverError::Connection("no hosts given".to_string()));
        }
        debug!("Memory store seeded with hosts: {:?}", hosts);
        Ok(Self::default())
    }
}

#[async_trait]
impl StoreDriver for MemoryStore {
    async fn connect(&self) -> DriverResult<()> {
        if self.connected.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let interval = Duration::from_millis(self.config.sweep_interval_ms.max(1));
        *self.sweeper_slot() = Some(spawn_sweeper(self.store.clone(), interval));
        info!("Memory store connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> DriverResult<()> {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(handle) = self.sweeper_slot().take() {
            handle.abort();
        }
        info!("Memory store closed");
        Ok(())
    }

    async fn get(&self, key: &RecordKey) -> DriverResult<Record> {
        self.ensure_connected()?;
        self.store.write().await.get(key)
    }

    async fn exists(&self, key: &RecordKey) -> DriverResult<Option<RecordMetadata>> {
        self.ensure_connected()?;
        Ok(self.store.write().await.exists(key))
    }

    async fn put(
        &self,
        key: &RecordKey,
        bins: Bins,
        directives: &WriteDirectives,
    ) -> DriverResult<()> {
        self.ensure_connected()?;
        self.store.write().await.put(key, bins, directives)
    }

    async fn remove(&self, key: &RecordKey) -> DriverResult<()> {
        self.ensure_connected()?;
        self.store.write().await.remove(key)
    }

    async fn increment(
        &self,
        key: &RecordKey,
        bin: &str,
        delta: i64,
        directives: &WriteDirectives,
    ) -> DriverResult<Record> {
        self.ensure_connected()?;
        self.store
            .write()
            .await
            .increment(key, bin, delta, directives)
    }

    async fn batch_get(&self, keys: &[RecordKey]) -> DriverResult<Vec<DriverResult<Record>>> {
        self.ensure_connected()?;
        let mut store = self.store.write().await;
        Ok(keys.iter().map(|key| store.get(key)).collect())
    }

    async fn batch_remove(&self, keys: &[RecordKey]) -> DriverResult<Vec<DriverResult<()>>> {
        self.ensure_connected()?;
        let mut store = self.store.write().await;
        Ok(keys.iter().map(|key| store.remove(key)).collect())
    }

    async fn batch_write(
        &self,
        records: Vec<(RecordKey, Bins)>,
        directives: &WriteDirectives,
    ) -> DriverResult<Vec<DriverResult<()>>> {
        self.ensure_connected()?;
        let mut store = self.store.write().await;
        Ok(records
            .into_iter()
            .map(|(key, bins)| store.put(&key, bins, directives))
            .collect())
    }

    async fn truncate(&self, namespace: &str, set_name: Option<&str>) -> DriverResult<()> {
        self.ensure_connected()?;
        self.store
            .write()
            .await
            .request_truncate(namespace, set_name);
        debug!(
            "Truncate requested for {}:{}",
            namespace,
            set_name.unwrap_or("")
        );
        Ok(())
    }
}
