//! Record Store Module
//!
//! Synchronous storage engine behind [`MemoryStore`](super::MemoryStore): records keyed
//! by namespace/set/key with TTL expiration, LRU capacity eviction and deferred truncation.

use std::collections::HashMap;

use serde_json::Value;

use super::entry::{current_timestamp_ms, StoredRecord};
use super::lru::LruTracker;
use super::stats::StoreStats;
use crate::driver::{
    Bins, DriverError, DriverResult, Expiration, Record, RecordExistsAction, RecordKey,
    RecordMetadata, WriteDirectives,
};

/// Server error code reported when the store is full and nothing can be evicted
pub const ERR_STORE_FULL: i32 = 8;

/// Server error code reported when an increment overflows
pub const ERR_OVERFLOW: i32 = 26;

// == Truncate Request ==
/// Pending removal of a scope, applied by the next sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncateRequest {
    pub namespace: String,
    pub set_name: Option<String>,
    /// Records last written at or before this time (Unix milliseconds) are removed
    pub before_ms: u64,
}

/// Records removed by one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub truncated: usize,
}

// == Record Store ==
#[derive(Debug)]
pub struct RecordStore {
    records: HashMap<RecordKey, StoredRecord>,
    lru: LruTracker<RecordKey>,
    stats: StoreStats,
    pending_truncates: Vec<TruncateRequest>,
    max_records: usize,
    /// When false, writes carrying a finite TTL are forbidden
    expiration_enabled: bool,
}

impl RecordStore {
    pub fn new(max_records: usize, expiration_enabled: bool) -> Self {
        Self {
            records: HashMap::new(),
            lru: LruTracker::new(),
            stats: StoreStats::new(),
            pending_truncates: Vec::new(),
            max_records,
            expiration_enabled,
        }
    }

    // == Get ==
    /// Reads a live record. Expired records are dropped and reported as missing.
    pub fn get(&mut self, key: &RecordKey) -> DriverResult<Record> {
        let found = self.live_record(key).map(|stored| Record {
            key: key.clone(),
            metadata: stored.metadata(),
            bins: stored.bins.clone(),
        });
        self.stats.record_read(found.is_some());

        match found {
            Some(record) => {
                self.lru.touch(key);
                Ok(record)
            }
            None => Err(DriverError::RecordNotFound),
        }
    }

    // == Exists ==
    /// Metadata of a live record, without touching its bins.
    pub fn exists(&mut self, key: &RecordKey) -> Option<RecordMetadata> {
        self.live_record(key).map(|stored| stored.metadata())
    }

    // == Put ==
    pub fn put(
        &mut self,
        key: &RecordKey,
        bins: Bins,
        directives: &WriteDirectives,
    ) -> DriverResult<()> {
        let expiration = self.applied_expiration(directives)?;

        if let Some(stored) = self.live_record(key) {
            if directives.policy.exists == RecordExistsAction::CreateOnly {
                return Err(DriverError::RecordExists);
            }
            stored.overwrite(bins, expiration);
            self.lru.touch(key);
            return Ok(());
        }

        self.insert(key, StoredRecord::new(bins, expiration))
    }

    // == Remove ==
    pub fn remove(&mut self, key: &RecordKey) -> DriverResult<()> {
        if self.live_record(key).is_none() {
            return Err(DriverError::RecordNotFound);
        }
        self.drop_record(key);
        Ok(())
    }

    // == Increment ==
    /// Adds `delta` to an integer bin, creating the record or bin as 0 first.
    pub fn increment(
        &mut self,
        key: &RecordKey,
        bin: &str,
        delta: i64,
        directives: &WriteDirectives,
    ) -> DriverResult<Record> {
        let expiration = self.applied_expiration(directives)?;

        if let Some(stored) = self.live_record(key) {
            let current = match stored.bins.get(bin) {
                None => 0,
                Some(value) => value.as_i64().ok_or_else(|| {
                    DriverError::BinIncompatibleType(format!("bin '{bin}' holds {value}"))
                })?,
            };
            let next = current
                .checked_add(delta)
                .ok_or_else(|| DriverError::ServerError {
                    code: ERR_OVERFLOW,
                    message: format!("increment of bin '{bin}' overflows"),
                })?;

            stored.bins.insert(bin.to_string(), Value::from(next));
            stored.touch_write(expiration);
            let record = Record {
                key: key.clone(),
                metadata: stored.metadata(),
                bins: stored.bins.clone(),
            };
            self.lru.touch(key);
            return Ok(record);
        }

        let bins = Bins::from([(bin.to_string(), Value::from(delta))]);
        let stored = StoredRecord::new(bins, expiration);
        let record = Record {
            key: key.clone(),
            metadata: stored.metadata(),
            bins: stored.bins.clone(),
        };
        self.insert(key, stored)?;
        Ok(record)
    }

    // == Truncate ==
    /// Queues removal of every record in the scope written up to now.
    pub fn request_truncate(&mut self, namespace: &str, set_name: Option<&str>) {
        self.pending_truncates.push(TruncateRequest {
            namespace: namespace.to_string(),
            set_name: set_name.map(str::to_string),
            before_ms: current_timestamp_ms(),
        });
    }

    pub fn pending_truncates(&self) -> usize {
        self.pending_truncates.len()
    }

    // == Sweep ==
    /// Applies pending truncate requests, then removes expired records.
    pub fn sweep(&mut self) -> SweepReport {
        let mut report = SweepReport::default();

        for request in std::mem::take(&mut self.pending_truncates) {
            let doomed: Vec<RecordKey> = self
                .records
                .iter()
                .filter(|(key, stored)| {
                    key.in_scope(&request.namespace, request.set_name.as_deref())
                        && stored.last_update_ms <= request.before_ms
                })
                .map(|(key, _)| key.clone())
                .collect();

            report.truncated += doomed.len();
            for key in doomed {
                self.drop_record(&key);
            }
        }

        let expired: Vec<RecordKey> = self
            .records
            .iter()
            .filter(|(_, stored)| stored.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        report.expired = expired.len();
        for key in expired {
            self.drop_record(&key);
        }

        self.stats.record_truncated(report.truncated);
        self.stats.record_expired(report.expired);
        report
    }

    // == Stats ==
    pub fn stats(&self) -> StoreStats {
        let mut stats = self.stats.clone();
        stats.set_total_records(self.records.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // == Internals ==
    fn applied_expiration(&self, directives: &WriteDirectives) -> DriverResult<Expiration> {
        let expiration = match directives.policy.ttl {
            Some(ttl) if ttl > 0 => Expiration::Seconds(ttl),
            _ => directives.expiration,
        };

        if let Expiration::Seconds(ttl) = expiration {
            if !self.expiration_enabled {
                return Err(DriverError::Forbidden(format!(
                    "ttl {ttl} rejected: record expiration is disabled"
                )));
            }
        }
        Ok(expiration)
    }

    fn live_record(&mut self, key: &RecordKey) -> Option<&mut StoredRecord> {
        if self.records.get(key).is_some_and(StoredRecord::is_expired) {
            self.drop_record(key);
            return None;
        }
        self.records.get_mut(key)
    }

    fn insert(&mut self, key: &RecordKey, stored: StoredRecord) -> DriverResult<()> {
        if self.records.len() >= self.max_records {
            match self.lru.evict_oldest() {
                Some(evicted) => {
                    self.records.remove(&evicted);
                    self.stats.record_eviction();
                }
                None => {
                    return Err(DriverError::ServerError {
                        code: ERR_STORE_FULL,
                        message: "store is full and eviction failed".to_string(),
                    })
                }
            }
        }

        self.records.insert(key.clone(), stored);
        self.lru.touch(key);
        Ok(())
    }

    fn drop_record(&mut self, key: &RecordKey) {
        self.records.remove(key);
        self.lru.remove(key);
    }
}
