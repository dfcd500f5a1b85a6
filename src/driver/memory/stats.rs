//! Store Statistics Module
//!
//! Read and removal counters for the memory store.

use serde::Serialize;

// == Store Stats ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    /// Reads that found a live record
    pub hits: u64,
    /// Reads that found nothing (missing or expired)
    pub misses: u64,
    /// Records evicted by the capacity bound
    pub evictions: u64,
    /// Records removed by the expiration sweep
    pub expired: u64,
    /// Records removed by truncate requests
    pub truncated: u64,
    pub total_records: usize,
}

impl StoreStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if nothing was read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_read(&mut self, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expired(&mut self, count: usize) {
        self.expired += count as u64;
    }

    pub fn record_truncated(&mut self, count: usize) {
        self.truncated += count as u64;
    }

    pub fn set_total_records(&mut self, count: usize) {
        self.total_records = count;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_no_reads() {
        let stats = StoreStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = StoreStats::new();
        stats.record_read(true);
        stats.record_read(false);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_removal_counters() {
        let mut stats = StoreStats::new();
        stats.record_eviction();
        stats.record_expired(3);
        stats.record_truncated(2);
        stats.record_truncated(1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.expired, 3);
        assert_eq!(stats.truncated, 3);
    }
}
