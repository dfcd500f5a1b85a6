//! Stored Record Module
//!
//! A record as held by the in-memory store, with expiry and generation bookkeeping.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::driver::{Bins, Expiration, RecordMetadata, TTL_NEVER_EXPIRE};

// == Stored Record ==
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub bins: Bins,
    /// Write counter, starts at 1
    pub generation: u32,
    /// Last write timestamp (Unix milliseconds)
    pub last_update_ms: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoredRecord {
    // == Constructor ==
    /// Creates a first-generation record.
    pub fn new(bins: Bins, expiration: Expiration) -> Self {
        let now = current_timestamp_ms();
        Self {
            bins,
            generation: 1,
            last_update_ms: now,
            expires_at: expires_at(now, expiration),
        }
    }

    // == Overwrite ==
    /// Replaces all bins and bumps the generation.
    pub fn overwrite(&mut self, bins: Bins, expiration: Expiration) {
        self.bins = bins;
        self.touch_write(expiration);
    }

    /// Records a write: new expiry, new generation, new update time.
    pub fn touch_write(&mut self, expiration: Expiration) {
        let now = current_timestamp_ms();
        self.generation = self.generation.wrapping_add(1).max(1);
        self.last_update_ms = now;
        self.expires_at = expires_at(now, expiration);
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    /// Remaining TTL in whole seconds, rounded up; None if the record never expires.
    pub fn ttl_remaining(&self) -> Option<u32> {
        self.expires_at.map(|expires| {
            let remaining_ms = expires.saturating_sub(current_timestamp_ms());
            let secs = remaining_ms
                .div_ceil(1000)
                .min(u64::from(TTL_NEVER_EXPIRE - 1));
            u32::try_from(secs).unwrap_or(TTL_NEVER_EXPIRE - 1)
        })
    }

    pub fn metadata(&self) -> RecordMetadata {
        RecordMetadata {
            ttl: self.ttl_remaining().unwrap_or(TTL_NEVER_EXPIRE),
            generation: self.generation,
        }
    }
}

fn expires_at(now: u64, expiration: Expiration) -> Option<u64> {
    match expiration {
        Expiration::NeverExpire => None,
        Expiration::Seconds(secs) => Some(now + u64::from(secs) * 1000),
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
