//! Timeout Normalization
//!
//! Turns a caller supplied timeout into the directives a write sends to the store.

use crate::driver::{Expiration, RecordExistsAction, WriteDirectives, WritePolicy};

/// Normalizes `timeout` for a write.
///
/// | timeout | result |
/// |---|---|
/// | `None` | `default_timeout` is used instead |
/// | `Some(0)` | never expires, no policy TTL |
/// | `Some(n)` | expires in `n` seconds, policy TTL `n` so overwrites keep it |
///
/// Expiration and policy TTL are always derived together.
pub fn normalize_timeout(
    timeout: Option<u32>,
    default_timeout: u32,
    exists: RecordExistsAction,
) -> WriteDirectives {
    let (expiration, ttl) = match timeout.unwrap_or(default_timeout) {
        0 => (Expiration::NeverExpire, None),
        secs => (Expiration::Seconds(secs), Some(secs)),
    };

    WriteDirectives {
        expiration,
        policy: WritePolicy { exists, ttl },
    }
}
