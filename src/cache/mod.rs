//! Cache Module
//!
//! Cache backend contract over a [`StoreDriver`](crate::driver::StoreDriver): TTL based
//! expiration, batch operations and atomic counters.

mod backend;
mod lifecycle;
mod timeout;


pub use backend::CacheBackend;
pub use lifecycle::{close_on, close_on_shutdown, run_scoped, shutdown_signal};
pub use timeout::normalize_timeout;

use crate::error::{CacheError, Result};

// == Public Constants ==
/// Maximum namespace length in UTF-8 bytes
pub const MAX_NAMESPACE_LEN: usize = 31;

/// Maximum set name length in UTF-8 bytes
pub const MAX_SET_NAME_LEN: usize = 63;

/// Default timeout in seconds when none is configured
pub const DEFAULT_TIMEOUT: u32 = 300;

/// Bin that holds the cached value
pub const VALUE_BIN: &str = "v";

/// Checks the namespace/set scope a backend will address.
pub fn validate_scope(namespace: &str, set_name: Option<&str>) -> Result<()> {
    if namespace.is_empty() {
        return Err(CacheError::Config("namespace is required".to_string()));
    }
    if namespace.len() > MAX_NAMESPACE_LEN {
        return Err(CacheError::Config(format!(
            "namespace must be at most {MAX_NAMESPACE_LEN} bytes, got {}",
            namespace.len()
        )));
    }
    if let Some(set_name) = set_name {
        if set_name.len() > MAX_SET_NAME_LEN {
            return Err(CacheError::Config(format!(
                "set name must be at most {MAX_SET_NAME_LEN} bytes, got {}",
                set_name.len()
            )));
        }
    }
    Ok(())
}
