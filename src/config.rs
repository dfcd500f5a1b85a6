//! Configuration Module
//!
//! Loads backend, store and server settings from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_TIMEOUT;
use crate::driver::MemoryStoreConfig;
use crate::error::CacheError;

// == Host ==
/// Store endpoint given as `address:port[:tls_name]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub address: String,
    pub port: u16,
    pub tls_name: Option<String>,
}

impl FromStr for Host {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            CacheError::Config(format!(
                "invalid host '{s}', expected address:port[:tls_name]"
            ))
        };

        let mut parts = s.trim().splitn(3, ':');
        let address = parts.next().filter(|a| !a.is_empty()).ok_or_else(invalid)?;
        let port = parts
            .next()
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(invalid)?;
        let tls_name = parts.next().filter(|t| !t.is_empty()).map(str::to_string);

        Ok(Self {
            address: address.to_string(),
            port,
            tls_name,
        })
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)?;
        if let Some(tls_name) = &self.tls_name {
            write!(f, ":{tls_name}")?;
        }
        Ok(())
    }
}

/// Parses a comma separated host list, skipping empty items.
pub fn parse_hosts(value: &str) -> Result<Vec<Host>, CacheError> {
    value
        .split(',')
        .filter(|item| !item.trim().is_empty())
        .map(str::parse::<Host>)
        .collect()
}

// == Backend Config ==
/// Options recognized when building a cache backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Endpoints used when no client is injected
    pub hosts: Vec<Host>,
    pub namespace: Option<String>,
    pub set_name: Option<String>,
    /// Default timeout in seconds; 0 means never expire
    pub default_timeout: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            namespace: None,
            set_name: None,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl BackendConfig {
    /// Loads backend options from the environment.
    ///
    /// # Environment Variables
    /// - `CACHE_HOSTS` - Comma separated `address:port[:tls_name]` list
    /// - `CACHE_NAMESPACE` - Namespace (required by the backend)
    /// - `CACHE_SET` - Set name (default: null set)
    /// - `CACHE_DEFAULT_TIMEOUT` - Default timeout in seconds (default: 300)
    pub fn from_env() -> Result<Self, CacheError> {
        let hosts = match env::var("CACHE_HOSTS") {
            Ok(value) => parse_hosts(&value)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            hosts,
            namespace: non_empty_var("CACHE_NAMESPACE"),
            set_name: non_empty_var("CACHE_SET"),
            default_timeout: parsed_var("CACHE_DEFAULT_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}

// == Server Config ==
/// Settings of the demo server binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    pub store: MemoryStoreConfig,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Loads the full configuration from the environment.
    ///
    /// # Environment Variables
    /// Everything read by [`BackendConfig::from_env`], plus:
    /// - `MAX_RECORDS` - Memory store capacity (default: 10000)
    /// - `SWEEP_INTERVAL_MS` - Sweep frequency in milliseconds (default: 100)
    /// - `EXPIRATION_ENABLED` - Accept finite TTLs (default: true)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Result<Self, CacheError> {
        let defaults = MemoryStoreConfig::default();

        Ok(Self {
            backend: BackendConfig::from_env()?,
            store: MemoryStoreConfig {
                max_records: parsed_var("MAX_RECORDS").unwrap_or(defaults.max_records),
                sweep_interval_ms: parsed_var("SWEEP_INTERVAL_MS")
                    .unwrap_or(defaults.sweep_interval_ms),
                expiration_enabled: parsed_var("EXPIRATION_ENABLED")
                    .unwrap_or(defaults.expiration_enabled),
            },
            server_port: parsed_var("SERVER_PORT").unwrap_or(3000),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            store: MemoryStoreConfig::default(),
            server_port: 3000,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
