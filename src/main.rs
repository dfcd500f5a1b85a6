//! KV Cache demo server
//!
//! Serves the cache backend over HTTP, backed by the in-process memory store.
//!
//! # Startup Sequence
//! 1. Initialize tracing subscriber for logging
//! 2. Load configuration from environment variables
//! 3. Build the memory store and the cache backend
//! 4. Serve the HTTP API until Ctrl+C/SIGTERM
//! 5. Close the backend on the way out

use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kv_cache::api::{create_router, AppState};
use kv_cache::cache::{run_scoped, shutdown_signal, CacheBackend};
use kv_cache::{Config, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kv_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting KV Cache server");

    let config = Config::from_env().context("failed to load configuration")?;
    info!(
        "Configuration loaded: namespace={:?}, set={:?}, default_timeout={}s, port={}",
        config.backend.namespace,
        config.backend.set_name,
        config.backend.default_timeout,
        config.server_port
    );

    let store = MemoryStore::new(config.store.clone());
    info!(
        "Memory store: max_records={}, sweep_interval={}ms, expiration_enabled={}",
        store.config().max_records,
        store.config().sweep_interval_ms,
        store.config().expiration_enabled
    );
    // CACHE_NAMESPACE is required
    let backend = CacheBackend::from_config(&config.backend, Some(store))
        .await
        .context("failed to build cache backend")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    run_scoped(backend, |backend| async move {
        let app = create_router(AppState::from_shared(backend));
        if let Err(err) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            tracing::error!("Server error: {}", err);
        }
        Ok(())
    })
    .await
    .context("failed to close cache backend")?;

    info!("Server shutdown complete");
    Ok(())
}
