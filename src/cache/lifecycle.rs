//! Backend Lifecycle
//!
//! Explicit release of the backend's store connection: either at the end of a scope or
//! when the process receives a shutdown signal. `close` is idempotent, so both may fire.

use std::future::Future;
use std::sync::Arc;

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::CacheBackend;
use crate::driver::StoreDriver;
use crate::error::Result;

/// Runs `f` with a shared backend and closes the backend once `f` completes.
///
/// An error from `f` takes precedence over an error from closing.
pub async fn run_scoped<D, F, Fut, T>(backend: CacheBackend<D>, f: F) -> Result<T>
where
    D: StoreDriver,
    F: FnOnce(Arc<CacheBackend<D>>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let backend = Arc::new(backend);
    let outcome = f(backend.clone()).await;
    let closed = backend.close().await;

    let value = outcome?;
    closed?;
    Ok(value)
}

/// Spawns a task that closes `backend` when the process is asked to stop
/// (Ctrl+C or SIGTERM).
pub fn close_on_shutdown<D: StoreDriver>(backend: Arc<CacheBackend<D>>) -> JoinHandle<()> {
    close_on(backend, shutdown_signal())
}

/// Spawns a task that closes `backend` once `signal` resolves.
pub fn close_on<D, S>(backend: Arc<CacheBackend<D>>, signal: S) -> JoinHandle<()>
where
    D: StoreDriver,
    S: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        signal.await;
        match backend.close().await {
            Ok(true) => info!("Cache backend closed on shutdown"),
            Ok(false) => info!("Cache backend was already closed"),
            Err(err) => error!("Failed to close cache backend: {}", err),
        }
    })
}

/// Waits for Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MemoryStore;
    use crate::error::CacheError;
    use tokio::sync::oneshot;

    async fn backend(store: MemoryStore) -> CacheBackend<MemoryStore> {
        CacheBackend::new(store, "test", None, 300).await.unwrap()
    }

    #[tokio::test]
    async fn test_run_scoped_closes_after_body() {
        let store = MemoryStore::default();
        let cache = backend(store.clone()).await;

        let value = run_scoped(cache, |cache| async move {
            cache.set("k", "v", None).await?;
            cache.get("k").await
        })
        .await
        .unwrap();

        assert_eq!(value, Some(serde_json::json!("v")));
        assert!(!store.is_connected());
    }

    #[tokio::test]
    async fn test_run_scoped_closes_on_error() {
        let store = MemoryStore::default();
        let cache = backend(store.clone()).await;

        let result: Result<()> = run_scoped(cache, |_| async {
            Err(CacheError::InvalidRequest("body failed".to_string()))
        })
        .await;

        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
        assert!(!store.is_connected());
    }

    #[tokio::test]
    async fn test_close_on_signal() {
        let store = MemoryStore::default();
        let cache = Arc::new(backend(store.clone()).await);
        let (tx, rx) = oneshot::channel::<()>();

        let handle = close_on(cache.clone(), async {
            let _ = rx.await;
        });
        assert!(store.is_connected());

        tx.send(()).unwrap();
        handle.await.unwrap();

        assert!(cache.is_closed().await);
        assert!(!store.is_connected());
        // A later explicit close is harmless
        assert!(!cache.close().await.unwrap());
    }

    #[tokio::test]
    async fn test_close_on_shutdown_waits_for_signal() {
        let store = MemoryStore::default();
        let cache = Arc::new(backend(store.clone()).await);

        let handle = close_on_shutdown(cache.clone());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert!(!handle.is_finished());
        assert!(!cache.is_closed().await);
        assert!(store.is_connected());

        handle.abort();
        assert!(cache.close().await.unwrap());
    }
}
