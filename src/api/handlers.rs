//! API Handlers
//!
//! HTTP request handlers, one per backend operation.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::CacheBackend;
use crate::driver::StoreDriver;
use crate::error::{CacheError, Result};
use crate::models::{
    requests::validate_key, ClearResponse, CounterQuery, CounterResponse, DeleteResponse,
    GetResponse, HasResponse, HealthResponse, KeysRequest, KeysResponse, MetadataResponse,
    SetManyRequest, SetRequest, ValuesResponse, WriteResponse,
};

/// Application state shared across all handlers.
pub struct AppState<D: StoreDriver> {
    pub cache: Arc<CacheBackend<D>>,
}

impl<D: StoreDriver> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
        }
    }
}

impl<D: StoreDriver> AppState<D> {
    pub fn new(cache: CacheBackend<D>) -> Self {
        Self::from_shared(Arc::new(cache))
    }

    pub fn from_shared(cache: Arc<CacheBackend<D>>) -> Self {
        Self { cache }
    }
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(msg) => Err(CacheError::InvalidRequest(msg)),
        None => Ok(()),
    }
}

/// Handler for PUT /set
pub async fn set_handler<D: StoreDriver>(
    State(state): State<AppState<D>>,
    Json(req): Json<SetRequest>,
) -> Result<Json<WriteResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let success = state.cache.set(&req.key, &req.value, req.timeout).await?;
    Ok(Json(WriteResponse {
        key: req.key,
        success,
    }))
}

/// Handler for PUT /add
pub async fn add_handler<D: StoreDriver>(
    State(state): State<AppState<D>>,
    Json(req): Json<SetRequest>,
) -> Result<Json<WriteResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let success = state.cache.add(&req.key, &req.value, req.timeout).await?;
    Ok(Json(WriteResponse {
        key: req.key,
        success,
    }))
}

/// Handler for GET /get/:key
///
/// A miss is reported as 404.
pub async fn get_handler<D: StoreDriver>(
    State(state): State<AppState<D>>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key).await? {
        Some(value) => Ok(Json(GetResponse { key, value })),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /meta/:key
pub async fn metadata_handler<D: StoreDriver>(
    State(state): State<AppState<D>>,
    Path(key): Path<String>,
) -> Result<Json<MetadataResponse>> {
    match state.cache.get_metadata(&key).await? {
        Some(metadata) => Ok(Json(MetadataResponse::new(key, metadata))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /has/:key
pub async fn has_handler<D: StoreDriver>(
    State(state): State<AppState<D>>,
    Path(key): Path<String>,
) -> Result<Json<HasResponse>> {
    let exists = state.cache.has(&key).await?;
    Ok(Json(HasResponse { key, exists }))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler<D: StoreDriver>(
    State(state): State<AppState<D>>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let deleted = state.cache.delete(&key).await?;
    Ok(Json(DeleteResponse { key, deleted }))
}

/// Handler for POST /inc/:key?delta=n
pub async fn inc_handler<D: StoreDriver>(
    State(state): State<AppState<D>>,
    Path(key): Path<String>,
    Query(query): Query<CounterQuery>,
) -> Result<Json<CounterResponse>> {
    check_key(&key)?;
    let value = state.cache.inc(&key, query.delta).await?;
    Ok(Json(CounterResponse { key, value }))
}

/// Handler for POST /dec/:key?delta=n
pub async fn dec_handler<D: StoreDriver>(
    State(state): State<AppState<D>>,
    Path(key): Path<String>,
    Query(query): Query<CounterQuery>,
) -> Result<Json<CounterResponse>> {
    check_key(&key)?;
    let value = state.cache.dec(&key, query.delta).await?;
    Ok(Json(CounterResponse { key, value }))
}

/// Handler for POST /get_many
pub async fn get_many_handler<D: StoreDriver>(
    State(state): State<AppState<D>>,
    Json(req): Json<KeysRequest>,
) -> Result<Json<ValuesResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let values = state.cache.get_many(&req.keys).await?;
    Ok(Json(ValuesResponse { values }))
}

/// Handler for PUT /set_many
pub async fn set_many_handler<D: StoreDriver>(
    State(state): State<AppState<D>>,
    Json(req): Json<SetManyRequest>,
) -> Result<Json<KeysResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let keys = state.cache.set_many(req.items, req.timeout).await?;
    Ok(Json(KeysResponse { keys }))
}

/// Handler for POST /delete_many
pub async fn delete_many_handler<D: StoreDriver>(
    State(state): State<AppState<D>>,
    Json(req): Json<KeysRequest>,
) -> Result<Json<KeysResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let keys = state.cache.delete_many(&req.keys).await?;
    Ok(Json(KeysResponse { keys }))
}

/// Handler for DELETE /clear
pub async fn clear_handler<D: StoreDriver>(
    State(state): State<AppState<D>>,
) -> Result<Json<ClearResponse>> {
    let accepted = state.cache.clear().await?;
    Ok(Json(ClearResponse { accepted }))
}

/// Handler for GET /health
pub async fn health_handler<D: StoreDriver>(
    State(state): State<AppState<D>>,
) -> Json<HealthResponse> {
    let connected = !state.cache.is_closed().await;
    Json(HealthResponse::new(connected))
}
