//! API Routes
//!
//! Configures the Axum router with all cache endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    add_handler, clear_handler, dec_handler, delete_handler, delete_many_handler, get_handler,
    get_many_handler, has_handler, health_handler, inc_handler, metadata_handler,
    set_handler, set_many_handler, AppState,
};
use crate::driver::StoreDriver;

/// Creates the router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router<D: StoreDriver>(state: AppState<D>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", put(set_handler::<D>))
        .route("/add", put(add_handler::<D>))
        .route("/set_many", put(set_many_handler::<D>))
        .route("/get/:key", get(get_handler::<D>))
        .route("/meta/:key", get(metadata_handler::<D>))
        .route("/has/:key", get(has_handler::<D>))
        .route("/get_many", post(get_many_handler::<D>))
        .route("/del/:key", delete(delete_handler::<D>))
        .route("/delete_many", post(delete_many_handler::<D>))
        .route("/inc/:key", post(inc_handler::<D>))
        .route("/dec/:key", post(dec_handler::<D>))
        .route("/clear", delete(clear_handler::<D>))
        .route("/health", get(health_handler::<D>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
