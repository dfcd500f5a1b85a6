//! API Module
//!
//! Demo HTTP surface exposing every cache backend operation as a JSON endpoint.
//!
//! # Endpoints
//! - `PUT /set`, `PUT /add` - Store a value
//! - `GET /get/:key`, `GET /meta/:key`, `GET /has/:key` - Read
//! - `DELETE /del/:key` - Delete a key
//! - `POST /inc/:key`, `POST /dec/:key` - Atomic counters
//! - `POST /get_many`, `PUT /set_many`, `POST /delete_many` - Batches
//! - `DELETE /clear` - Request removal of every key
//! - `GET /health` - Health check

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
