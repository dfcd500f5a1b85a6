//! Request and Response models for the demo HTTP surface
//!
//! DTOs serialized to and from JSON request/response bodies.

pub mod requests;
pub mod responses;

pub use requests::{CounterQuery, KeysRequest, SetManyRequest, SetRequest};
pub use responses::{
    ClearResponse, CounterResponse, DeleteResponse, ErrorResponse, GetResponse, HasResponse,
    HealthResponse, KeysResponse, MetadataResponse, ValuesResponse, WriteResponse,
};
