//! The query API: request envelopes, SQL plan construction, and the axum
//! handlers that tie them to the store reader.

pub mod envelope;
pub mod handlers;
pub mod plan;

pub use handlers::query_routes;
