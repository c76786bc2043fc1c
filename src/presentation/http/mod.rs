//! HTTP API
//!
//! Health, metrics and the authenticated `/api/v1` routes.

pub mod handlers;
pub mod routes;

pub use routes::create_router;
