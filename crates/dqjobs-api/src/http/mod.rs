//! HTTP handlers and routing.

pub mod handlers;
pub mod routes;
