//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod auth;
mod handlers;
mod server;

pub use handlers::{ApiError, AppState, PRODUCTS_PATH};
pub use server::HttpServer;
