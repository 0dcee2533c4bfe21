//! HTTP API (Axum 0.8).
//!
//! # Modules
//!
//! - [`dto`]: response bodies and query parameters
//! - [`handlers`]: probe handlers
//! - [`middleware`]: error handling
//! - [`routes`]: route configuration

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use routes::create_router;
