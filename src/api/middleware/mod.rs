//! Middleware components for the API layer.

pub mod error_handler;

pub use error_handler::{ApiError, ApiErrorResponse, probe_error_to_api_error};
