//! Error handling for the API layer.
//!
//! Probe errors that prevent a probe from running are mapped to an HTTP
//! status and a JSON [`ApiError`] body. Failures inside a probe never reach
//! this module; they are part of the report.
//!
//! # Examples
//!
//! ```
//! use axum::http::StatusCode;
//! use conncheck::api::middleware::error_handler::probe_error_to_api_error;
//! use conncheck::infrastructure::{ProbeError, ProbeTarget};
//!
//! let (status, error) = probe_error_to_api_error(ProbeError::not_configured(ProbeTarget::Redis));
//! assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
//! assert_eq!(error.code, "PROBE_NOT_CONFIGURED");
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::infrastructure::ProbeError;

/// API error response body.
///
/// # Example JSON
///
/// ```json
/// {
///     "code": "PROBE_NOT_CONFIGURED",
///     "message": "Redis is not configured: set REDIS_CONNECTION_STRING",
///     "details": {
///         "target": "Redis",
///         "env": "REDIS_CONNECTION_STRING"
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// A machine-readable error code.
    pub code: String,
    /// A human-readable error message.
    pub message: String,
    /// Optional additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
        }
    }

    /// Creates an unsupported report format error.
    #[must_use]
    pub fn unsupported_format(format: &str) -> Self {
        Self::with_details(
            "UNSUPPORTED_FORMAT",
            format!("Unsupported report format '{format}'"),
            serde_json::json!({ "supported": ["json", "text"] }),
        )
    }
}

/// Response wrapper that pairs an [`ApiError`] with its HTTP status code.
#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    pub status: StatusCode,
    pub error: ApiError,
}

impl ApiErrorResponse {
    #[must_use]
    pub const fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<ProbeError> for ApiErrorResponse {
    fn from(error: ProbeError) -> Self {
        let (status, error) = probe_error_to_api_error(error);
        Self::new(status, error)
    }
}

// =============================================================================
// Error Conversion
// =============================================================================

/// Converts a probe error to a status code and API error.
///
/// | Probe Error | HTTP Status | Error Code |
/// |-------------|-------------|------------|
/// | UnknownProbe | 404 | PROBE_NOT_FOUND |
/// | NotConfigured | 503 | PROBE_NOT_CONFIGURED |
/// | anything else | 500 | PROBE_ERROR |
#[must_use]
pub fn probe_error_to_api_error(error: ProbeError) -> (StatusCode, ApiError) {
    match &error {
        ProbeError::UnknownProbe(slug) => (
            StatusCode::NOT_FOUND,
            ApiError::with_details(
                "PROBE_NOT_FOUND",
                error.to_string(),
                serde_json::json!({ "probe": slug }),
            ),
        ),
        ProbeError::NotConfigured { target, key } => (
            StatusCode::SERVICE_UNAVAILABLE,
            ApiError::with_details(
                "PROBE_NOT_CONFIGURED",
                error.to_string(),
                serde_json::json!({ "target": target.display_name(), "env": key }),
            ),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::new("PROBE_ERROR", error.to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ProbeTarget;
    use rstest::rstest;

    // =========================================================================
    // ApiError
    // =========================================================================

    #[rstest]
    fn api_error_serializes_without_details() {
        let error = ApiError::new("PROBE_ERROR", "boom");

        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(json, serde_json::json!({ "code": "PROBE_ERROR", "message": "boom" }));
    }

    #[rstest]
    fn unsupported_format_lists_supported_formats() {
        let error = ApiError::unsupported_format("xml");

        assert_eq!(error.code, "UNSUPPORTED_FORMAT");
        assert_eq!(error.message, "Unsupported report format 'xml'");
        assert_eq!(
            error.details,
            Some(serde_json::json!({ "supported": ["json", "text"] }))
        );
    }

    // =========================================================================
    // Probe error mapping
    // =========================================================================

    #[rstest]
    fn unknown_probe_is_not_found() {
        let (status, error) = probe_error_to_api_error(ProbeError::UnknownProbe("kafka".into()));

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error.code, "PROBE_NOT_FOUND");
        assert_eq!(error.details, Some(serde_json::json!({ "probe": "kafka" })));
    }

    #[rstest]
    fn not_configured_is_service_unavailable() {
        let (status, error) =
            probe_error_to_api_error(ProbeError::not_configured(ProbeTarget::Memcached));

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error.code, "PROBE_NOT_CONFIGURED");
        assert_eq!(
            error.details,
            Some(serde_json::json!({ "target": "Memcached", "env": "MEMCACHED_ENDPOINT" }))
        );
    }

    #[rstest]
    #[case(ProbeError::Task("panicked".into()))]
    #[case(ProbeError::connection(ProbeTarget::Redis, "refused"))]
    fn other_errors_are_internal(#[case] probe_error: ProbeError) {
        let message = probe_error.to_string();

        let (status, error) = probe_error_to_api_error(probe_error);

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error, ApiError::new("PROBE_ERROR", message));
    }
}
