//! Route configuration.
//!
//! # Routes
//!
//! | Method | Path | Handler | Description |
//! |--------|------|---------|-------------|
//! | GET | / | `index` | Service name, version, probe settings and catalogue |
//! | GET | /health | `health_check` | Health check endpoint |
//! | GET | /probes | `list_probes` | Probe catalogue |
//! | GET | /probes/{slug} | `run_probe` | Run one probe (`?format=text` for plain text) |

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use super::dto::{IndexResponse, ProbeSettingsDto};
use super::handlers::{catalogue, list_probes, run_probe};
use crate::infrastructure::AppDependencies;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status ("healthy").
    pub status: String,
    /// Service version.
    pub version: String,
}

/// GET /health - Health check endpoint.
///
/// Only reports that the service is up; external systems are checked by the
/// probes themselves.
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    (StatusCode::OK, Json(response))
}

/// GET / - Service description, probe settings and probe catalogue.
#[allow(clippy::unused_async)]
pub async fn index(State(dependencies): State<AppDependencies>) -> Json<IndexResponse> {
    Json(IndexResponse {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        settings: ProbeSettingsDto::from(dependencies.config()),
        probes: catalogue(dependencies.runner().as_ref()),
    })
}

/// Creates the Axum router with all API routes.
///
/// # Example
///
/// ```rust,ignore
/// use conncheck::api::create_router;
///
/// let router = create_router(dependencies);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, router).await?;
/// ```
pub fn create_router(dependencies: AppDependencies) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/probes", get(list_probes))
        .route("/probes/{slug}", get(run_probe))
        .with_state(dependencies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn health_check_reports_version() {
        let (status, Json(body)) = health_check().await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "healthy");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }

    #[rstest]
    fn health_response_serializes() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();

        assert_eq!(json, r#"{"status":"healthy","version":"0.1.0"}"#);
    }
}
