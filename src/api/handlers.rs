//! Probe handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use super::dto::{CatalogueResponse, ProbeReportDto, ProbeSummaryDto, ReportFormat, ReportQuery};
use super::middleware::{ApiError, ApiErrorResponse};
use crate::infrastructure::AppDependencies;
use crate::probes::{ProbeKind, ProbeRunner};

/// Builds the catalogue with the configured flag of every probe.
pub(crate) fn catalogue(runner: &dyn ProbeRunner) -> Vec<ProbeSummaryDto> {
    ProbeKind::ALL
        .into_iter()
        .map(|kind| ProbeSummaryDto::new(kind, runner.is_configured(kind)))
        .collect()
}

/// GET /probes - Lists every probe.
#[allow(clippy::unused_async)]
pub async fn list_probes(State(dependencies): State<AppDependencies>) -> Json<CatalogueResponse> {
    Json(CatalogueResponse {
        probes: catalogue(dependencies.runner().as_ref()),
    })
}

/// GET /probes/{slug} - Runs one probe.
///
/// A probe that ran but failed is still `200 OK`; the outcome is in the body.
///
/// # Errors
///
/// - `404 Not Found` - no probe with this slug
/// - `400 Bad Request` - `format` is neither `json` nor `text`
/// - `503 Service Unavailable` - the probe's endpoint is not configured
/// - `500 Internal Server Error` - the probe could not be run
pub async fn run_probe(
    State(dependencies): State<AppDependencies>,
    Path(slug): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiErrorResponse> {
    let kind: ProbeKind = slug.parse()?;
    let format = match query.format.as_deref() {
        None => ReportFormat::default(),
        Some(raw) => raw.parse::<ReportFormat>().map_err(|unsupported| {
            ApiErrorResponse::new(
                StatusCode::BAD_REQUEST,
                ApiError::unsupported_format(&unsupported),
            )
        })?,
    };

    let report = dependencies.runner().run(kind).await?;

    let response = match format {
        ReportFormat::Json => Json(ProbeReportDto::from(&report)).into_response(),
        ReportFormat::Text => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            report.render_text(),
        )
            .into_response(),
    };
    Ok(response)
}
