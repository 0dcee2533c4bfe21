//! Data Transfer Objects for the HTTP API.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::infrastructure::AppConfig;
use crate::probes::{ProbeKind, ProbeReport};

// =============================================================================
// Catalogue
// =============================================================================

/// One entry of the probe catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSummaryDto {
    pub slug: String,
    pub name: String,
    pub target: String,
    /// Whether the endpoint the probe needs is configured.
    pub configured: bool,
    /// Path that runs the probe.
    pub url: String,
}

impl ProbeSummaryDto {
    #[must_use]
    pub fn new(kind: ProbeKind, configured: bool) -> Self {
        Self {
            slug: kind.slug().to_string(),
            name: kind.display_name().to_string(),
            target: kind.target().display_name().to_string(),
            configured,
            url: format!("/probes/{}", kind.slug()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueResponse {
    pub probes: Vec<ProbeSummaryDto>,
}

/// Response of `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResponse {
    pub service: String,
    pub version: String,
    pub settings: ProbeSettingsDto,
    pub probes: Vec<ProbeSummaryDto>,
}

/// Probe settings in effect, as reported by `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSettingsDto {
    /// Path requested by the HTTP probes.
    pub http_probe_path: String,
    pub connect_timeout_secs: u64,
    pub message_wait_timeout_secs: u64,
    pub redis_expiry_ttl_secs: u64,
}

impl From<&AppConfig> for ProbeSettingsDto {
    fn from(config: &AppConfig) -> Self {
        Self {
            http_probe_path: config.http_probe_path.clone(),
            connect_timeout_secs: config.timeouts.connect.as_secs(),
            message_wait_timeout_secs: config.timeouts.message_wait.as_secs(),
            redis_expiry_ttl_secs: config.timeouts.key_expiry.as_secs(),
        }
    }
}

// =============================================================================
// Reports
// =============================================================================

/// JSON rendering of a probe report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReportDto {
    pub probe: String,
    pub name: String,
    pub target: String,
    /// `passed` or `failed`.
    pub outcome: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: Option<u64>,
    pub lines: Vec<String>,
}

impl From<&ProbeReport> for ProbeReportDto {
    fn from(report: &ProbeReport) -> Self {
        let kind = report.kind();
        Self {
            probe: kind.slug().to_string(),
            name: kind.display_name().to_string(),
            target: kind.target().display_name().to_string(),
            outcome: report.outcome().as_str().to_string(),
            started_at: report.started_at(),
            elapsed_ms: report.elapsed_ms(),
            lines: report.lines().to_vec(),
        }
    }
}

// =============================================================================
// Query parameters
// =============================================================================

/// Query string of `GET /probes/{slug}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub format: Option<String>,
}

/// How a report is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "txt" | "plain" => Ok(Self::Text),
            _ => Err(value.to_string()),
        }
    }
}
