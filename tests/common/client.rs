//! HTTP client wrapper for integration tests.

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Clone)]
pub struct ConncheckClient {
    client: Client,
    base_url: String,
}

impl ConncheckClient {
    pub fn new(base_url: &str) -> Self {
        // Probes with message round-trips and key expiry take several seconds.
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn health(&self) -> ApiResult<HealthResponse> {
        self.get_json("/health").await
    }

    pub async fn catalogue(&self) -> ApiResult<CatalogueResponse> {
        self.get_json("/probes").await
    }

    pub async fn run_probe(&self, slug: &str) -> ApiResult<ReportResponse> {
        self.get_json(&format!("/probes/{slug}")).await
    }

    pub async fn run_probe_text(&self, slug: &str) -> ApiResult<String> {
        let response = self
            .client
            .get(format!("{}/probes/{slug}?format=text", self.base_url))
            .send()
            .await?;
        if response.status().is_success() {
            response.text().await.map_err(ApiError::Http)
        } else {
            Err(api_error(response).await)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        parse_response(response).await
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    Http(reqwest::Error),
    Api { status: StatusCode, code: String },
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    if response.status().is_success() {
        response.json().await.map_err(ApiError::Http)
    } else {
        Err(api_error(response).await)
    }
}

async fn api_error(response: Response) -> ApiError {
    let status = response.status();
    match response.json::<ApiErrorBody>().await {
        Ok(body) => ApiError::Api {
            status,
            code: body.code,
        },
        Err(error) => ApiError::Http(error),
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
}

// DTO types for tests

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProbeSummary {
    pub slug: String,
    pub name: String,
    pub target: String,
    pub configured: bool,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogueResponse {
    pub probes: Vec<ProbeSummary>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReportResponse {
    pub probe: String,
    pub name: String,
    pub target: String,
    pub outcome: String,
    pub started_at: String,
    pub elapsed_ms: Option<u64>,
    pub lines: Vec<String>,
}
