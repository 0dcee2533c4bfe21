//! Outbound HTTP probes (reqwest).
//!
//! `http-client` reuses one shared client built at startup; `http-oneshot`
//! builds a fresh client for every request. Both issue the same two GETs.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use super::{ProbeKind, ProbeReport, record_failure};
use crate::infrastructure::{ProbeError, ProbeTarget, ProbeTimeouts};

const TARGET: ProbeTarget = ProbeTarget::Http;
const CUSTOM_HEADER: &str = "X-Custom-Header";
const CUSTOM_HEADER_VALUE: &str = "Test Value";
const BODY_LIMIT_BYTES: usize = 2048;

/// Builds the shared client. It accepts invalid TLS certificates so that
/// services with self-signed certificates can be probed.
pub(super) fn shared_client(timeout: Duration) -> Result<Client, ProbeError> {
    Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(timeout)
        .build()
        .map_err(|error| ProbeError::operation(TARGET, error.to_string()))
}

/// Joins the service base URL and the probe path with exactly one slash.
pub(super) fn probe_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// `limit` is the request timeout the shared client was built with.
pub(super) async fn run_shared(client: &Client, url: &str, limit: Duration) -> ProbeReport {
    let mut report = ProbeReport::begin(ProbeKind::HttpClient);
    if let Err(error) = exercise(&mut report, url, limit, |_| Ok(client.clone())).await {
        record_failure(&mut report, &error);
    }
    report
}

pub(super) async fn run_oneshot(url: &str, timeouts: ProbeTimeouts) -> ProbeReport {
    let mut report = ProbeReport::begin(ProbeKind::HttpOneShot);
    let result = exercise(&mut report, url, timeouts.connect, |report| {
        report.line("Creating a new client for this request");
        Client::builder()
            .timeout(timeouts.connect)
            .build()
            .map_err(|error| ProbeError::operation(TARGET, error.to_string()))
    })
    .await;
    if let Err(error) = result {
        record_failure(&mut report, &error);
    }
    report
}

async fn exercise<F>(
    report: &mut ProbeReport,
    url: &str,
    limit: Duration,
    mut client_for: F,
) -> Result<(), ProbeError>
where
    F: FnMut(&mut ProbeReport) -> Result<Client, ProbeError>,
{
    report.section(format!("GET {url}"));
    let client = client_for(report)?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|error| request_error(&error, limit))?;
    record_response(report, response, limit).await?;

    report.section(format!("GET {url} with {CUSTOM_HEADER}"));
    let client = client_for(report)?;
    let response = client
        .get(url)
        .header(CUSTOM_HEADER, CUSTOM_HEADER_VALUE)
        .send()
        .await
        .map_err(|error| request_error(&error, limit))?;
    record_response(report, response, limit).await
}

async fn record_response(
    report: &mut ProbeReport,
    response: reqwest::Response,
    limit: Duration,
) -> Result<(), ProbeError> {
    let status = response.status();
    report.line(format!("Status: {}", status_line(status)));
    let body = response
        .text()
        .await
        .map_err(|error| request_error(&error, limit))?;
    report.line(format!("Body: {}", truncate_body(&body, BODY_LIMIT_BYTES)));
    report.check("Success status", status.is_success());
    Ok(())
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

/// Cuts `body` to at most `limit` bytes without splitting a character.
fn truncate_body(body: &str, limit: usize) -> String {
    if body.len() <= limit {
        return body.to_string();
    }
    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes truncated)", &body[..end], body.len() - end)
}

fn request_error(error: &reqwest::Error, limit: Duration) -> ProbeError {
    if error.is_timeout() {
        ProbeError::timeout(TARGET, limit)
    } else if error.is_connect() {
        ProbeError::connection(TARGET, error.to_string())
    } else {
        ProbeError::operation(TARGET, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::ProbeOutcome;
    use axum::Router;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use rstest::rstest;

    async fn forecast(headers: HeaderMap) -> String {
        headers
            .get(CUSTOM_HEADER)
            .and_then(|value| value.to_str().ok())
            .map_or_else(|| "sunny".to_string(), |value| format!("sunny, {value}"))
    }

    async fn slow_forecast() -> &'static str {
        tokio::time::sleep(Duration::from_secs(3)).await;
        "late"
    }

    /// Serves `/api/weatherforecast` and a slow `/slow` on an ephemeral port.
    async fn spawn_service() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/api/weatherforecast", get(forecast))
            .route("/slow", get(slow_forecast));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{address}")
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[rstest]
    #[case("http://svc", "/api/weatherforecast", "http://svc/api/weatherforecast")]
    #[case("http://svc/", "api/weatherforecast", "http://svc/api/weatherforecast")]
    #[case("http://svc//", "//health", "http://svc/health")]
    fn probe_url_joins_with_one_slash(
        #[case] base: &str,
        #[case] path: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(probe_url(base, path), expected);
    }

    #[rstest]
    fn short_bodies_are_kept() {
        assert_eq!(truncate_body("ok", 2048), "ok");
    }

    #[rstest]
    fn long_bodies_are_cut_on_char_boundary() {
        let body = "é".repeat(10);

        let truncated = truncate_body(&body, 5);

        assert_eq!(truncated, "éé... (16 bytes truncated)");
    }

    #[rstest]
    #[case(StatusCode::OK, "200 OK")]
    #[case(StatusCode::NOT_FOUND, "404 Not Found")]
    fn status_lines(#[case] status: StatusCode, #[case] expected: &str) {
        assert_eq!(status_line(status), expected);
    }

    // =========================================================================
    // Probes against a local service
    // =========================================================================

    #[rstest]
    #[tokio::test]
    async fn shared_client_probe_passes() {
        let base = spawn_service().await;
        let client = shared_client(Duration::from_secs(5)).unwrap();

        let report = run_shared(
            &client,
            &probe_url(&base, "/api/weatherforecast"),
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(report.outcome(), ProbeOutcome::Passed);
        assert!(report.lines().contains(&"Status: 200 OK".to_string()));
        assert!(report.lines().contains(&"Body: sunny".to_string()));
        assert!(report.lines().contains(&"Body: sunny, Test Value".to_string()));
    }

    #[rstest]
    #[tokio::test]
    async fn oneshot_probe_builds_client_per_request() {
        let base = spawn_service().await;

        let report = run_oneshot(
            &probe_url(&base, "/api/weatherforecast"),
            ProbeTimeouts::default(),
        )
        .await;

        assert!(report.is_passed());
        let created = report
            .lines()
            .iter()
            .filter(|line| line.starts_with("Creating a new client"))
            .count();
        assert_eq!(created, 2);
    }

    #[rstest]
    #[tokio::test]
    async fn missing_route_fails_status_check() {
        let base = spawn_service().await;
        let client = shared_client(Duration::from_secs(5)).unwrap();

        let report = run_shared(
            &client,
            &probe_url(&base, "/missing"),
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(report.outcome(), ProbeOutcome::Failed);
        assert!(report.lines().contains(&"Status: 404 Not Found".to_string()));
        assert!(report.lines().contains(&"Success status: FAIL".to_string()));
    }

    #[rstest]
    #[tokio::test]
    async fn refused_connection_is_reported() {
        let client = shared_client(Duration::from_secs(2)).unwrap();

        let report = run_shared(
            &client,
            "http://127.0.0.1:1/api/weatherforecast",
            Duration::from_secs(2),
        )
        .await;

        assert_eq!(report.outcome(), ProbeOutcome::Failed);
        let last = report.lines().last().cloned().unwrap_or_default();
        assert!(last.starts_with("HTTP (shared client) test failed: connection to HTTP failed"));
    }

    #[rstest]
    #[tokio::test]
    async fn slow_service_reports_configured_timeout() {
        let base = spawn_service().await;
        let limit = Duration::from_secs(1);
        let client = shared_client(limit).unwrap();

        let report = run_shared(&client, &probe_url(&base, "/slow"), limit).await;

        assert_eq!(report.outcome(), ProbeOutcome::Failed);
        assert_eq!(
            report.lines().last().map(String::as_str),
            Some("HTTP (shared client) test failed: HTTP operation timed out after 1000ms")
        );
    }

    #[rstest]
    #[tokio::test]
    async fn oneshot_timeout_uses_connect_limit() {
        let base = spawn_service().await;
        let timeouts = ProbeTimeouts {
            connect: Duration::from_secs(1),
            ..ProbeTimeouts::default()
        };

        let report = run_oneshot(&probe_url(&base, "/slow"), timeouts).await;

        assert_eq!(
            report.lines().last().map(String::as_str),
            Some("HTTP (one-off client) test failed: HTTP operation timed out after 1000ms")
        );
    }
}
