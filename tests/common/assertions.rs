//! Assertions over conncheck responses and reports.

use super::client::{ApiError, ApiResult, ReportResponse};
use reqwest::StatusCode;

/// Returns the successful value, failing with the transport or API error otherwise.
pub fn expect_ok<T>(result: ApiResult<T>, request: &str) -> T {
    match result {
        Ok(value) => value,
        Err(error) => panic!("{request} failed: {error:?}"),
    }
}

/// Checks that the service rejected the request with `code` and `status`.
pub fn assert_rejected<T: std::fmt::Debug>(
    result: &ApiResult<T>,
    status: StatusCode,
    code: &str,
) {
    match result {
        Err(ApiError::Api { status: actual_status, code: actual_code }) => {
            assert_eq!((*actual_status, actual_code.as_str()), (status, code));
        }
        other => panic!("expected {status} {code}, got {other:?}"),
    }
}

/// Checks that `report` belongs to `slug`, was timed, and passed. On failure the
/// report's lines are printed so the failing step is visible.
pub fn assert_report_passed(report: &ReportResponse, slug: &str) {
    let transcript = report.lines.join("\n");
    assert_eq!(report.probe, slug, "report for the wrong check:\n{transcript}");
    assert!(report.elapsed_ms.is_some(), "{slug} was not timed:\n{transcript}");
    assert_eq!(report.outcome, "passed", "{slug} failed:\n{transcript}");
}

pub fn assert_line_starting_with(report: &ReportResponse, prefix: &str) {
    assert!(
        report.lines.iter().any(|line| line.starts_with(prefix)),
        "no line starting with {prefix:?} in:\n{}",
        report.lines.join("\n")
    );
}

pub fn assert_last_line(report: &ReportResponse, expected: &str) {
    assert_eq!(report.lines.last().map(String::as_str), Some(expected));
}
