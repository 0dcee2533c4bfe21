//! Integration tests for GET /probes/{slug} against live external systems.

use crate::common::*;
use reqwest::StatusCode;
use rstest::rstest;

#[rstest]
#[case("postgres")]
#[case("mysql-pool")]
#[case("mysql-connection")]
#[case("sqlserver")]
#[case("redis-async")]
#[case("redis-blocking")]
#[case("rabbitmq")]
#[case("activemq")]
#[case("memcached")]
#[case("http-client")]
#[case("http-oneshot")]
#[tokio::test]
#[ignore = "requires a running conncheck deployment and its external systems"]
async fn configured_probe_passes(#[case] slug: &str) {
    let client = ConncheckClient::new(&TestEnvironment::default().app_base_url);

    let report = expect_ok(client.run_probe(slug).await, slug);

    assert_report_passed(&report, slug);
}

#[rstest]
#[tokio::test]
#[ignore = "requires a running conncheck deployment and its external systems"]
async fn rabbitmq_report_mentions_round_trip() {
    let client = ConncheckClient::new(&TestEnvironment::default().app_base_url);

    let report = expect_ok(client.run_probe("rabbitmq").await, "rabbitmq");

    assert_line_starting_with(&report, "Published: Test message ");
    assert_line_starting_with(&report, "Message round-trip: PASS");
    assert_last_line(&report, "RabbitMQ test finished");
}

#[rstest]
#[tokio::test]
#[ignore = "requires a running conncheck deployment"]
async fn text_report_starts_with_header() {
    let client = ConncheckClient::new(&TestEnvironment::default().app_base_url);

    let text = expect_ok(client.run_probe_text("http-client").await, "http-client text");

    assert!(text.starts_with("HTTP (shared client) (http-client): "));
}

#[rstest]
#[tokio::test]
#[ignore = "requires a running conncheck deployment"]
async fn unknown_probe_returns_404() {
    let client = ConncheckClient::new(&TestEnvironment::default().app_base_url);

    let result = client.run_probe("kafka").await;

    assert_rejected(&result, StatusCode::NOT_FOUND, "PROBE_NOT_FOUND");
}
