//! Integration tests for GET /health and GET /probes.

use crate::common::*;
use rstest::rstest;

#[rstest]
#[tokio::test]
#[ignore = "requires a running conncheck deployment"]
async fn health_returns_200_with_status() {
    let client = ConncheckClient::new(&TestEnvironment::default().app_base_url);

    let response = expect_ok(client.health().await, "health");

    assert_eq!(response.status, "healthy");
    assert!(!response.version.is_empty(), "Version should not be empty");
}

#[rstest]
#[tokio::test]
#[ignore = "requires a running conncheck deployment"]
async fn catalogue_lists_every_probe() {
    let client = ConncheckClient::new(&TestEnvironment::default().app_base_url);

    let catalogue = expect_ok(client.catalogue().await, "catalogue");

    let slugs: Vec<String> = catalogue
        .probes
        .into_iter()
        .map(|probe| probe.slug)
        .collect();
    assert_eq!(
        slugs,
        [
            "postgres",
            "mysql-pool",
            "mysql-connection",
            "sqlserver",
            "redis-async",
            "redis-blocking",
            "rabbitmq",
            "activemq",
            "memcached",
            "http-client",
            "http-oneshot",
        ]
    );
}
