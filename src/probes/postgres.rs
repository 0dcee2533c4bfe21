//! PostgreSQL probe (sqlx).

use std::str::FromStr;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use super::relational::{TABLE, TEST_EMAIL, TEST_NAME, UPDATED_NAME, describe_user};
use super::{ProbeKind, ProbeReport, record_failure};
use crate::infrastructure::{ProbeError, ProbeTarget, ProbeTimeouts};

const TARGET: ProbeTarget = ProbeTarget::Postgres;

pub(super) async fn run(url: &str, timeouts: ProbeTimeouts) -> ProbeReport {
    let mut report = ProbeReport::begin(ProbeKind::Postgres);
    if let Err(error) = exercise(url, timeouts, &mut report).await {
        record_failure(&mut report, &error);
    }
    report
}

async fn exercise(
    url: &str,
    timeouts: ProbeTimeouts,
    report: &mut ProbeReport,
) -> Result<(), ProbeError> {
    let limit = timeouts.connect;
    let options = PgConnectOptions::from_str(url)
        .map_err(|error| ProbeError::invalid_connection_string(TARGET, error.to_string()))?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(timeouts.connect)
        .connect_with(options.clone())
        .await
        .map_err(sqlx_error(limit))?;

    report.section("PostgreSQL");
    report.line("Connected");

    let result = session_info(&pool, &options, timeouts, report).await;
    let result = match result {
        Ok(()) => crud(&pool, limit, report).await,
        Err(error) => Err(error),
    };
    pool.close().await;
    result
}

async fn session_info(
    pool: &PgPool,
    options: &PgConnectOptions,
    timeouts: ProbeTimeouts,
    report: &mut ProbeReport,
) -> Result<(), ProbeError> {
    let limit = timeouts.connect;
    let version: String = sqlx::query_scalar("SELECT version()")
        .fetch_one(pool)
        .await
        .map_err(sqlx_error(limit))?;
    let database: String = sqlx::query_scalar("SELECT current_database()::text")
        .fetch_one(pool)
        .await
        .map_err(sqlx_error(limit))?;

    report.line(format!("Server version: {version}"));
    report.line(format!("Database: {database}"));
    report.line(format!(
        "Data source: {}:{}",
        options.get_host(),
        options.get_port()
    ));
    report.line(format!(
        "State: {}",
        if pool.is_closed() { "Closed" } else { "Open" }
    ));
    report.line(format!(
        "Connect timeout: {} s",
        timeouts.connect.as_secs()
    ));
    Ok(())
}

async fn crud(
    pool: &PgPool,
    limit: Duration,
    report: &mut ProbeReport,
) -> Result<(), ProbeError> {
    report.section("CRUD");

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {TABLE} (
            id SERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            email VARCHAR(100) NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )"
    ))
    .execute(pool)
    .await
    .map_err(sqlx_error(limit))?;
    report.line(format!("Table {TABLE} ready"));

    let id: i32 = sqlx::query_scalar(&format!(
        "INSERT INTO {TABLE} (name, email) VALUES ($1, $2) RETURNING id"
    ))
    .bind(TEST_NAME)
    .bind(TEST_EMAIL)
    .fetch_one(pool)
    .await
    .map_err(sqlx_error(limit))?;
    report.line(format!("Inserted user with id {id}"));

    let newest: Option<(i32, String, String)> = sqlx::query_as(&format!(
        "SELECT id, name, email FROM {TABLE} ORDER BY id DESC LIMIT 1"
    ))
    .fetch_optional(pool)
    .await
    .map_err(sqlx_error(limit))?;
    match newest {
        Some((id, name, email)) => report.line(describe_user(id, &name, &email)),
        None => report.check("Inserted user is readable", false),
    }

    let updated = sqlx::query(&format!("UPDATE {TABLE} SET name = $1 WHERE email = $2"))
        .bind(UPDATED_NAME)
        .bind(TEST_EMAIL)
        .execute(pool)
        .await
        .map_err(sqlx_error(limit))?;
    report.line(format!("Updated {} row(s)", updated.rows_affected()));

    report.section("PostgreSQL features");
    let json: String = sqlx::query_scalar("SELECT json_build_object('test', 'value')::text")
        .fetch_one(pool)
        .await
        .map_err(sqlx_error(limit))?;
    report.line(format!("JSON: {json}"));

    let array: String = sqlx::query_scalar("SELECT ARRAY[1, 2, 3]::text")
        .fetch_one(pool)
        .await
        .map_err(sqlx_error(limit))?;
    report.line(format!("Array: {array}"));

    sqlx::query(&format!("DROP TABLE IF EXISTS {TABLE}"))
        .execute(pool)
        .await
        .map_err(sqlx_error(limit))?;
    report.line(format!("Table {TABLE} dropped"));

    Ok(())
}

fn sqlx_error(limit: Duration) -> impl Fn(sqlx::Error) -> ProbeError {
    move |error| ProbeError::from_sqlx(TARGET, &error, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::ProbeOutcome;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn malformed_url_fails_without_connecting() {
        let report = run("not a url", ProbeTimeouts::default()).await;

        assert_eq!(report.outcome(), ProbeOutcome::Failed);
        assert_eq!(report.lines().len(), 1);
        assert!(report.lines()[0].starts_with("PostgreSQL test failed:"));
    }
}
