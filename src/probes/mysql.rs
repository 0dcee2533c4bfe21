//! MySQL probes (sqlx), once through a pool and once on a bare connection.

use std::str::FromStr;
use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPoolOptions};
use sqlx::{ConnectOptions, Connection};

use super::relational::{TABLE, TEST_EMAIL, TEST_NAME, UPDATED_NAME, describe_user};
use super::{ProbeKind, ProbeReport, record_close, record_failure, within};
use crate::infrastructure::{ProbeError, ProbeTarget, ProbeTimeouts};

const TARGET: ProbeTarget = ProbeTarget::MySql;

/// Connects through a `MySqlPool` and runs the steps on a pooled connection.
pub(super) async fn run_pooled(url: &str, timeouts: ProbeTimeouts) -> ProbeReport {
    let mut report = ProbeReport::begin(ProbeKind::MySqlPool);
    if let Err(error) = exercise_pooled(url, timeouts, &mut report).await {
        record_failure(&mut report, &error);
    }
    report
}

/// Opens a single unpooled connection and runs the same steps on it.
pub(super) async fn run_single(url: &str, timeouts: ProbeTimeouts) -> ProbeReport {
    let mut report = ProbeReport::begin(ProbeKind::MySqlConnection);
    if let Err(error) = exercise_single(url, timeouts, &mut report).await {
        record_failure(&mut report, &error);
    }
    report
}

async fn exercise_pooled(
    url: &str,
    timeouts: ProbeTimeouts,
    report: &mut ProbeReport,
) -> Result<(), ProbeError> {
    let limit = timeouts.connect;
    let options = parse_options(url)?;
    let pool = MySqlPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(timeouts.connect)
        .connect_with(options)
        .await
        .map_err(sqlx_error(limit))?;

    report.section("MySQL (pool)");
    report.line(format!(
        "Pool connected: size={}, idle={}",
        pool.size(),
        pool.num_idle()
    ));

    let result = match pool.acquire().await {
        Ok(mut connection) => steps(&mut connection, limit, report).await,
        Err(error) => Err(sqlx_error(limit)(error)),
    };
    pool.close().await;
    report.line("Pool closed");
    result
}

async fn exercise_single(
    url: &str,
    timeouts: ProbeTimeouts,
    report: &mut ProbeReport,
) -> Result<(), ProbeError> {
    let limit = timeouts.connect;
    let options = parse_options(url)?;
    let mut connection = within(TARGET, timeouts.connect, async {
        options.connect().await.map_err(sqlx_error(limit))
    })
    .await?;

    report.section("MySQL (connection)");
    report.line("Connected");

    let result = steps(&mut connection, limit, report).await;
    record_close(report, connection.close().await);
    result
}

async fn steps(
    connection: &mut MySqlConnection,
    limit: Duration,
    report: &mut ProbeReport,
) -> Result<(), ProbeError> {
    let version: String = sqlx::query_scalar("SELECT VERSION()")
        .fetch_one(&mut *connection)
        .await
        .map_err(sqlx_error(limit))?;
    report.line(format!("Server version: {version}"));

    let databases: Vec<String> = sqlx::query_scalar("SHOW DATABASES")
        .fetch_all(&mut *connection)
        .await
        .map_err(sqlx_error(limit))?;
    report.line(format!("Databases: {}", databases.join(", ")));

    report.section("CRUD");
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {TABLE} (
            id INT AUTO_INCREMENT PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            email VARCHAR(100) NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )"
    ))
    .execute(&mut *connection)
    .await
    .map_err(sqlx_error(limit))?;
    report.line(format!("Table {TABLE} ready"));

    let inserted = sqlx::query(&format!("INSERT INTO {TABLE} (name, email) VALUES (?, ?)"))
        .bind(TEST_NAME)
        .bind(TEST_EMAIL)
        .execute(&mut *connection)
        .await
        .map_err(sqlx_error(limit))?;
    report.line(format!(
        "Inserted {} row(s), id {}",
        inserted.rows_affected(),
        inserted.last_insert_id()
    ));

    let newest: Option<(i32, String, String)> = sqlx::query_as(&format!(
        "SELECT id, name, email FROM {TABLE} ORDER BY id DESC LIMIT 1"
    ))
    .fetch_optional(&mut *connection)
    .await
    .map_err(sqlx_error(limit))?;
    match newest {
        Some((id, name, email)) => report.line(describe_user(id, &name, &email)),
        None => report.check("Inserted user is readable", false),
    }

    let updated = sqlx::query(&format!("UPDATE {TABLE} SET name = ? WHERE email = ?"))
        .bind(UPDATED_NAME)
        .bind(TEST_EMAIL)
        .execute(&mut *connection)
        .await
        .map_err(sqlx_error(limit))?;
    report.line(format!("Updated {} row(s)", updated.rows_affected()));

    sqlx::query(&format!("DROP TABLE IF EXISTS {TABLE}"))
        .execute(&mut *connection)
        .await
        .map_err(sqlx_error(limit))?;
    report.line(format!("Table {TABLE} dropped"));

    Ok(())
}

fn parse_options(url: &str) -> Result<MySqlConnectOptions, ProbeError> {
    MySqlConnectOptions::from_str(url)
        .map_err(|error| ProbeError::invalid_connection_string(TARGET, error.to_string()))
}

fn sqlx_error(limit: Duration) -> impl Fn(sqlx::Error) -> ProbeError {
    move |error| ProbeError::from_sqlx(TARGET, &error, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("not a url")]
    #[case("mysql://[bad")]
    fn broken_urls_are_rejected(#[case] url: &str) {
        let error = parse_options(url).unwrap_err();

        assert_eq!(error.target(), Some(ProbeTarget::MySql));
    }

    #[rstest]
    #[tokio::test]
    async fn both_variants_report_under_their_own_name() {
        let pooled = run_pooled("not a url", ProbeTimeouts::default()).await;
        let single = run_single("not a url", ProbeTimeouts::default()).await;

        assert!(pooled.lines()[0].starts_with("MySQL (pool) test failed:"));
        assert!(single.lines()[0].starts_with("MySQL (connection) test failed:"));
    }
}
