//! SQL Server probe (tiberius over a tokio TCP stream).

use tiberius::{Client, Config, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::relational::{
    TABLE, TEST_EMAIL, TEST_NAME, UPDATED_NAME, describe_user, first_line,
};
use super::{ProbeKind, ProbeReport, record_close, record_failure, within};
use crate::infrastructure::{ProbeError, ProbeTarget, ProbeTimeouts};

const TARGET: ProbeTarget = ProbeTarget::SqlServer;

type SqlClient = Client<Compat<TcpStream>>;

pub(super) async fn run(connection_string: &str, timeouts: ProbeTimeouts) -> ProbeReport {
    let mut report = ProbeReport::begin(ProbeKind::SqlServer);
    if let Err(error) = exercise(connection_string, timeouts, &mut report).await {
        record_failure(&mut report, &error);
    }
    report
}

async fn exercise(
    connection_string: &str,
    timeouts: ProbeTimeouts,
    report: &mut ProbeReport,
) -> Result<(), ProbeError> {
    let config = Config::from_ado_string(connection_string)
        .map_err(|error| ProbeError::invalid_connection_string(TARGET, error.to_string()))?;

    let mut client = within(TARGET, timeouts.connect, connect(config)).await?;
    report.section("SQL Server");
    report.line("Connected");

    let result = steps(&mut client, report).await;
    record_close(report, client.close().await);
    result
}

async fn connect(config: Config) -> Result<SqlClient, ProbeError> {
    let tcp = TcpStream::connect(config.get_addr())
        .await
        .map_err(|error| ProbeError::connection(TARGET, error.to_string()))?;
    tcp.set_nodelay(true)
        .map_err(|error| ProbeError::connection(TARGET, error.to_string()))?;

    Client::connect(config, tcp.compat_write())
        .await
        .map_err(|error| ProbeError::connection(TARGET, error.to_string()))
}

async fn steps(client: &mut SqlClient, report: &mut ProbeReport) -> Result<(), ProbeError> {
    let version = client
        .simple_query("SELECT @@VERSION")
        .await
        .map_err(operation)?
        .into_row()
        .await
        .map_err(operation)?
        .map(|row| text_column(&row, 0))
        .transpose()?
        .unwrap_or_default();
    report.line(format!("Server version: {}", first_line(&version)));

    let databases = client
        .simple_query("SELECT name FROM sys.databases ORDER BY name")
        .await
        .map_err(operation)?
        .into_first_result()
        .await
        .map_err(operation)?
        .iter()
        .map(|row| text_column(row, 0))
        .collect::<Result<Vec<_>, _>>()?;
    report.line(format!("Databases: {}", databases.join(", ")));

    report.section("CRUD");
    client
        .execute(
            format!(
                "IF OBJECT_ID(N'dbo.{TABLE}', N'U') IS NULL
                 CREATE TABLE dbo.{TABLE} (
                     id INT IDENTITY(1,1) PRIMARY KEY,
                     name NVARCHAR(100) NOT NULL,
                     email NVARCHAR(100) NOT NULL,
                     created_at DATETIME2 DEFAULT SYSUTCDATETIME()
                 )"
            ),
            &[],
        )
        .await
        .map_err(operation)?;
    report.line(format!("Table {TABLE} ready"));

    let inserted = client
        .execute(
            format!("INSERT INTO dbo.{TABLE} (name, email) VALUES (@P1, @P2)"),
            &[&TEST_NAME, &TEST_EMAIL],
        )
        .await
        .map_err(operation)?
        .total();
    report.line(format!("Inserted {inserted} row(s)"));

    let newest = client
        .simple_query(format!(
            "SELECT TOP 1 id, name, email FROM dbo.{TABLE} ORDER BY id DESC"
        ))
        .await
        .map_err(operation)?
        .into_row()
        .await
        .map_err(operation)?;
    match newest {
        Some(row) => {
            let id = row
                .try_get::<i32, _>(0)
                .map_err(operation)?
                .unwrap_or_default();
            let name = text_column(&row, 1)?;
            let email = text_column(&row, 2)?;
            report.line(describe_user(id, &name, &email));
        }
        None => report.check("Inserted user is readable", false),
    }

    let updated = client
        .execute(
            format!("UPDATE dbo.{TABLE} SET name = @P1 WHERE email = @P2"),
            &[&UPDATED_NAME, &TEST_EMAIL],
        )
        .await
        .map_err(operation)?
        .total();
    report.line(format!("Updated {updated} row(s)"));

    client
        .execute(format!("DROP TABLE IF EXISTS dbo.{TABLE}"), &[])
        .await
        .map_err(operation)?;
    report.line(format!("Table {TABLE} dropped"));

    Ok(())
}

fn text_column(row: &Row, index: usize) -> Result<String, ProbeError> {
    row.try_get::<&str, _>(index)
        .map(|value| value.unwrap_or_default().to_string())
        .map_err(operation)
}

fn operation(error: tiberius::error::Error) -> ProbeError {
    ProbeError::operation(TARGET, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::ProbeOutcome;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn unreachable_server_is_reported() {
        let timeouts = ProbeTimeouts {
            connect: std::time::Duration::from_secs(2),
            ..ProbeTimeouts::default()
        };

        let report = run(
            "Server=tcp:127.0.0.1,1;User Id=sa;Password=secret;TrustServerCertificate=true",
            timeouts,
        )
        .await;

        assert_eq!(report.outcome(), ProbeOutcome::Failed);
        assert!(report.lines()[0].starts_with("SQL Server test failed:"));
    }
}
