//! Connectivity probes.
//!
//! Each probe opens a connection to one external system with its client
//! crate, runs a fixed sequence of operations and records a line per step in
//! a [`ProbeReport`]. Client errors are caught, logged and written into the
//! report; only a missing endpoint is returned as an error, before any I/O.
//!
//! # Module Organization
//!
//! - `report` - the report type every probe fills in
//! - `round_trip` - publish/consume helpers shared by the broker probes
//! - one module per external system

mod activemq;
mod http;
mod memcached;
mod mysql;
mod postgres;
mod rabbitmq;
mod redis;
mod relational;
mod report;
mod round_trip;
mod sqlserver;

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::infrastructure::{AppConfig, ProbeError, ProbeTarget};

pub use report::{ProbeOutcome, ProbeReport};
pub use round_trip::{Listener, RoundTrip, poll_until};

// =============================================================================
// ProbeKind
// =============================================================================

/// Every runnable probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Postgres,
    MySqlPool,
    MySqlConnection,
    SqlServer,
    RedisAsync,
    RedisBlocking,
    RabbitMq,
    ActiveMq,
    Memcached,
    HttpClient,
    HttpOneShot,
}

impl ProbeKind {
    /// All probes in catalogue order.
    pub const ALL: [Self; 11] = [
        Self::Postgres,
        Self::MySqlPool,
        Self::MySqlConnection,
        Self::SqlServer,
        Self::RedisAsync,
        Self::RedisBlocking,
        Self::RabbitMq,
        Self::ActiveMq,
        Self::Memcached,
        Self::HttpClient,
        Self::HttpOneShot,
    ];

    /// URL path segment under `/probes`.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySqlPool => "mysql-pool",
            Self::MySqlConnection => "mysql-connection",
            Self::SqlServer => "sqlserver",
            Self::RedisAsync => "redis-async",
            Self::RedisBlocking => "redis-blocking",
            Self::RabbitMq => "rabbitmq",
            Self::ActiveMq => "activemq",
            Self::Memcached => "memcached",
            Self::HttpClient => "http-client",
            Self::HttpOneShot => "http-oneshot",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Postgres => "PostgreSQL",
            Self::MySqlPool => "MySQL (pool)",
            Self::MySqlConnection => "MySQL (connection)",
            Self::SqlServer => "SQL Server",
            Self::RedisAsync => "Redis (async)",
            Self::RedisBlocking => "Redis (blocking)",
            Self::RabbitMq => "RabbitMQ",
            Self::ActiveMq => "ActiveMQ",
            Self::Memcached => "Memcached",
            Self::HttpClient => "HTTP (shared client)",
            Self::HttpOneShot => "HTTP (one-off client)",
        }
    }

    /// The external system this probe talks to.
    #[must_use]
    pub const fn target(self) -> ProbeTarget {
        match self {
            Self::Postgres => ProbeTarget::Postgres,
            Self::MySqlPool | Self::MySqlConnection => ProbeTarget::MySql,
            Self::SqlServer => ProbeTarget::SqlServer,
            Self::RedisAsync | Self::RedisBlocking => ProbeTarget::Redis,
            Self::RabbitMq => ProbeTarget::RabbitMq,
            Self::ActiveMq => ProbeTarget::ActiveMq,
            Self::Memcached => ProbeTarget::Memcached,
            Self::HttpClient | Self::HttpOneShot => ProbeTarget::Http,
        }
    }
}

impl FromStr for ProbeKind {
    type Err = ProbeError;

    fn from_str(slug: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == slug)
            .ok_or_else(|| ProbeError::UnknownProbe(slug.to_string()))
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.slug())
    }
}

// =============================================================================
// ProbeRunner
// =============================================================================

/// Runs probes on behalf of the HTTP handlers.
pub trait ProbeRunner: Send + Sync {
    /// Runs one probe to completion.
    ///
    /// Failures inside the probe end up in the returned report. An `Err` means
    /// the probe could not start at all, such as a missing endpoint.
    fn run(&self, kind: ProbeKind) -> BoxFuture<'_, Result<ProbeReport, ProbeError>>;

    /// Whether the endpoint the probe needs is configured.
    fn is_configured(&self, kind: ProbeKind) -> bool;
}

/// Runner that talks to the real external systems.
pub struct LiveProbeRunner {
    config: AppConfig,
    http_client: reqwest::Client,
}

impl LiveProbeRunner {
    /// Creates a runner with a shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AppConfig) -> Result<Self, ProbeError> {
        let http_client = http::shared_client(config.timeouts.connect)?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self, kind: ProbeKind) -> Result<String, ProbeError> {
        let target = kind.target();
        self.config
            .endpoints
            .for_target(target)
            .map(str::to_string)
            .ok_or_else(|| ProbeError::not_configured(target))
    }

    async fn run_probe(&self, kind: ProbeKind) -> Result<ProbeReport, ProbeError> {
        let endpoint = self.endpoint(kind)?;
        let timeouts = self.config.timeouts;

        tracing::info!(probe = %kind, "Running probe");
        let report = match kind {
            ProbeKind::Postgres => postgres::run(&endpoint, timeouts).await,
            ProbeKind::MySqlPool => mysql::run_pooled(&endpoint, timeouts).await,
            ProbeKind::MySqlConnection => mysql::run_single(&endpoint, timeouts).await,
            ProbeKind::SqlServer => sqlserver::run(&endpoint, timeouts).await,
            ProbeKind::RedisAsync => redis::run_async(&endpoint, timeouts).await,
            ProbeKind::RedisBlocking => redis::run_blocking(&endpoint, timeouts).await,
            ProbeKind::RabbitMq => rabbitmq::run(&endpoint, timeouts).await,
            ProbeKind::ActiveMq => activemq::run(&endpoint, timeouts).await,
            ProbeKind::Memcached => memcached::run(&endpoint, timeouts).await,
            ProbeKind::HttpClient => {
                let url = http::probe_url(&endpoint, &self.config.http_probe_path);
                http::run_shared(&self.http_client, &url, timeouts.connect).await
            }
            ProbeKind::HttpOneShot => {
                let url = http::probe_url(&endpoint, &self.config.http_probe_path);
                http::run_oneshot(&url, timeouts).await
            }
        }
        .finish();
        tracing::info!(
            probe = %kind,
            outcome = %report.outcome(),
            elapsed_ms = report.elapsed_ms().unwrap_or_default(),
            "Probe finished"
        );

        Ok(report)
    }
}

impl ProbeRunner for LiveProbeRunner {
    fn run(&self, kind: ProbeKind) -> BoxFuture<'_, Result<ProbeReport, ProbeError>> {
        self.run_probe(kind).boxed()
    }

    fn is_configured(&self, kind: ProbeKind) -> bool {
        self.config.endpoints.for_target(kind.target()).is_some()
    }
}

impl std::fmt::Debug for LiveProbeRunner {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LiveProbeRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Runs `future` under `limit`, mapping an elapsed deadline to
/// [`ProbeError::Timeout`].
async fn within<T, F>(target: ProbeTarget, limit: Duration, future: F) -> Result<T, ProbeError>
where
    F: Future<Output = Result<T, ProbeError>>,
{
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| ProbeError::timeout(target, limit))?
}

/// Records a probe-level error in the report and the log.
fn record_failure(report: &mut ProbeReport, error: &ProbeError) {
    tracing::error!(probe = %report.kind(), error = %error, "Probe failed");
    report.fail(error);
}

/// Records how closing a connection went. A failed close is noted but does
/// not change the outcome of the steps that ran before it.
fn record_close<E: std::fmt::Display>(report: &mut ProbeReport, closed: Result<(), E>) {
    match closed {
        Ok(()) => report.line("Connection closed"),
        Err(error) => {
            tracing::warn!(probe = %report.kind(), error = %error, "Closing connection failed");
            report.line(format!("Connection close failed: {error}"));
        }
    }
}
