//! Probe error types.
//!
//! Every failure a probe can hit is folded into [`ProbeError`], tagged with
//! the external system ([`ProbeTarget`]) it happened against.
//!
//! # Error Categories
//!
//! - [`ProbeError::NotConfigured`]: the endpoint for a probe is not set
//! - [`ProbeError::UnknownProbe`]: no probe is registered under a slug
//! - [`ProbeError::InvalidConnectionString`]: an endpoint could not be parsed
//! - [`ProbeError::Connection`]: the external system could not be reached
//! - [`ProbeError::Operation`]: a command or query failed after connecting
//! - [`ProbeError::Timeout`]: an operation exceeded its deadline
//! - [`ProbeError::Task`]: a spawned blocking or listener task died
//!
//! # Examples
//!
//! ```
//! use conncheck::infrastructure::{ProbeError, ProbeTarget};
//!
//! let error = ProbeError::connection(ProbeTarget::Redis, "connection refused");
//! assert!(error.is_connection());
//! assert_eq!(error.target(), Some(ProbeTarget::Redis));
//! ```

use std::time::Duration;

use thiserror::Error;

// =============================================================================
// ProbeTarget
// =============================================================================

/// External system a probe talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeTarget {
    Postgres,
    MySql,
    SqlServer,
    Redis,
    RabbitMq,
    ActiveMq,
    Memcached,
    Http,
}

impl ProbeTarget {
    pub const ALL: [Self; 8] = [
        Self::Postgres,
        Self::MySql,
        Self::SqlServer,
        Self::Redis,
        Self::RabbitMq,
        Self::ActiveMq,
        Self::Memcached,
        Self::Http,
    ];

    /// Human-readable name used in report lines and error messages.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Postgres => "PostgreSQL",
            Self::MySql => "MySQL",
            Self::SqlServer => "SQL Server",
            Self::Redis => "Redis",
            Self::RabbitMq => "RabbitMQ",
            Self::ActiveMq => "ActiveMQ",
            Self::Memcached => "Memcached",
            Self::Http => "HTTP",
        }
    }

    /// Environment variable holding this target's endpoint.
    #[must_use]
    pub const fn env_key(self) -> &'static str {
        match self {
            Self::Postgres => "POSTGRES_URL",
            Self::MySql => "MYSQL_URL",
            Self::SqlServer => "SQLSERVER_CONNECTION_STRING",
            Self::Redis => "REDIS_CONNECTION_STRING",
            Self::RabbitMq => "RABBITMQ_URL",
            Self::ActiveMq => "ACTIVEMQ_URL",
            Self::Memcached => "MEMCACHED_ENDPOINT",
            Self::Http => "HTTP_SERVICE_URL",
        }
    }
}

impl std::fmt::Display for ProbeTarget {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.display_name())
    }
}

// =============================================================================
// ProbeError
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The endpoint for the target is not configured.
    #[error("{target} is not configured: set {key}")]
    NotConfigured {
        target: ProbeTarget,
        key: &'static str,
    },

    /// No probe is registered under the requested slug.
    #[error("unknown probe '{0}'")]
    UnknownProbe(String),

    /// The configured endpoint could not be parsed.
    #[error("invalid {target} connection string: {message}")]
    InvalidConnectionString {
        target: ProbeTarget,
        message: String,
    },

    /// The external system could not be reached.
    #[error("connection to {target} failed: {message}")]
    Connection {
        target: ProbeTarget,
        message: String,
    },

    /// A command, query or request failed after the connection was up.
    #[error("{target} operation failed: {message}")]
    Operation {
        target: ProbeTarget,
        message: String,
    },

    /// An operation did not complete before its deadline.
    #[error("{target} operation timed out after {elapsed_ms}ms")]
    Timeout { target: ProbeTarget, elapsed_ms: u64 },

    /// A spawned task panicked or was cancelled.
    #[error("probe task failed: {0}")]
    Task(String),
}

// =============================================================================
// Factory Methods
// =============================================================================

impl ProbeError {
    #[must_use]
    pub const fn not_configured(target: ProbeTarget) -> Self {
        Self::NotConfigured {
            target,
            key: target.env_key(),
        }
    }

    #[must_use]
    pub fn invalid_connection_string(target: ProbeTarget, message: impl Into<String>) -> Self {
        Self::InvalidConnectionString {
            target,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn connection(target: ProbeTarget, message: impl Into<String>) -> Self {
        Self::Connection {
            target,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn operation(target: ProbeTarget, message: impl Into<String>) -> Self {
        Self::Operation {
            target,
            message: message.into(),
        }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn timeout(target: ProbeTarget, after: Duration) -> Self {
        Self::Timeout {
            target,
            elapsed_ms: after.as_millis() as u64,
        }
    }

    /// Classifies a sqlx error for the given database target.
    ///
    /// `limit` is the acquire timeout the pool was configured with.
    #[must_use]
    pub fn from_sqlx(target: ProbeTarget, error: &sqlx::Error, limit: Duration) -> Self {
        match error {
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => Self::connection(target, error.to_string()),
            sqlx::Error::Configuration(_) => {
                Self::invalid_connection_string(target, error.to_string())
            }
            sqlx::Error::PoolTimedOut => Self::timeout(target, limit),
            _ => Self::operation(target, error.to_string()),
        }
    }

    /// Classifies a Redis client error.
    ///
    /// `limit` is the connect and response timeout of the connection.
    #[must_use]
    pub fn from_redis(error: &redis::RedisError, limit: Duration) -> Self {
        if error.is_timeout() {
            Self::timeout(ProbeTarget::Redis, limit)
        } else if error.is_connection_refusal() || error.is_io_error() {
            Self::connection(ProbeTarget::Redis, error.to_string())
        } else {
            Self::operation(ProbeTarget::Redis, error.to_string())
        }
    }
}

// =============================================================================
// Query Methods
// =============================================================================

impl ProbeError {
    #[must_use]
    pub const fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured { .. })
    }

    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns the external system this error is attributed to, if any.
    #[must_use]
    pub const fn target(&self) -> Option<ProbeTarget> {
        match self {
            Self::NotConfigured { target, .. }
            | Self::InvalidConnectionString { target, .. }
            | Self::Connection { target, .. }
            | Self::Operation { target, .. }
            | Self::Timeout { target, .. } => Some(*target),
            Self::UnknownProbe(_) | Self::Task(_) => None,
        }
    }
}

impl From<tokio::task::JoinError> for ProbeError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::Task(error.to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    mod probe_target {
        use super::*;

        #[rstest]
        #[case(ProbeTarget::Postgres, "PostgreSQL", "POSTGRES_URL")]
        #[case(ProbeTarget::SqlServer, "SQL Server", "SQLSERVER_CONNECTION_STRING")]
        #[case(ProbeTarget::Redis, "Redis", "REDIS_CONNECTION_STRING")]
        #[case(ProbeTarget::Memcached, "Memcached", "MEMCACHED_ENDPOINT")]
        fn names_and_keys(
            #[case] target: ProbeTarget,
            #[case] name: &str,
            #[case] key: &str,
        ) {
            assert_eq!(target.display_name(), name);
            assert_eq!(target.to_string(), name);
            assert_eq!(target.env_key(), key);
        }
    }

    mod display {
        use super::*;

        #[rstest]
        fn not_configured_names_the_variable() {
            let error = ProbeError::not_configured(ProbeTarget::RabbitMq);

            assert_eq!(
                error.to_string(),
                "RabbitMQ is not configured: set RABBITMQ_URL"
            );
        }

        #[rstest]
        fn connection_includes_target_and_message() {
            let error = ProbeError::connection(ProbeTarget::MySql, "connection refused");

            assert_eq!(
                error.to_string(),
                "connection to MySQL failed: connection refused"
            );
        }

        #[rstest]
        fn timeout_reports_milliseconds() {
            let error = ProbeError::timeout(ProbeTarget::Http, Duration::from_secs(2));

            assert_eq!(error.to_string(), "HTTP operation timed out after 2000ms");
        }
    }

    mod classification {
        use super::*;

        const LIMIT: Duration = Duration::from_secs(2);

        #[rstest]
        fn sqlx_io_error_is_connection() {
            let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
            let error = ProbeError::from_sqlx(ProbeTarget::Postgres, &sqlx::Error::Io(io), LIMIT);

            assert!(error.is_connection());
            assert_eq!(error.target(), Some(ProbeTarget::Postgres));
        }

        #[rstest]
        fn sqlx_pool_timeout_carries_acquire_limit() {
            let error =
                ProbeError::from_sqlx(ProbeTarget::MySql, &sqlx::Error::PoolTimedOut, LIMIT);

            assert_eq!(error, ProbeError::timeout(ProbeTarget::MySql, LIMIT));
            assert_eq!(error.to_string(), "MySQL operation timed out after 2000ms");
        }

        #[rstest]
        fn sqlx_row_not_found_is_operation() {
            let error =
                ProbeError::from_sqlx(ProbeTarget::MySql, &sqlx::Error::RowNotFound, LIMIT);

            assert!(matches!(error, ProbeError::Operation { .. }));
        }

        #[rstest]
        fn redis_io_error_is_connection() {
            let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
            let error = ProbeError::from_redis(&redis::RedisError::from(io), LIMIT);

            assert!(error.is_connection());
        }

        #[rstest]
        fn redis_timed_out_io_carries_limit() {
            let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
            let error = ProbeError::from_redis(&redis::RedisError::from(io), LIMIT);

            assert_eq!(error, ProbeError::timeout(ProbeTarget::Redis, LIMIT));
            assert_eq!(error.to_string(), "Redis operation timed out after 2000ms");
        }

        #[rstest]
        fn unknown_probe_has_no_target() {
            let error = ProbeError::UnknownProbe("kafka".to_string());

            assert_eq!(error.target(), None);
            assert!(!error.is_not_configured());
        }
    }
}
