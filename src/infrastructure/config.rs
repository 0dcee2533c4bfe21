//! Application configuration management.
//!
//! Configuration is read from environment variables (and a `.env` file when
//! present). Every probe endpoint is optional: an unset endpoint only
//! disables the probes that need it.
//!
//! Parsing is done through a lookup function so that [`AppConfig::from_lookup`]
//! can be exercised in tests without mutating the process environment.
//!
//! # Example
//!
//! ```rust,ignore
//! use conncheck::infrastructure::AppConfig;
//!
//! let config = AppConfig::from_env()?;
//! println!("Listening on {}", config.bind_address());
//! ```

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use super::errors::ProbeTarget;

/// Configuration error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable has a value that cannot be used.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// The name of the environment variable.
        key: String,
        /// Description of why the value is invalid.
        message: String,
    },
}

/// Endpoints of the external systems under test.
///
/// Each field holds the raw connection string as configured; probes parse
/// them at run time so that a malformed value shows up in the probe report.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProbeEndpoints {
    pub postgres_url: Option<String>,
    pub mysql_url: Option<String>,
    pub sqlserver_connection_string: Option<String>,
    pub redis_connection_string: Option<String>,
    pub rabbitmq_url: Option<String>,
    pub activemq_url: Option<String>,
    pub memcached_endpoint: Option<String>,
    pub http_service_url: Option<String>,
}

impl ProbeEndpoints {
    /// Returns the configured endpoint for a target.
    #[must_use]
    pub fn for_target(&self, target: ProbeTarget) -> Option<&str> {
        let endpoint = match target {
            ProbeTarget::Postgres => &self.postgres_url,
            ProbeTarget::MySql => &self.mysql_url,
            ProbeTarget::SqlServer => &self.sqlserver_connection_string,
            ProbeTarget::Redis => &self.redis_connection_string,
            ProbeTarget::RabbitMq => &self.rabbitmq_url,
            ProbeTarget::ActiveMq => &self.activemq_url,
            ProbeTarget::Memcached => &self.memcached_endpoint,
            ProbeTarget::Http => &self.http_service_url,
        };
        endpoint.as_deref()
    }
}

/// Timeouts applied by the probes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeTimeouts {
    /// Connect and request timeout.
    pub connect: Duration,
    /// How long a message round-trip waits for its consumer.
    pub message_wait: Duration,
    /// TTL used by the Redis key expiry check.
    pub key_expiry: Duration,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            message_wait: Duration::from_secs(5),
            key_expiry: Duration::from_secs(5),
        }
    }
}

/// Application configuration.
///
/// # Fields
///
/// - `app_host` / `app_port`: HTTP bind address
/// - `endpoints`: connection strings of the systems under test
/// - `http_probe_path`: path requested by the HTTP probes
/// - `timeouts`: probe timeouts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    /// HTTP server host address.
    pub app_host: String,
    /// HTTP server port.
    pub app_port: u16,
    /// Endpoints of the external systems.
    pub endpoints: ProbeEndpoints,
    /// Path appended to `HTTP_SERVICE_URL` by the HTTP probes.
    pub http_probe_path: String,
    /// Probe timeouts.
    pub timeouts: ProbeTimeouts,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HTTP_PROBE_PATH: &str = "/api/weatherforecast";
/// Upper bound for every probe timeout (one hour).
const MAX_TIMEOUT_SECS: u64 = 3600;

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_host: DEFAULT_HOST.to_string(),
            app_port: DEFAULT_PORT,
            endpoints: ProbeEndpoints::default(),
            http_probe_path: DEFAULT_HTTP_PROBE_PATH.to_string(),
            timeouts: ProbeTimeouts::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `APP_HOST` (default `0.0.0.0`), `APP_PORT` (default `8080`)
    /// - `POSTGRES_URL`, `MYSQL_URL`, `SQLSERVER_CONNECTION_STRING`,
    ///   `REDIS_CONNECTION_STRING`, `RABBITMQ_URL`, `ACTIVEMQ_URL`,
    ///   `MEMCACHED_ENDPOINT`, `HTTP_SERVICE_URL` (all optional)
    /// - `HTTP_PROBE_PATH` (default `/api/weatherforecast`)
    /// - `PROBE_CONNECT_TIMEOUT_SECS` (default 30); every timeout is 1 to 3600
    ///   seconds
    /// - `MESSAGE_WAIT_TIMEOUT_SECS` (default 5)
    /// - `REDIS_EXPIRY_TTL_SECS` (default 5)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors if file doesn't exist)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric value cannot be parsed
    /// or a timeout is zero or longer than an hour.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let endpoints = ProbeEndpoints {
            postgres_url: get(ProbeTarget::Postgres.env_key()),
            mysql_url: get(ProbeTarget::MySql.env_key()),
            sqlserver_connection_string: get(ProbeTarget::SqlServer.env_key()),
            redis_connection_string: get(ProbeTarget::Redis.env_key()),
            rabbitmq_url: get(ProbeTarget::RabbitMq.env_key()),
            activemq_url: get(ProbeTarget::ActiveMq.env_key()),
            memcached_endpoint: get(ProbeTarget::Memcached.env_key()),
            http_service_url: get(ProbeTarget::Http.env_key()),
        };

        let defaults = ProbeTimeouts::default();
        let timeouts = ProbeTimeouts {
            connect: parse_seconds(
                "PROBE_CONNECT_TIMEOUT_SECS",
                get("PROBE_CONNECT_TIMEOUT_SECS"),
                defaults.connect,
            )?,
            message_wait: parse_seconds(
                "MESSAGE_WAIT_TIMEOUT_SECS",
                get("MESSAGE_WAIT_TIMEOUT_SECS"),
                defaults.message_wait,
            )?,
            key_expiry: parse_seconds(
                "REDIS_EXPIRY_TTL_SECS",
                get("REDIS_EXPIRY_TTL_SECS"),
                defaults.key_expiry,
            )?,
        };

        Ok(Self {
            app_host: get("APP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            app_port: parse_value("APP_PORT", get("APP_PORT"), DEFAULT_PORT)?,
            endpoints,
            http_probe_path: get("HTTP_PROBE_PATH")
                .unwrap_or_else(|| DEFAULT_HTTP_PROBE_PATH.to_string()),
            timeouts,
        })
    }

    /// Returns the `host:port` string the server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app_host, self.app_port)
    }
}

/// Parses an optional value, falling back to a default when unset.
fn parse_value<T>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.map_or_else(
        || Ok(default),
        |raw| {
            raw.parse().map_err(|error: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: error.to_string(),
            })
        },
    )
}

/// Parses a whole number of seconds between 1 and [`MAX_TIMEOUT_SECS`].
fn parse_seconds(
    key: &str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let seconds = parse_value(key, value, default.as_secs())?;
    let message = if seconds == 0 {
        "must be greater than zero".to_string()
    } else if seconds > MAX_TIMEOUT_SECS {
        format!("must be at most {MAX_TIMEOUT_SECS} seconds")
    } else {
        return Ok(Duration::from_secs(seconds));
    };
    Err(ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    })
}
