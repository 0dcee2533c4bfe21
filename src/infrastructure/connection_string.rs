//! Connection string normalization.
//!
//! Endpoints are configured the way operators usually write them, which is
//! not always the form the client crates accept. The helpers here turn them
//! into URLs the clients understand:
//!
//! - Redis: `host:port,password=...,ssl=true,defaultDatabase=2` or a
//!   `redis://` / `rediss://` URL
//! - memcached: `host:port` or a `memcache://` URL
//! - ActiveMQ: `activemq:tcp://host:port`, `tcp://`, `ssl://` or an
//!   `amqp://` / `amqps://` URL

use url::Url;

use super::errors::{ProbeError, ProbeTarget};

const REDIS_DEFAULT_PORT: u16 = 6379;
const MEMCACHED_DEFAULT_PORT: u16 = 11211;

// =============================================================================
// Redis
// =============================================================================

/// Converts a Redis connection string into a URL accepted by the `redis` crate.
///
/// URLs with a `redis` or `rediss` scheme are returned unchanged. Otherwise
/// the value is read as a comma separated list whose first plain entry is the
/// endpoint and whose `key=value` entries are options. Options other than
/// `user`, `password`, `ssl` and `defaultDatabase` are ignored.
///
/// # Errors
///
/// Returns `ProbeError::InvalidConnectionString` when no endpoint is present
/// or an option value cannot be used.
pub fn parse_redis_connection_string(raw: &str) -> Result<String, ProbeError> {
    let raw = raw.trim();
    if raw.starts_with("redis://") || raw.starts_with("rediss://") {
        Url::parse(raw).map_err(|error| invalid(ProbeTarget::Redis, error))?;
        return Ok(raw.to_string());
    }

    let mut endpoint = None;
    let mut user = None;
    let mut password = None;
    let mut ssl = false;
    let mut database = 0_u32;

    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        match part.split_once('=') {
            None => {
                endpoint.get_or_insert(part);
            }
            Some((key, value)) => match key.trim().to_ascii_lowercase().as_str() {
                "user" => user = Some(value.trim()),
                "password" => password = Some(value),
                "ssl" => {
                    ssl = value.trim().parse().map_err(|_| {
                        ProbeError::invalid_connection_string(
                            ProbeTarget::Redis,
                            format!("ssl must be true or false, got '{value}'"),
                        )
                    })?;
                }
                "defaultdatabase" => {
                    database = value.trim().parse().map_err(|_| {
                        ProbeError::invalid_connection_string(
                            ProbeTarget::Redis,
                            format!("defaultDatabase must be a number, got '{value}'"),
                        )
                    })?;
                }
                _ => {}
            },
        }
    }

    let endpoint = endpoint.ok_or_else(|| {
        ProbeError::invalid_connection_string(ProbeTarget::Redis, "no host:port endpoint given")
    })?;
    let endpoint = with_default_port(endpoint, REDIS_DEFAULT_PORT);
    let scheme = if ssl { "rediss" } else { "redis" };

    let mut url = Url::parse(&format!("{scheme}://{endpoint}/{database}"))
        .map_err(|error| invalid(ProbeTarget::Redis, error))?;
    if let Some(user) = user {
        url.set_username(user).map_err(|()| {
            ProbeError::invalid_connection_string(ProbeTarget::Redis, "user cannot be set")
        })?;
    }
    if let Some(password) = password {
        url.set_password(Some(password)).map_err(|()| {
            ProbeError::invalid_connection_string(ProbeTarget::Redis, "password cannot be set")
        })?;
    }

    Ok(url.to_string())
}

// =============================================================================
// memcached
// =============================================================================

/// Converts a memcached endpoint into a `memcache://` URL.
///
/// # Errors
///
/// Returns `ProbeError::InvalidConnectionString` when the endpoint is empty or
/// does not form a valid URL.
pub fn parse_memcached_endpoint(raw: &str) -> Result<String, ProbeError> {
    let raw = raw.trim();
    if raw.starts_with("memcache://") {
        Url::parse(raw).map_err(|error| invalid(ProbeTarget::Memcached, error))?;
        return Ok(raw.to_string());
    }
    if raw.is_empty() {
        return Err(ProbeError::invalid_connection_string(
            ProbeTarget::Memcached,
            "endpoint is empty",
        ));
    }

    let url = format!("memcache://{}", with_default_port(raw, MEMCACHED_DEFAULT_PORT));
    Url::parse(&url).map_err(|error| invalid(ProbeTarget::Memcached, error))?;
    Ok(url)
}

// =============================================================================
// ActiveMQ
// =============================================================================

/// Normalizes an ActiveMQ broker URL to an AMQP 1.0 URL.
///
/// An `activemq:` prefix is stripped, `tcp` becomes `amqp` and `ssl` becomes
/// `amqps`. Query parameters (OpenWire transport options) are dropped.
///
/// # Errors
///
/// Returns `ProbeError::InvalidConnectionString` for unsupported schemes or
/// values that are not URLs.
pub fn normalize_activemq_url(raw: &str) -> Result<Url, ProbeError> {
    let raw = raw.trim();
    let raw = raw.strip_prefix("activemq:").unwrap_or(raw);

    let (scheme, rest) = raw.split_once("://").ok_or_else(|| {
        ProbeError::invalid_connection_string(
            ProbeTarget::ActiveMq,
            format!("'{raw}' is not a URL"),
        )
    })?;
    let scheme = match scheme.to_ascii_lowercase().as_str() {
        "tcp" | "amqp" => "amqp",
        "ssl" | "amqps" => "amqps",
        other => {
            return Err(ProbeError::invalid_connection_string(
                ProbeTarget::ActiveMq,
                format!("unsupported scheme '{other}'"),
            ));
        }
    };

    let mut url = Url::parse(&format!("{scheme}://{rest}"))
        .map_err(|error| invalid(ProbeTarget::ActiveMq, error))?;
    url.set_query(None);
    Ok(url)
}

// =============================================================================
// Helpers
// =============================================================================

fn with_default_port(endpoint: &str, port: u16) -> String {
    let has_port = endpoint
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
    if has_port {
        endpoint.to_string()
    } else {
        format!("{endpoint}:{port}")
    }
}

fn invalid(target: ProbeTarget, error: url::ParseError) -> ProbeError {
    ProbeError::invalid_connection_string(target, error.to_string())
}
