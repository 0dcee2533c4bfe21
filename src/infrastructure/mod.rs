//! Infrastructure layer.
//!
//! - `config` - settings loaded from environment variables
//! - `connection_string` - normalization of configured endpoints
//! - `dependencies` - dependency injection container
//! - `errors` - probe error types

mod config;
mod connection_string;
mod dependencies;
mod errors;

pub use config::{AppConfig, ConfigError, ProbeEndpoints, ProbeTimeouts};
pub use connection_string::{
    normalize_activemq_url, parse_memcached_endpoint, parse_redis_connection_string,
};
pub use dependencies::AppDependencies;
pub use errors::{ProbeError, ProbeTarget};
