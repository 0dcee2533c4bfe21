//! # conncheck
//!
//! A diagnostic web service that smoke-tests connectivity to the external
//! systems an application depends on: PostgreSQL, MySQL, SQL Server, Redis,
//! RabbitMQ, ActiveMQ, memcached and outbound HTTP services.
//!
//! Every probe opens a connection with the system's client crate, runs a
//! short sequence of canned operations and returns a report with one line
//! per step.
//!
//! # Modules
//!
//! - [`api`]: Axum routes, handlers and error mapping
//! - [`infrastructure`]: configuration, connection strings, error types and
//!   dependency injection
//! - [`probes`]: the probes and their reports

pub mod api;
pub mod infrastructure;
pub mod probes;
