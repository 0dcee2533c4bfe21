//! End-to-end tests against a running conncheck deployment.
//!
//! These tests need the service and the external systems it probes to be
//! running, so they are ignored by default. Point them at a deployment and
//! run them explicitly:
//!
//! ```bash
//! CONNCHECK_API_URL=http://localhost:8080 cargo test --test integration_tests -- --ignored
//! ```

mod api;
mod common;
