//! API integration tests for conncheck.

pub mod health_tests;
pub mod probe_tests;
