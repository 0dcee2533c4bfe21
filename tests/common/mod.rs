//! Common test utilities for conncheck integration tests.

pub mod assertions;
pub mod client;
pub mod environment;

pub use assertions::*;
pub use client::*;
pub use environment::*;
