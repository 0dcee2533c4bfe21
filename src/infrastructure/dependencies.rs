//! Dependency injection container for the service.
//!
//! Handlers never talk to external systems directly; they go through the
//! [`ProbeRunner`] held here, so router tests can swap in a mock runner.
//!
//! # Example
//!
//! ```rust,ignore
//! use conncheck::infrastructure::{AppConfig, AppDependencies};
//! use conncheck::probes::LiveProbeRunner;
//! use std::sync::Arc;
//!
//! let config = AppConfig::from_env()?;
//! let runner = Arc::new(LiveProbeRunner::new(config.clone())?);
//! let dependencies = AppDependencies::new(config, runner);
//! ```

use std::sync::Arc;

use super::config::AppConfig;
use crate::probes::ProbeRunner;

/// Application dependency container.
///
/// Cheap to clone: the runner is shared behind an `Arc`.
#[derive(Clone)]
pub struct AppDependencies {
    config: AppConfig,
    runner: Arc<dyn ProbeRunner>,
}

impl AppDependencies {
    #[must_use]
    pub fn new(config: AppConfig, runner: Arc<dyn ProbeRunner>) -> Self {
        Self { config, runner }
    }

    /// Returns a reference to the application configuration.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Returns the probe runner.
    #[must_use]
    pub fn runner(&self) -> &Arc<dyn ProbeRunner> {
        &self.runner
    }
}

impl std::fmt::Debug for AppDependencies {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AppDependencies")
            .field("config", &self.config)
            .field("runner", &"<dyn ProbeRunner>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ProbeError;
    use crate::probes::{ProbeKind, ProbeReport};
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use rstest::rstest;

    struct MockRunner;

    impl ProbeRunner for MockRunner {
        fn run(&self, kind: ProbeKind) -> BoxFuture<'_, Result<ProbeReport, ProbeError>> {
            async move { Ok(ProbeReport::begin(kind).finish()) }.boxed()
        }

        fn is_configured(&self, _kind: ProbeKind) -> bool {
            true
        }
    }

    #[rstest]
    fn debug_hides_runner() {
        let dependencies = AppDependencies::new(AppConfig::default(), Arc::new(MockRunner));

        let debug = format!("{dependencies:?}");

        assert!(debug.contains("<dyn ProbeRunner>"));
        assert!(debug.contains("app_port: 8080"));
    }

    #[rstest]
    #[tokio::test]
    async fn runner_is_shared_between_clones() {
        let dependencies = AppDependencies::new(AppConfig::default(), Arc::new(MockRunner));
        let cloned = dependencies.clone();

        assert!(Arc::ptr_eq(dependencies.runner(), cloned.runner()));

        let report = cloned.runner().run(ProbeKind::Memcached).await.unwrap();
        assert_eq!(report.kind(), ProbeKind::Memcached);
    }
}
