//! conncheck entry point.
//!
//! Loads configuration, builds the live probe runner and serves the API until
//! Ctrl+C or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use conncheck::api::create_router;
use conncheck::infrastructure::{AppConfig, AppDependencies, ProbeTarget};
use conncheck::probes::LiveProbeRunner;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,conncheck=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting conncheck...");

    let config = match AppConfig::from_env() {
        Ok(config) => {
            tracing::info!(
                "Configuration loaded: host={}, port={}",
                config.app_host,
                config.app_port
            );
            config
        }
        Err(e) => {
            tracing::warn!("Failed to load configuration from environment: {e}");
            tracing::info!("Using default configuration");
            AppConfig::default()
        }
    };
    log_endpoints(&config);

    let bind_address = config.bind_address();
    let runner = LiveProbeRunner::new(config.clone()).context("failed to build probe runner")?;
    let dependencies = AppDependencies::new(config, Arc::new(runner));

    let app = create_router(dependencies).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    tracing::info!("conncheck started on http://{bind_address}");
    tracing::info!("  GET  /                - Service info and probe catalogue");
    tracing::info!("  GET  /health          - Health check");
    tracing::info!("  GET  /probes          - Probe catalogue");
    tracing::info!("  GET  /probes/{{slug}}   - Run a probe (?format=text)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("conncheck stopped");
    Ok(())
}

fn log_endpoints(config: &AppConfig) {
    for target in ProbeTarget::ALL {
        if config.endpoints.for_target(target).is_some() {
            tracing::debug!(%target, "Endpoint configured");
        } else {
            tracing::debug!(%target, key = target.env_key(), "Endpoint not configured");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
