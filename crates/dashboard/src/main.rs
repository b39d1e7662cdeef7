//! Status Dashboard - single-host status page
//!
//! Polls configured HTTP health endpoints and local OS metrics, keeps a
//! bounded alert history and serves the result as HTML and JSON.

use anyhow::Result;
use dashboard_lib::{Poller, StructuredLogger};
use status_dashboard::{api, build_dashboard, config::DashboardConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DASHBOARD_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting status-dashboard");

    let config = DashboardConfig::load()?;
    info!(
        port = config.port,
        services = config.services.len(),
        poll_interval_secs = config.poll_interval_secs,
        "Dashboard configured"
    );

    let logger = StructuredLogger::new(&config.service_name);
    let dashboard = build_dashboard(&config, logger.clone()).await?;
    logger.log_startup(DASHBOARD_VERSION, config.port, config.services.len());

    let poller = Poller::new(dashboard.clone(), config.poll_interval()).start();

    let app_state = Arc::new(
        api::AppState::new(dashboard, config.service_name.clone(), config.port)
            .with_refresh_secs(config.refresh_secs),
    );

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let served = api::serve(config.port, app_state, shutdown).await;

    logger.log_shutdown("SIGINT received");
    poller.stop().await;
    info!("Shutting down");

    served
}
