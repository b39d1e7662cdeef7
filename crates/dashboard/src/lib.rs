//! Status dashboard server
//!
//! Wires configuration into the dashboard library and exposes the HTTP API.

pub mod api;
pub mod config;

use anyhow::{Context, Result};
use config::DashboardConfig;
use dashboard_lib::{
    AlertLog, Dashboard, HealthRegistry, HostMetricSource, HttpProbe, SnapshotAggregator,
    StructuredLogger,
};
use std::sync::Arc;

/// Build the dashboard described by `config`
pub async fn build_dashboard(config: &DashboardConfig, logger: StructuredLogger) -> Result<Dashboard> {
    let health = HealthRegistry::with_default_components();

    let aggregator = SnapshotAggregator::builder()
        .metric_source(Arc::new(HostMetricSource::new()))
        .probe(Arc::new(HttpProbe::new().context("Failed to create HTTP probe")?))
        .targets(config.services.clone())
        .timeout(config.probe_timeout())
        .thresholds(config.thresholds.clone())
        .display(config.display.clone())
        .health_registry(health.clone())
        .build()
        .context("Invalid service configuration")?;

    let log = match &config.history_path {
        Some(path) => AlertLog::open(path, config.history_retention),
        None => AlertLog::new(config.history_retention),
    }
    .with_health_registry(health.clone())
    .with_logger(logger.clone());

    Ok(Dashboard::new(Arc::new(aggregator), log, health, logger))
}
