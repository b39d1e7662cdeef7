//! Host metrics collection
//!
//! A `MetricSource` answers one question: what does the local machine look
//! like right now. Implementations are pure reads and hold no state that
//! survives between calls.

mod host;

pub use host::HostMetricSource;

use crate::error::{DashboardError, Result};
use crate::models::SystemMetrics;

pub use async_trait::async_trait;

/// Trait for system metrics collection implementations
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Collect a fresh sample of host metrics
    async fn collect(&self) -> Result<SystemMetrics>;
}

/// Fixed-value source, used for fixtures and for hosts without metrics access
#[derive(Debug, Clone)]
pub struct StaticMetricSource {
    outcome: std::result::Result<SystemMetrics, String>,
}

impl StaticMetricSource {
    pub fn new(metrics: SystemMetrics) -> Self {
        Self {
            outcome: Ok(metrics),
        }
    }

    /// A source whose every collection fails with `MetricUnavailable`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            outcome: Err(reason.into()),
        }
    }
}

#[async_trait]
impl MetricSource for StaticMetricSource {
    async fn collect(&self) -> Result<SystemMetrics> {
        self.outcome
            .clone()
            .map_err(DashboardError::MetricUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source_returns_fixture() {
        let metrics = SystemMetrics::measured(1.0, 2, 10, 20, 30, 40, 5, 100, "h", "p");
        let source = StaticMetricSource::new(metrics.clone());
        assert_eq!(source.collect().await.unwrap(), metrics);
    }

    #[tokio::test]
    async fn test_failing_source_reports_metric_unavailable() {
        let source = StaticMetricSource::failing("no /proc");
        let err = source.collect().await.unwrap_err();
        assert!(matches!(err, DashboardError::MetricUnavailable(ref m) if m == "no /proc"));
    }
}
