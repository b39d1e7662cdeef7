//! Status dashboard library
//!
//! This crate provides the core functionality for:
//! - Host metrics collection
//! - Bounded-timeout HTTP service probes
//! - Snapshot aggregation and alert rules
//! - Bounded alert history with JSON persistence
//! - Periodic polling, self-health and observability
//! - HTML rendering of snapshots

pub mod aggregator;
pub mod alerts;
pub mod collector;
pub mod error;
pub mod health;
pub mod history;
pub mod models;
pub mod observability;
pub mod poller;
pub mod presenter;
pub mod probe;

pub use aggregator::{SnapshotAggregator, SnapshotAggregatorBuilder};
pub use alerts::AlertThresholds;
pub use collector::{HostMetricSource, MetricSource, StaticMetricSource};
pub use error::{DashboardError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthReport, Readiness,
    UNHEALTHY_AFTER_FAILURES,
};
pub use history::{AlertHistory, AlertLog, HistoryEntry, HistorySummary};
pub use models::*;
pub use observability::{DashboardMetrics, StructuredLogger};
pub use poller::{Dashboard, Poller, PollerHandle};
pub use probe::{HttpProbe, ServiceProbe};
