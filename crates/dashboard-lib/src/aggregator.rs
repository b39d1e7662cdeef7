//! Snapshot aggregation
//!
//! One poll cycle fans out to the metric source and every configured probe
//! at once, waits for all of them, then evaluates alert rules over the joined
//! results. Nothing in here fails outright: a dead source becomes a
//! fallback value or a `Critical` service entry inside the snapshot.

use crate::alerts::{evaluate, AlertThresholds};
use crate::collector::{HostMetricSource, MetricSource};
use crate::error::{DashboardError, Result};
use crate::health::{components, HealthRegistry};
use crate::models::{OverallHealth, ServiceStatus, ServiceTarget, Snapshot, SystemMetrics};
use crate::observability::DashboardMetrics;
use crate::probe::{validate_target, HttpProbe, ServiceProbe, DEFAULT_PROBE_TIMEOUT};
use chrono::Utc;
use futures_util::future::join_all;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Slack added on top of the probe timeout before the cycle stops waiting
const PROBE_GRACE: Duration = Duration::from_millis(500);

/// Builds immutable snapshots from the metric source and service probes
pub struct SnapshotAggregator {
    metric_source: Arc<dyn MetricSource>,
    probe: Arc<dyn ServiceProbe>,
    targets: Vec<ServiceTarget>,
    timeout: Duration,
    thresholds: AlertThresholds,
    display: BTreeMap<String, String>,
    health: Option<HealthRegistry>,
    metrics: DashboardMetrics,
}

impl std::fmt::Debug for SnapshotAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotAggregator")
            .field("targets", &self.targets)
            .field("timeout", &self.timeout)
            .field("thresholds", &self.thresholds)
            .finish_non_exhaustive()
    }
}

impl SnapshotAggregator {
    pub fn builder() -> SnapshotAggregatorBuilder {
        SnapshotAggregatorBuilder::new()
    }

    /// Configured targets in probe order
    pub fn targets(&self) -> &[ServiceTarget] {
        &self.targets
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one full poll cycle
    pub async fn build_snapshot(&self) -> Snapshot {
        let start = Instant::now();

        let (system, services) = tokio::join!(self.collect_system(), self.probe_all());

        let alerts = evaluate(&system, &services, &self.thresholds);
        let overall_health = OverallHealth::from_alerts(&alerts);

        let snapshot = Snapshot {
            timestamp: Utc::now(),
            system,
            services,
            overall_health,
            alerts,
            display: self.display.clone(),
        };

        self.metrics.observe_poll_latency(start.elapsed());
        debug!(
            overall_health = %snapshot.overall_health,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Snapshot built"
        );
        snapshot
    }

    /// Collect host metrics, substituting the unavailable fallback on failure
    pub async fn collect_system(&self) -> SystemMetrics {
        let ceiling = self.timeout + PROBE_GRACE;
        let outcome = match tokio::time::timeout(ceiling, self.metric_source.collect()).await {
            Ok(result) => result,
            Err(_) => Err(DashboardError::MetricUnavailable(format!(
                "collection exceeded {}ms",
                ceiling.as_millis()
            ))),
        };

        match outcome {
            Ok(metrics) => {
                self.report(components::METRIC_SOURCE, Ok(())).await;
                metrics
            }
            Err(e) => {
                warn!(error = %e, "Host metrics unavailable, using fallback");
                self.metrics.inc_metric_source_failures();
                self.report(components::METRIC_SOURCE, Err(e.to_string())).await;
                SystemMetrics::unavailable()
            }
        }
    }

    /// Probe a single configured service by name
    pub async fn probe_one(&self, name: &str) -> Result<ServiceStatus> {
        let target = self
            .targets
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| DashboardError::UnknownService(name.to_string()))?;

        Ok(self.probe_target(target).await.0)
    }

    async fn probe_all(&self) -> Vec<ServiceStatus> {
        // join_all yields results in input order, whatever order they finish in
        let results = join_all(self.targets.iter().map(|t| self.probe_target(t))).await;

        let overran: Vec<&str> = results
            .iter()
            .filter(|(_, overran)| *overran)
            .map(|(status, _)| status.name.as_str())
            .collect();
        let outcome = if overran.is_empty() {
            Ok(())
        } else {
            Err(format!("probes ignored their timeout: {}", overran.join(", ")))
        };
        self.report(components::PROBES, outcome).await;

        results.into_iter().map(|(status, _)| status).collect()
    }

    /// Returns the status and whether the probe had to be cut off by the ceiling
    async fn probe_target(&self, target: &ServiceTarget) -> (ServiceStatus, bool) {
        let start = Instant::now();
        let ceiling = self.timeout + PROBE_GRACE;

        let (status, overran) =
            match tokio::time::timeout(ceiling, self.probe.probe(target, self.timeout)).await {
                Ok(status) => (status, false),
                Err(_) => {
                    let error = DashboardError::ProbeTimeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    };
                    (
                        ServiceStatus::critical(
                            target,
                            start.elapsed().as_millis() as u64,
                            error.to_string(),
                        ),
                        true,
                    )
                }
            };

        self.metrics
            .observe_probe_latency(&target.name, status.response_time_ms);
        (status, overran)
    }

    async fn report(&self, component: &str, outcome: std::result::Result<(), String>) {
        if let Some(health) = &self.health {
            health.record(component, outcome).await;
        }
    }
}

/// Builder for [`SnapshotAggregator`]
pub struct SnapshotAggregatorBuilder {
    metric_source: Option<Arc<dyn MetricSource>>,
    probe: Option<Arc<dyn ServiceProbe>>,
    targets: Vec<ServiceTarget>,
    timeout: Duration,
    thresholds: AlertThresholds,
    display: BTreeMap<String, String>,
    health: Option<HealthRegistry>,
}

impl SnapshotAggregatorBuilder {
    pub fn new() -> Self {
        Self {
            metric_source: None,
            probe: None,
            targets: Vec::new(),
            timeout: DEFAULT_PROBE_TIMEOUT,
            thresholds: AlertThresholds::default(),
            display: BTreeMap::new(),
            health: None,
        }
    }

    /// Set the metric source (defaults to the host)
    pub fn metric_source(mut self, source: Arc<dyn MetricSource>) -> Self {
        self.metric_source = Some(source);
        self
    }

    /// Set the probe implementation (defaults to HTTP)
    pub fn probe(mut self, probe: Arc<dyn ServiceProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn targets(mut self, targets: Vec<ServiceTarget>) -> Self {
        self.targets = targets;
        self
    }

    pub fn target(mut self, target: ServiceTarget) -> Self {
        self.targets.push(target);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Static fields copied verbatim into every snapshot
    pub fn display(mut self, display: BTreeMap<String, String>) -> Self {
        self.display = display;
        self
    }

    pub fn health_registry(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Validate targets and build the aggregator
    pub fn build(self) -> Result<SnapshotAggregator> {
        let mut seen = HashSet::new();
        for target in &self.targets {
            validate_target(target)?;
            if !seen.insert(target.name.as_str()) {
                return Err(DashboardError::InvalidTarget(format!(
                    "duplicate service name {}",
                    target.name
                )));
            }
        }

        if self.timeout.is_zero() {
            return Err(DashboardError::InvalidTarget(
                "probe timeout must be greater than zero".to_string(),
            ));
        }

        let probe: Arc<dyn ServiceProbe> = match self.probe {
            Some(probe) => probe,
            None => Arc::new(HttpProbe::new()?),
        };

        Ok(SnapshotAggregator {
            metric_source: self
                .metric_source
                .unwrap_or_else(|| Arc::new(HostMetricSource::new())),
            probe,
            targets: self.targets,
            timeout: self.timeout,
            thresholds: self.thresholds,
            display: self.display,
            health: self.health,
            metrics: DashboardMetrics::new(),
        })
    }
}

impl Default for SnapshotAggregatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
