//! Self-health of the dashboard process
//!
//! Tracks the dashboard's own machinery (host collection, probing, history
//! persistence, the poller), never the services it monitors. A monitored
//! service going down leaves every component here healthy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Component names tracked by the dashboard
pub mod components {
    pub const METRIC_SOURCE: &str = "metric_source";
    pub const PROBES: &str = "probes";
    pub const HISTORY: &str = "history";
    pub const POLLER: &str = "poller";

    pub const ALL: &[&str] = &[METRIC_SOURCE, PROBES, HISTORY, POLLER];
}

/// Failures in a row after which a degraded component turns unhealthy
pub const UNHEALTHY_AFTER_FAILURES: u32 = 5;

/// Ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Working with a fallback or a lost side effect
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    /// Whether the dashboard still answers requests in this state
    pub fn is_operational(&self) -> bool {
        *self != ComponentStatus::Unhealthy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the component entered its current status
    pub since: DateTime<Utc>,
    /// Failed operations since the last success
    #[serde(default)]
    pub consecutive_failures: u32,
}

impl ComponentHealth {
    fn fresh() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            since: Utc::now(),
            consecutive_failures: 0,
        }
    }

    /// Move to `status`, keeping `since` when the status does not change
    fn transition(&mut self, status: ComponentStatus, message: Option<String>) {
        if self.status != status {
            self.status = status;
            self.since = Utc::now();
        }
        self.message = message;
    }
}

/// Snapshot of every component plus the worst status among them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthReport {
    fn from_components(components: BTreeMap<String, ComponentHealth>) -> Self {
        let status = components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        Self { status, components }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_poll: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct RegistryState {
    components: BTreeMap<String, ComponentHealth>,
    last_poll: Option<DateTime<Utc>>,
}

/// Shared, cheap-to-clone registry of component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every dashboard component registered as healthy
    pub fn with_default_components() -> Self {
        let components = components::ALL
            .iter()
            .map(|name| (name.to_string(), ComponentHealth::fresh()))
            .collect();
        Self {
            state: Arc::new(RwLock::new(RegistryState {
                components,
                last_poll: None,
            })),
        }
    }

    async fn transition(&self, name: &str, status: ComponentStatus, message: Option<String>) {
        let mut state = self.state.write().await;
        let component = state
            .components
            .entry(name.to_string())
            .or_insert_with(ComponentHealth::fresh);
        component.transition(status, message);
        if status == ComponentStatus::Healthy {
            component.consecutive_failures = 0;
        }
    }

    pub async fn set_healthy(&self, name: &str) {
        self.transition(name, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.transition(name, ComponentStatus::Degraded, Some(message.into()))
            .await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.transition(name, ComponentStatus::Unhealthy, Some(message.into()))
            .await;
    }

    /// Healthy on `Ok`. On `Err` one more failure is counted and the component
    /// goes degraded, or unhealthy once the streak reaches [`UNHEALTHY_AFTER_FAILURES`].
    pub async fn record<E: Display>(&self, name: &str, outcome: Result<(), E>) {
        match outcome {
            Ok(()) => self.set_healthy(name).await,
            Err(e) => {
                let mut state = self.state.write().await;
                let component = state
                    .components
                    .entry(name.to_string())
                    .or_insert_with(ComponentHealth::fresh);
                component.consecutive_failures = component.consecutive_failures.saturating_add(1);
                let status = if component.consecutive_failures >= UNHEALTHY_AFTER_FAILURES {
                    ComponentStatus::Unhealthy
                } else {
                    ComponentStatus::Degraded
                };
                component.transition(status, Some(e.to_string()));
            }
        }
    }

    /// Note a completed poll cycle; the dashboard is ready from the first one on
    pub async fn mark_polled(&self) {
        self.state.write().await.last_poll = Some(Utc::now());
    }

    pub async fn report(&self) -> HealthReport {
        HealthReport::from_components(self.state.read().await.components.clone())
    }

    /// Ready once a poll has finished and no component is unhealthy
    pub async fn readiness(&self) -> Readiness {
        let state = self.state.read().await;
        let unhealthy: Vec<&str> = state
            .components
            .iter()
            .filter(|(_, c)| !c.status.is_operational())
            .map(|(name, _)| name.as_str())
            .collect();

        let reason = if state.last_poll.is_none() {
            Some("No poll cycle completed yet".to_string())
        } else if !unhealthy.is_empty() {
            Some(format!("Unhealthy: {}", unhealthy.join(", ")))
        } else {
            None
        };

        Readiness {
            ready: reason.is_none(),
            last_poll: state.last_poll,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_components_start_healthy() {
        let registry = HealthRegistry::with_default_components();
        let report = registry.report().await;

        assert_eq!(report.status, ComponentStatus::Healthy);
        assert_eq!(report.components.len(), components::ALL.len());
        assert!(report.components.contains_key(components::HISTORY));
    }

    #[tokio::test]
    async fn test_empty_registry_is_healthy() {
        let report = HealthRegistry::new().report().await;
        assert_eq!(report.status, ComponentStatus::Healthy);
        assert!(report.components.is_empty());
    }

    #[tokio::test]
    async fn test_record_counts_consecutive_failures() {
        let registry = HealthRegistry::with_default_components();
        registry.record(components::HISTORY, Err("disk full")).await;
        registry.record(components::HISTORY, Err("disk still full")).await;

        let report = registry.report().await;
        let history = &report.components[components::HISTORY];
        assert_eq!(report.status, ComponentStatus::Degraded);
        assert_eq!(history.message.as_deref(), Some("disk still full"));
        assert_eq!(history.consecutive_failures, 2);

        registry.record::<String>(components::HISTORY, Ok(())).await;
        let report = registry.report().await;
        assert_eq!(report.status, ComponentStatus::Healthy);
        assert_eq!(report.components[components::HISTORY].consecutive_failures, 0);
        assert!(report.components[components::HISTORY].message.is_none());
    }

    #[tokio::test]
    async fn test_failure_streak_escalates_to_unhealthy() {
        let registry = HealthRegistry::with_default_components();
        registry.mark_polled().await;

        for _ in 1..UNHEALTHY_AFTER_FAILURES {
            registry.record(components::METRIC_SOURCE, Err("no /proc")).await;
        }
        assert_eq!(registry.report().await.status, ComponentStatus::Degraded);
        assert!(registry.readiness().await.ready);

        registry.record(components::METRIC_SOURCE, Err("no /proc")).await;
        assert_eq!(registry.report().await.status, ComponentStatus::Unhealthy);
        assert!(!registry.readiness().await.ready);

        registry.record::<&str>(components::METRIC_SOURCE, Ok(())).await;
        assert_eq!(registry.report().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_since_kept_while_status_unchanged() {
        let registry = HealthRegistry::with_default_components();
        registry.set_degraded(components::PROBES, "slow").await;
        let first = registry.report().await.components[components::PROBES].since;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        registry.set_degraded(components::PROBES, "still slow").await;
        let second = registry.report().await.components[components::PROBES].since;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unhealthy_dominates_degraded() {
        let registry = HealthRegistry::with_default_components();
        registry.set_degraded(components::METRIC_SOURCE, "fallback").await;
        registry.set_unhealthy(components::POLLER, "stopped").await;

        assert_eq!(registry.report().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_readiness_requires_first_poll() {
        let registry = HealthRegistry::with_default_components();
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.last_poll.is_none());
        assert!(readiness.reason.is_some());

        registry.mark_polled().await;
        let readiness = registry.readiness().await;
        assert!(readiness.ready);
        assert!(readiness.last_poll.is_some());
    }

    #[tokio::test]
    async fn test_readiness_names_unhealthy_components() {
        let registry = HealthRegistry::with_default_components();
        registry.mark_polled().await;
        registry.set_unhealthy(components::POLLER, "panicked").await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Unhealthy: poller"));
    }
}
