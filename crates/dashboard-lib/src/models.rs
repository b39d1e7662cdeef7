//! Core data models for the status dashboard

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Local resource state at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// One-minute load average
    pub cpu_load: f64,
    pub cpu_count: usize,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub disk_used_bytes: u64,
    pub disk_total_bytes: u64,
    pub process_count: usize,
    pub uptime_seconds: u64,
    pub hostname: String,
    pub platform: String,
    /// False when the values are the fallback substituted for a failed collection
    pub available: bool,
}

impl SystemMetrics {
    /// Build a measured sample, clamping used values to their totals
    #[allow(clippy::too_many_arguments)]
    pub fn measured(
        cpu_load: f64,
        cpu_count: usize,
        memory_used_bytes: u64,
        memory_total_bytes: u64,
        disk_used_bytes: u64,
        disk_total_bytes: u64,
        process_count: usize,
        uptime_seconds: u64,
        hostname: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            cpu_load: if cpu_load.is_finite() { cpu_load.max(0.0) } else { 0.0 },
            cpu_count,
            memory_used_bytes: memory_used_bytes.min(memory_total_bytes),
            memory_total_bytes,
            disk_used_bytes: disk_used_bytes.min(disk_total_bytes),
            disk_total_bytes,
            process_count,
            uptime_seconds,
            hostname: hostname.into(),
            platform: platform.into(),
            available: true,
        }
    }

    /// Fallback used when the host could not be queried
    pub fn unavailable() -> Self {
        Self {
            cpu_load: 0.0,
            cpu_count: 0,
            memory_used_bytes: 0,
            memory_total_bytes: 0,
            disk_used_bytes: 0,
            disk_total_bytes: 0,
            process_count: 0,
            uptime_seconds: 0,
            hostname: "unknown".to_string(),
            platform: "unknown".to_string(),
            available: false,
        }
    }

    pub fn memory_used_ratio(&self) -> f64 {
        ratio(self.memory_used_bytes, self.memory_total_bytes)
    }

    pub fn disk_used_ratio(&self) -> f64 {
        ratio(self.disk_used_bytes, self.disk_total_bytes)
    }
}

fn ratio(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64
    }
}

/// Probe outcome for a single service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Healthy,
    Critical,
    /// Not probed yet
    Unknown,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Healthy => write!(f, "healthy"),
            ServiceState::Critical => write!(f, "critical"),
            ServiceState::Unknown => write!(f, "unknown"),
        }
    }
}

/// A configured endpoint to probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTarget {
    pub name: String,
    pub url: String,
    /// Infrastructure targets are shown but never raise the service-down alert
    #[serde(default)]
    pub system: bool,
}

impl ServiceTarget {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            system: false,
        }
    }

    pub fn system(mut self) -> Self {
        self.system = true;
        self
    }
}

/// Result of probing one named endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub url: String,
    pub state: ServiceState,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub observed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub system: bool,
}

impl ServiceStatus {
    pub fn healthy(target: &ServiceTarget, response_time_ms: u64) -> Self {
        Self {
            name: target.name.clone(),
            url: target.url.clone(),
            state: ServiceState::Healthy,
            response_time_ms,
            error: None,
            observed_at: Utc::now(),
            system: target.system,
        }
    }

    pub fn critical(target: &ServiceTarget, response_time_ms: u64, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            name: target.name.clone(),
            url: target.url.clone(),
            state: ServiceState::Critical,
            response_time_ms,
            error: Some(if error.is_empty() {
                "probe failed".to_string()
            } else {
                error
            }),
            observed_at: Utc::now(),
            system: target.system,
        }
    }
}

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A human-readable alert tagged by severity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,
    /// What raised it: `memory`, `cpu`, `processes`, `disk`, `metrics` or `service:<name>`
    pub source: String,
    pub message: String,
}

impl Alert {
    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            source: source.into(),
            message: message.into(),
        }
    }

    pub fn critical(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Critical,
            source: source.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.severity.to_string().to_uppercase(),
            self.message
        )
    }
}

/// Worst-case classification over every alert in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Healthy,
    Warning,
    Critical,
}

impl OverallHealth {
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        match alerts.iter().map(|a| a.severity).max() {
            Some(Severity::Critical) => OverallHealth::Critical,
            Some(Severity::Warning) => OverallHealth::Warning,
            None => OverallHealth::Healthy,
        }
    }

    /// Numeric form for gauges: 0 healthy, 1 warning, 2 critical
    pub fn as_level(&self) -> i64 {
        match self {
            OverallHealth::Healthy => 0,
            OverallHealth::Warning => 1,
            OverallHealth::Critical => 2,
        }
    }
}

impl fmt::Display for OverallHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverallHealth::Healthy => write!(f, "healthy"),
            OverallHealth::Warning => write!(f, "warning"),
            OverallHealth::Critical => write!(f, "critical"),
        }
    }
}

/// One immutable aggregated view of system and service health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub system: SystemMetrics,
    /// Configured probe order, stable across polls
    pub services: Vec<ServiceStatus>,
    pub overall_health: OverallHealth,
    pub alerts: Vec<Alert>,
    /// Operator-supplied display fields; never measured
    #[serde(default)]
    pub display: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn service(&self, name: &str) -> Option<&ServiceStatus> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn services_down(&self) -> usize {
        self.services
            .iter()
            .filter(|s| s.state == ServiceState::Critical)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measured_clamps_used_to_total() {
        let metrics = SystemMetrics::measured(0.5, 4, 200, 100, 900, 500, 10, 60, "host", "linux");
        assert_eq!(metrics.memory_used_bytes, 100);
        assert_eq!(metrics.disk_used_bytes, 500);
        assert!(metrics.available);
    }

    #[test]
    fn test_ratios_with_zero_totals() {
        let metrics = SystemMetrics::unavailable();
        assert_eq!(metrics.memory_used_ratio(), 0.0);
        assert_eq!(metrics.disk_used_ratio(), 0.0);
        assert!(!metrics.available);
    }

    #[test]
    fn test_critical_status_always_has_error() {
        let target = ServiceTarget::new("api", "http://localhost:1");
        let status = ServiceStatus::critical(&target, 3, "");
        assert_eq!(status.state, ServiceState::Critical);
        assert_eq!(status.error.as_deref(), Some("probe failed"));
    }

    #[test]
    fn test_unknown_state_read_from_json() {
        let status: ServiceStatus = serde_json::from_str(
            r#"{"name":"api","url":"http://api/health","state":"unknown",
                "response_time_ms":0,"observed_at":"2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(status.state, ServiceState::Unknown);
        assert_eq!(status.state.to_string(), "unknown");

        let target = ServiceTarget::new("api", "http://api/health");
        assert_eq!(ServiceStatus::healthy(&target, 1).state, ServiceState::Healthy);
    }

    #[test]
    fn test_overall_health_from_alerts() {
        assert_eq!(OverallHealth::from_alerts(&[]), OverallHealth::Healthy);
        assert_eq!(
            OverallHealth::from_alerts(&[Alert::warning("cpu", "busy")]),
            OverallHealth::Warning
        );
        assert_eq!(
            OverallHealth::from_alerts(&[
                Alert::warning("cpu", "busy"),
                Alert::critical("service:api", "down"),
            ]),
            OverallHealth::Critical
        );
    }

    #[test]
    fn test_alert_display_is_tagged() {
        let alert = Alert::critical("memory", "Memory usage at 97.0%");
        assert_eq!(alert.to_string(), "[CRITICAL] Memory usage at 97.0%");
    }

    #[test]
    fn test_snapshot_serializes_lowercase_health() {
        let snapshot = Snapshot {
            timestamp: Utc::now(),
            system: SystemMetrics::unavailable(),
            services: vec![],
            overall_health: OverallHealth::Warning,
            alerts: vec![],
            display: BTreeMap::new(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["overall_health"], "warning");
    }
}
