//! Alert rule evaluation
//!
//! Rules run in a fixed order so the same inputs always produce the same
//! alert list:
//! 1. metrics unavailable
//! 2. memory ratio (critical, else warning)
//! 3. one alert per non-system service that is down, in configured order
//! 4. CPU load ceiling
//! 5. process count ceiling
//! 6. disk ratio ceiling
//!
//! Every comparison is strict, so a value sitting exactly on a threshold
//! does not fire.

use crate::models::{Alert, ServiceState, ServiceStatus, SystemMetrics};
use serde::{Deserialize, Serialize};

/// Thresholds applied by [`evaluate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Memory used ratio above which a warning fires
    pub memory_warning_ratio: f64,
    /// Memory used ratio above which a critical alert fires
    pub memory_critical_ratio: f64,
    /// One-minute load average ceiling
    pub cpu_load_ceiling: f64,
    pub process_count_ceiling: usize,
    /// Disk used ratio ceiling
    pub disk_used_ceiling: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            memory_warning_ratio: 0.90,
            memory_critical_ratio: 0.95,
            cpu_load_ceiling: 4.0,
            process_count_ceiling: 500,
            disk_used_ceiling: 0.90,
        }
    }
}

/// Evaluate every rule against one set of joined poll results
pub fn evaluate(
    system: &SystemMetrics,
    services: &[ServiceStatus],
    thresholds: &AlertThresholds,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if !system.available {
        alerts.push(Alert::critical("metrics", "System metrics unavailable"));
    } else {
        let memory = system.memory_used_ratio();
        if memory > thresholds.memory_critical_ratio {
            alerts.push(Alert::critical(
                "memory",
                format!("Memory usage critical at {:.1}%", memory * 100.0),
            ));
        } else if memory > thresholds.memory_warning_ratio {
            alerts.push(Alert::warning(
                "memory",
                format!("Memory usage high at {:.1}%", memory * 100.0),
            ));
        }
    }

    for service in services
        .iter()
        .filter(|s| !s.system && s.state == ServiceState::Critical)
    {
        alerts.push(Alert::critical(
            format!("service:{}", service.name),
            format!(
                "Service {} is down: {}",
                service.name,
                service.error.as_deref().unwrap_or("probe failed")
            ),
        ));
    }

    if system.available {
        if system.cpu_load > thresholds.cpu_load_ceiling {
            alerts.push(Alert::warning(
                "cpu",
                format!(
                    "CPU load {:.2} above ceiling {:.2}",
                    system.cpu_load, thresholds.cpu_load_ceiling
                ),
            ));
        }

        if system.process_count > thresholds.process_count_ceiling {
            alerts.push(Alert::warning(
                "processes",
                format!(
                    "Process count {} above ceiling {}",
                    system.process_count, thresholds.process_count_ceiling
                ),
            ));
        }

        let disk = system.disk_used_ratio();
        if disk > thresholds.disk_used_ceiling {
            alerts.push(Alert::warning(
                "disk",
                format!(
                    "Disk usage {:.1}% above ceiling {:.1}%",
                    disk * 100.0,
                    thresholds.disk_used_ceiling * 100.0
                ),
            ));
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OverallHealth, ServiceTarget, Severity};

    fn metrics_with_memory(used: u64, total: u64) -> SystemMetrics {
        SystemMetrics::measured(0.5, 4, used, total, 100, 1000, 120, 3600, "host", "linux")
    }

    #[test]
    fn test_memory_boundaries() {
        let thresholds = AlertThresholds::default();

        let alerts = evaluate(&metrics_with_memory(951, 1000), &[], &thresholds);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[0].source, "memory");

        let alerts = evaluate(&metrics_with_memory(950, 1000), &[], &thresholds);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Warning);

        let alerts = evaluate(&metrics_with_memory(900, 1000), &[], &thresholds);
        assert!(alerts.is_empty());

        let alerts = evaluate(&metrics_with_memory(800, 1000), &[], &thresholds);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_service_down_alerts_skip_system_targets() {
        let api = ServiceTarget::new("api", "http://api");
        let infra = ServiceTarget::new("infra", "http://infra").system();
        let services = vec![
            ServiceStatus::critical(&api, 5, "HTTP 503"),
            ServiceStatus::critical(&infra, 5, "HTTP 503"),
        ];

        let alerts = evaluate(&metrics_with_memory(100, 1000), &services, &AlertThresholds::default());

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].source, "service:api");
        assert!(alerts[0].message.contains("HTTP 503"));
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let metrics = SystemMetrics::measured(9.0, 4, 960, 1000, 950, 1000, 900, 10, "host", "linux");
        let a = ServiceTarget::new("a", "http://a");
        let b = ServiceTarget::new("b", "http://b");
        let services = vec![
            ServiceStatus::critical(&a, 1, "x"),
            ServiceStatus::critical(&b, 1, "y"),
        ];

        let sources: Vec<String> = evaluate(&metrics, &services, &AlertThresholds::default())
            .into_iter()
            .map(|a| a.source)
            .collect();

        assert_eq!(
            sources,
            vec!["memory", "service:a", "service:b", "cpu", "processes", "disk"]
        );
    }

    #[test]
    fn test_unavailable_metrics_are_critical_and_skip_ratio_rules() {
        let alerts = evaluate(&SystemMetrics::unavailable(), &[], &AlertThresholds::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].source, "metrics");
        assert_eq!(OverallHealth::from_alerts(&alerts), OverallHealth::Critical);
    }

    #[test]
    fn test_custom_ceilings() {
        let thresholds = AlertThresholds {
            cpu_load_ceiling: 0.25,
            ..Default::default()
        };
        let alerts = evaluate(&metrics_with_memory(100, 1000), &[], &thresholds);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].source, "cpu");
        assert_eq!(OverallHealth::from_alerts(&alerts), OverallHealth::Warning);
    }
}
