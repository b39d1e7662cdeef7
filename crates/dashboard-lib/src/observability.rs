//! Observability infrastructure for the status dashboard
//!
//! Provides:
//! - Prometheus metrics (poll latency, probe latency, checks, alerts, overall health)
//! - Structured JSON logging with tracing

use crate::models::{Alert, Severity, Snapshot};
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DashboardMetricsInner> = OnceLock::new();

struct DashboardMetricsInner {
    poll_latency_seconds: Histogram,
    probe_latency_seconds: HistogramVec,
    checks_total: IntCounter,
    alerts_total: IntCounterVec,
    services_down: IntGauge,
    overall_health: IntGauge,
    metric_source_failures: IntCounter,
    history_write_errors: IntCounter,
}

impl DashboardMetricsInner {
    fn new() -> Self {
        Self {
            poll_latency_seconds: register_histogram!(
                "status_dashboard_poll_latency_seconds",
                "Time spent building one snapshot",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register poll_latency_seconds"),

            probe_latency_seconds: register_histogram_vec!(
                "status_dashboard_probe_latency_seconds",
                "Response time of service probes",
                &["service"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register probe_latency_seconds"),

            checks_total: register_int_counter!(
                "status_dashboard_checks_total",
                "Total number of poll cycles recorded"
            )
            .expect("Failed to register checks_total"),

            alerts_total: register_int_counter_vec!(
                "status_dashboard_alerts_total",
                "Total number of alerts raised",
                &["severity"]
            )
            .expect("Failed to register alerts_total"),

            services_down: register_int_gauge!(
                "status_dashboard_services_down",
                "Number of services in critical state in the latest snapshot"
            )
            .expect("Failed to register services_down"),

            overall_health: register_int_gauge!(
                "status_dashboard_overall_health",
                "Overall health of the latest snapshot (0 healthy, 1 warning, 2 critical)"
            )
            .expect("Failed to register overall_health"),

            metric_source_failures: register_int_counter!(
                "status_dashboard_metric_source_failures_total",
                "Total number of failed host metric collections"
            )
            .expect("Failed to register metric_source_failures"),

            history_write_errors: register_int_counter!(
                "status_dashboard_history_write_errors_total",
                "Total number of failed history file writes"
            )
            .expect("Failed to register history_write_errors"),
        }
    }
}

/// Dashboard metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct DashboardMetrics {
    _private: (),
}

impl Default for DashboardMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DashboardMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardMetrics").finish()
    }
}

impl DashboardMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DashboardMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DashboardMetricsInner {
        GLOBAL_METRICS.get_or_init(DashboardMetricsInner::new)
    }

    pub fn observe_poll_latency(&self, elapsed: Duration) {
        self.inner().poll_latency_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn observe_probe_latency(&self, service: &str, response_time_ms: u64) {
        self.inner()
            .probe_latency_seconds
            .with_label_values(&[service])
            .observe(response_time_ms as f64 / 1000.0);
    }

    /// Record the gauges and counters derived from one snapshot
    pub fn record_snapshot(&self, snapshot: &Snapshot) {
        let inner = self.inner();
        inner.services_down.set(snapshot.services_down() as i64);
        inner.overall_health.set(snapshot.overall_health.as_level());
        for alert in &snapshot.alerts {
            inner
                .alerts_total
                .with_label_values(&[&alert.severity.to_string()])
                .inc();
        }
    }

    pub fn inc_checks(&self) {
        self.inner().checks_total.inc();
    }

    pub fn inc_metric_source_failures(&self) {
        self.inner().metric_source_failures.inc();
    }

    pub fn inc_history_write_errors(&self) {
        self.inner().history_write_errors.inc();
    }
}

/// Structured logger for dashboard events
///
/// Provides consistent JSON-formatted logging for poll cycles,
/// alerts, and other significant events.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Log dashboard startup
    pub fn log_startup(&self, version: &str, port: u16, targets: usize) {
        info!(
            event = "dashboard_started",
            service = %self.service_name,
            version = %version,
            port = port,
            targets = targets,
            "Status dashboard started"
        );
    }

    /// Log dashboard shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "dashboard_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Status dashboard shutting down"
        );
    }

    /// Log a finished poll cycle
    pub fn log_poll(&self, snapshot: &Snapshot, elapsed: Duration) {
        info!(
            event = "poll_completed",
            service = %self.service_name,
            overall_health = %snapshot.overall_health,
            services = snapshot.services.len(),
            services_down = snapshot.services_down(),
            alerts = snapshot.alerts.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Poll cycle complete"
        );
    }

    /// Log one alert raised by a poll
    pub fn log_alert(&self, alert: &Alert) {
        match alert.severity {
            Severity::Critical => {
                warn!(
                    event = "alert_raised",
                    service = %self.service_name,
                    source = %alert.source,
                    severity = %alert.severity,
                    "{}", alert.message
                );
            }
            Severity::Warning => {
                info!(
                    event = "alert_raised",
                    service = %self.service_name,
                    source = %alert.source,
                    severity = %alert.severity,
                    "{}", alert.message
                );
            }
        }
    }

    /// Log a history persistence failure
    pub fn log_history_failure(&self, path: &str, error: &str) {
        warn!(
            event = "history_write_failed",
            service = %self.service_name,
            path = %path,
            error = %error,
            "Failed to persist alert history, keeping in-memory copy"
        );
    }
}
