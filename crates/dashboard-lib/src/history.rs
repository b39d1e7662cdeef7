//! Bounded alert history
//!
//! Each poll cycle appends exactly one entry. The history keeps the newest
//! `retention` entries (FIFO eviction) plus running counters, and can mirror
//! itself to a JSON file after every append. Persistence failures never fail
//! the append: the in-memory history is the source of truth.

use crate::error::{DashboardError, Result};
use crate::health::{components, HealthRegistry};
use crate::models::{Alert, OverallHealth, Snapshot, SystemMetrics};
use crate::observability::{DashboardMetrics, StructuredLogger};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default number of retained checks
pub const DEFAULT_RETENTION: usize = 100;

/// One recorded poll cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub overall_health: OverallHealth,
    pub metrics: SystemMetrics,
    pub alerts: Vec<Alert>,
}

impl From<&Snapshot> for HistoryEntry {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp,
            overall_health: snapshot.overall_health,
            metrics: snapshot.system.clone(),
            alerts: snapshot.alerts.clone(),
        }
    }
}

/// Running counters, persisted alongside the checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryCounters {
    pub total_checks: u64,
    pub total_alerts: u64,
}

/// Summary returned after every append
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total_checks: u64,
    pub total_alerts: u64,
    pub last_status: Option<OverallHealth>,
    /// Entries currently held
    pub retained: usize,
    pub start_time: DateTime<Utc>,
}

/// Bounded append-only sequence of past checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertHistory {
    pub start_time: DateTime<Utc>,
    pub checks: VecDeque<HistoryEntry>,
    pub metrics: HistoryCounters,
    #[serde(skip, default = "default_retention")]
    retention: usize,
}

fn default_retention() -> usize {
    DEFAULT_RETENTION
}

impl AlertHistory {
    pub fn new(retention: usize) -> Self {
        let retention = retention.max(1);
        Self {
            start_time: Utc::now(),
            checks: VecDeque::with_capacity(retention.min(1_000)),
            metrics: HistoryCounters::default(),
            retention,
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Record one snapshot, evicting the oldest entries past the cap
    pub fn push(&mut self, snapshot: &Snapshot) {
        while self.checks.len() >= self.retention {
            self.checks.pop_front();
        }
        self.checks.push_back(HistoryEntry::from(snapshot));
        self.metrics.total_checks += 1;
        self.metrics.total_alerts += snapshot.alerts.len() as u64;
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn summary(&self) -> HistorySummary {
        HistorySummary {
            total_checks: self.metrics.total_checks,
            total_alerts: self.metrics.total_alerts,
            last_status: self.checks.back().map(|e| e.overall_health),
            retained: self.checks.len(),
            start_time: self.start_time,
        }
    }

    /// Newest `limit` entries, oldest first
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let skip = self.checks.len().saturating_sub(limit);
        self.checks.iter().skip(skip).cloned().collect()
    }

    /// Apply a new cap, trimming from the front
    fn set_retention(&mut self, retention: usize) {
        self.retention = retention.max(1);
        while self.checks.len() > self.retention {
            self.checks.pop_front();
        }
    }
}

/// Shared handle to the alert history; appends are serialized
#[derive(Debug, Clone)]
pub struct AlertLog {
    history: Arc<Mutex<AlertHistory>>,
    persistence_path: Option<PathBuf>,
    health: Option<HealthRegistry>,
    metrics: DashboardMetrics,
    logger: StructuredLogger,
}

impl AlertLog {
    /// In-memory history only
    pub fn new(retention: usize) -> Self {
        Self {
            history: Arc::new(Mutex::new(AlertHistory::new(retention))),
            persistence_path: None,
            health: None,
            metrics: DashboardMetrics::new(),
            logger: StructuredLogger::new("status-dashboard"),
        }
    }

    /// History mirrored to `path`, resuming from the file when it exists
    pub fn open(path: impl Into<PathBuf>, retention: usize) -> Self {
        let path = path.into();
        let history = if path.exists() {
            match load_from_disk(&path) {
                Ok(mut history) => {
                    history.set_retention(retention);
                    info!(
                        path = %path.display(),
                        entries = history.len(),
                        "Loaded alert history from disk"
                    );
                    history
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load alert history, starting fresh");
                    AlertHistory::new(retention)
                }
            }
        } else {
            AlertHistory::new(retention)
        };

        Self {
            history: Arc::new(Mutex::new(history)),
            persistence_path: Some(path),
            health: None,
            metrics: DashboardMetrics::new(),
            logger: StructuredLogger::new("status-dashboard"),
        }
    }

    pub fn with_health_registry(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Append one snapshot and persist the result
    pub async fn append(&self, snapshot: &Snapshot) -> HistorySummary {
        // The lock is held through the write so the file never sees interleaved appends.
        let mut history = self.history.lock().await;
        history.push(snapshot);
        self.metrics.inc_checks();

        if let Some(path) = &self.persistence_path {
            let outcome = save_to_disk(&history, path);
            if let Err(e) = &outcome {
                self.metrics.inc_history_write_errors();
                self.logger
                    .log_history_failure(&path.display().to_string(), &e.to_string());
            } else {
                debug!(path = %path.display(), entries = history.len(), "History flushed to disk");
            }
            if let Some(health) = &self.health {
                health.record(components::HISTORY, outcome).await;
            }
        }

        history.summary()
    }

    pub async fn summary(&self) -> HistorySummary {
        self.history.lock().await.summary()
    }

    pub async fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        self.history.lock().await.recent(limit)
    }

    pub fn persistence_path(&self) -> Option<&Path> {
        self.persistence_path.as_deref()
    }
}

/// Write the history atomically using a temp file and rename
fn save_to_disk(history: &AlertHistory, path: &Path) -> Result<()> {
    let fail = |what: &str, e: &dyn std::fmt::Display| {
        DashboardError::HistoryWriteFailure(format!("{what} {}: {e}", path.display()))
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| fail("create directory for", &e))?;
    }

    let json = serde_json::to_vec_pretty(history).map_err(|e| fail("serialize", &e))?;

    let temp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| fail("create temp file for", &e))?;
    file.write_all(&json).map_err(|e| fail("write", &e))?;
    file.sync_all().map_err(|e| fail("sync", &e))?;

    std::fs::rename(&temp_path, path).map_err(|e| fail("rename temp file to", &e))?;
    Ok(())
}

fn load_from_disk(path: &Path) -> anyhow::Result<AlertHistory> {
    use anyhow::Context;

    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read history file {:?}", path))?;
    serde_json::from_slice(&data).context("Failed to parse history file")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::ComponentStatus;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn snapshot(alerts: Vec<Alert>) -> Snapshot {
        Snapshot {
            timestamp: Utc::now(),
            system: SystemMetrics::measured(0.1, 2, 10, 100, 10, 100, 3, 60, "h", "p"),
            services: vec![],
            overall_health: OverallHealth::from_alerts(&alerts),
            alerts,
            display: BTreeMap::new(),
        }
    }

    #[test]
    fn test_history_evicts_oldest_first() {
        let mut history = AlertHistory::new(3);
        for i in 0..5 {
            history.push(&snapshot(vec![Alert::warning("cpu", format!("tick {i}"))]));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.checks[0].alerts[0].message, "tick 2");
        assert_eq!(history.checks[2].alerts[0].message, "tick 4");
        assert_eq!(history.metrics.total_checks, 5);
        assert_eq!(history.metrics.total_alerts, 5);
    }

    #[test]
    fn test_summary_tracks_last_status() {
        let mut history = AlertHistory::new(10);
        assert_eq!(history.summary().last_status, None);

        history.push(&snapshot(vec![]));
        history.push(&snapshot(vec![Alert::critical("service:a", "down")]));

        let summary = history.summary();
        assert_eq!(summary.last_status, Some(OverallHealth::Critical));
        assert_eq!(summary.total_checks, 2);
        assert_eq!(summary.total_alerts, 1);
        assert_eq!(summary.retained, 2);
    }

    #[test]
    fn test_recent_returns_newest_in_order() {
        let mut history = AlertHistory::new(10);
        for i in 0..4 {
            history.push(&snapshot(vec![Alert::warning("disk", format!("{i}"))]));
        }

        let recent = history.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].alerts[0].message, "2");
        assert_eq!(recent[1].alerts[0].message, "3");
        assert_eq!(history.recent(50).len(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_all_counted() {
        let log = AlertLog::new(5);
        let mut handles = Vec::new();
        for _ in 0..20 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                log.append(&snapshot(vec![Alert::warning("cpu", "busy")])).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let summary = log.summary().await;
        assert_eq!(summary.total_checks, 20);
        assert_eq!(summary.total_alerts, 20);
        assert_eq!(summary.retained, 5);
    }

    #[tokio::test]
    async fn test_persisted_file_layout_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("history").join("alerts.json");

        let log = AlertLog::open(&path, 2);
        for _ in 0..3 {
            log.append(&snapshot(vec![Alert::critical("memory", "full")])).await;
        }

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(raw["startTime"].is_string());
        assert_eq!(raw["checks"].as_array().unwrap().len(), 2);
        assert_eq!(raw["metrics"]["totalChecks"], 3);
        assert_eq!(raw["metrics"]["totalAlerts"], 3);
        assert!(raw["checks"][0]["timestamp"].is_string());
        assert!(raw["checks"][0]["metrics"].is_object());

        let reopened = AlertLog::open(&path, 2);
        let summary = reopened.summary().await;
        assert_eq!(summary.total_checks, 3);
        assert_eq!(summary.retained, 2);
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_fresh() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("alerts.json");
        std::fs::write(&path, b"{not json").unwrap();

        let log = AlertLog::open(&path, 10);
        assert_eq!(log.summary().await.total_checks, 0);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_in_memory_history() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the file should be makes the rename fail
        let path = temp_dir.path().join("taken");
        std::fs::create_dir_all(path.join("child")).unwrap();

        let health = HealthRegistry::with_default_components();
        let log = AlertLog::open(&path, 10).with_health_registry(health.clone());

        let summary = log.append(&snapshot(vec![])).await;

        assert_eq!(summary.total_checks, 1);
        assert_eq!(summary.retained, 1);
        let status = health.report().await;
        assert_eq!(
            status.components[components::HISTORY].status,
            ComponentStatus::Degraded
        );
    }
}
