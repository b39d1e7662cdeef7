//! Metric source backed by the local operating system

use super::{async_trait, MetricSource};
use crate::error::{DashboardError, Result};
use crate::models::SystemMetrics;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, ProcessesToUpdate, RefreshKind, System};
use tracing::debug;

/// Reads memory, load, disk and process counts through `sysinfo`
#[derive(Debug, Clone, Default)]
pub struct HostMetricSource;

impl HostMetricSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricSource for HostMetricSource {
    async fn collect(&self) -> Result<SystemMetrics> {
        let metrics = tokio::task::spawn_blocking(read_host)
            .await
            .map_err(|e| DashboardError::MetricUnavailable(format!("collector task failed: {e}")))??;

        debug!(
            hostname = %metrics.hostname,
            memory_used_ratio = metrics.memory_used_ratio(),
            process_count = metrics.process_count,
            "Collected host metrics"
        );
        Ok(metrics)
    }
}

fn read_host() -> Result<SystemMetrics> {
    let mut sys = System::new_with_specifics(
        RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing())
            .with_memory(MemoryRefreshKind::everything()),
    );
    sys.refresh_memory();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    let memory_total = sys.total_memory();
    if memory_total == 0 {
        return Err(DashboardError::MetricUnavailable(
            "host reported zero total memory".to_string(),
        ));
    }

    let disks = Disks::new_with_refreshed_list();
    let (disk_used, disk_total) = disks.list().iter().fold((0u64, 0u64), |(used, total), disk| {
        let total_space = disk.total_space();
        (
            used.saturating_add(total_space.saturating_sub(disk.available_space())),
            total.saturating_add(total_space),
        )
    });

    let platform = format!(
        "{} {} ({})",
        System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
        System::os_version().unwrap_or_default(),
        std::env::consts::ARCH
    );

    Ok(SystemMetrics::measured(
        System::load_average().one,
        sys.cpus().len(),
        sys.used_memory(),
        memory_total,
        disk_used,
        disk_total,
        sys.processes().len(),
        System::uptime(),
        System::host_name().unwrap_or_else(|| "unknown".to_string()),
        platform,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_host_metrics_respect_invariants() {
        // Sandboxed hosts may refuse the query; only a successful read is checked.
        if let Ok(metrics) = HostMetricSource::new().collect().await {
            assert!(metrics.available);
            assert!(metrics.cpu_load >= 0.0);
            assert!(metrics.memory_used_bytes <= metrics.memory_total_bytes);
            assert!(metrics.disk_used_bytes <= metrics.disk_total_bytes);
            assert!(!metrics.hostname.is_empty());
        }
    }
}
