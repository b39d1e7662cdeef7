//! Poll cycles and the periodic poller
//!
//! `Dashboard::poll` is the single poll cycle shared by every trigger: build
//! a snapshot, append it to the history, publish it as the latest. The
//! `Poller` drives it on a timer with an explicit start/stop lifecycle.

use crate::aggregator::SnapshotAggregator;
use crate::health::{components, HealthRegistry};
use crate::history::AlertLog;
use crate::models::Snapshot;
use crate::observability::{DashboardMetrics, StructuredLogger};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Shortest interval the poller accepts
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Everything one poll cycle touches, cheap to clone
#[derive(Debug, Clone)]
pub struct Dashboard {
    aggregator: Arc<SnapshotAggregator>,
    log: AlertLog,
    latest: Arc<RwLock<Option<Arc<Snapshot>>>>,
    health: HealthRegistry,
    logger: StructuredLogger,
    metrics: DashboardMetrics,
}

impl Dashboard {
    pub fn new(
        aggregator: Arc<SnapshotAggregator>,
        log: AlertLog,
        health: HealthRegistry,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            aggregator,
            log,
            latest: Arc::new(RwLock::new(None)),
            health,
            logger,
            metrics: DashboardMetrics::new(),
        }
    }

    /// Run one poll cycle and publish its snapshot
    pub async fn poll(&self) -> Arc<Snapshot> {
        let start = Instant::now();
        let snapshot = Arc::new(self.aggregator.build_snapshot().await);

        self.log.append(&snapshot).await;
        self.metrics.record_snapshot(&snapshot);
        for alert in &snapshot.alerts {
            self.logger.log_alert(alert);
        }
        self.logger.log_poll(&snapshot, start.elapsed());

        self.publish(snapshot.clone()).await;
        self.health.mark_polled().await;
        snapshot
    }

    /// Replace the latest snapshot unless a newer one is already published
    async fn publish(&self, snapshot: Arc<Snapshot>) {
        let mut latest = self.latest.write().await;
        let is_newer = latest
            .as_ref()
            .map_or(true, |current| current.timestamp <= snapshot.timestamp);
        if is_newer {
            *latest = Some(snapshot);
        }
    }

    /// Newest snapshot any cycle has produced, without polling
    pub async fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest.read().await.clone()
    }

    pub fn aggregator(&self) -> &SnapshotAggregator {
        &self.aggregator
    }

    pub fn log(&self) -> &AlertLog {
        &self.log
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }
}

/// Timer-driven poller
pub struct Poller {
    dashboard: Dashboard,
    interval: Duration,
}

impl Poller {
    pub fn new(dashboard: Dashboard, interval: Duration) -> Self {
        Self {
            dashboard,
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    /// Spawn the polling task; the first cycle runs immediately
    pub fn start(self) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(self.run(shutdown_rx));
        PollerHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Starting status poller"
        );
        self.dashboard.health.set_healthy(components::POLLER).await;

        let mut ticker = interval(self.interval);
        // A slow cycle delays the next one instead of bursting to catch up
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.dashboard.poll().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down status poller");
                    break;
                }
            }
        }

        self.dashboard
            .health
            .set_degraded(components::POLLER, "poller stopped")
            .await;
    }
}

/// Handle for stopping a running poller
pub struct PollerHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signal the poller and wait for the in-flight cycle to finish
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "Status poller task ended abnormally");
        }
    }
}
