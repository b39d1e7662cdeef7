//! Error taxonomy for the dashboard library

use thiserror::Error;

/// Failures raised inside the dashboard
///
/// Probe variants never reach callers: their display text is stored in
/// `ServiceStatus::error` instead.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("system metrics unavailable: {0}")]
    MetricUnavailable(String),

    #[error("timed out after {timeout_ms}ms")]
    ProbeTimeout { timeout_ms: u64 },

    #[error("unreachable: {0}")]
    ProbeUnreachable(String),

    #[error("HTTP {status}")]
    ProbeHttpError { status: u16 },

    #[error("failed to write history: {0}")]
    HistoryWriteFailure(String),

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("invalid service target: {0}")]
    InvalidTarget(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
