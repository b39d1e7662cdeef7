//! HTTP API: dashboard page, JSON status endpoints, health and Prometheus metrics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use dashboard_lib::{
    health::{ComponentHealth, ComponentStatus},
    presenter::render_dashboard,
    Dashboard, DashboardError, HistoryEntry, HistorySummary,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Dashboard,
    pub service_name: String,
    pub port: u16,
    pub refresh_secs: u64,
}

impl AppState {
    pub fn new(dashboard: Dashboard, service_name: impl Into<String>, port: u16) -> Self {
        Self {
            dashboard,
            service_name: service_name.into(),
            port,
            refresh_secs: dashboard_lib::presenter::DEFAULT_REFRESH_SECS,
        }
    }

    pub fn with_refresh_secs(mut self, refresh_secs: u64) -> Self {
        self.refresh_secs = refresh_secs;
        self
    }
}

/// Liveness payload for the dashboard itself
#[derive(Debug, Serialize, Deserialize)]
pub struct SelfHealth {
    pub status: String,
    pub service: String,
    pub version: String,
    pub port: u16,
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub summary: HistorySummary,
    pub checks: Vec<HistoryEntry>,
}

/// Rendered dashboard for a fresh poll
async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let snapshot = state.dashboard.poll().await;
    let summary = state.dashboard.log().summary().await;
    Html(render_dashboard(&snapshot, &summary, state.refresh_secs))
}

/// Liveness of the dashboard - 200 unless one of its own components failed
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.dashboard.health().report().await;

    let (status_code, status) = match health.status {
        ComponentStatus::Healthy => (StatusCode::OK, "ok"),
        ComponentStatus::Degraded => (StatusCode::OK, "degraded"),
        ComponentStatus::Unhealthy => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
    };

    (
        status_code,
        Json(SelfHealth {
            status: status.to_string(),
            service: state.service_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            port: state.port,
            components: health.components,
        }),
    )
}

/// Readiness check - 503 until the first poll completed
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.dashboard.health().readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Full snapshot for a fresh poll
async fn api_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.dashboard.poll().await;
    Json(snapshot.as_ref().clone())
}

/// Snapshot from the most recent cycle, without polling; 503 before the first one
async fn api_latest(State(state): State<Arc<AppState>>) -> Response {
    match state.dashboard.latest().await {
        Some(snapshot) => Json(snapshot.as_ref().clone()).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "no poll cycle completed yet".to_string(),
                service: None,
            }),
        )
            .into_response(),
    }
}

/// Host metrics only
async fn api_system(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.dashboard.aggregator().collect_system().await)
}

/// Single service status, 404 for names that are not configured
async fn api_service(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    match state.dashboard.aggregator().probe_one(&name).await {
        Ok(status) => Json(status).into_response(),
        Err(e @ DashboardError::UnknownService(_)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: e.to_string(),
                service: Some(name),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
                service: Some(name),
            }),
        )
            .into_response(),
    }
}

/// History summary plus the newest checks
async fn api_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let log = state.dashboard.log();
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    Json(HistoryResponse {
        summary: log.summary().await,
        checks: log.recent(limit).await,
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/status", get(api_status))
        .route("/api/latest", get(api_latest))
        .route("/api/system", get(api_system))
        .route("/api/health/:name", get(api_service))
        .route("/api/history", get(api_history))
        .with_state(state)
}

/// Start the API server, returning when `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting dashboard server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
