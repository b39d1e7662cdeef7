//! API client for communicating with the status dashboard

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

/// Errors reported by the dashboard API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {body}")]
    Status { status: StatusCode, body: String },
}

/// API client for the dashboard
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        self.get_url(url, path).await
    }

    async fn get_url<T: DeserializeOwned>(&self, url: Url, path: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let message = match response.json::<ErrorResponse>().await {
                Ok(err) => err.error,
                Err(_) => path.to_string(),
            };
            return Err(ApiError::NotFound(message).into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body }.into());
        }

        response.json().await.context("Failed to parse response")
    }

    /// Full snapshot from a fresh poll
    pub async fn status(&self) -> Result<Snapshot> {
        self.get("api/status").await
    }

    pub async fn system(&self) -> Result<SystemMetrics> {
        self.get("api/system").await
    }

    /// One service by name; the name is sent as a single encoded path segment
    pub async fn service(&self, name: &str) -> Result<ServiceStatus> {
        let mut url = self.base_url.join("api/health/").context("Invalid path")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("API URL cannot carry a path: {}", self.base_url))?
            .pop_if_empty()
            .push(name);
        let path = url.path().to_string();
        self.get_url(url, &path).await
    }

    pub async fn history(&self, limit: usize) -> Result<HistoryResponse> {
        self.get(&format!("api/history?limit={}", limit)).await
    }

    /// Self-health of the dashboard; 503 still carries a body
    pub async fn health(&self) -> Result<DashboardHealth> {
        let url = self.base_url.join("health").context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body }.into());
        }

        response.json().await.context("Failed to parse response")
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetrics {
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
    pub available: bool,
}

impl SystemMetrics {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub url: String,
    pub state: String,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub observed_at: String,
    #[serde(default)]
    pub system: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub severity: String,
    pub source: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: String,
    pub system: SystemMetrics,
    pub services: Vec<ServiceStatus>,
    pub overall_health: String,
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub display: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: String,
    pub overall_health: String,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total_checks: u64,
    pub total_alerts: u64,
    pub last_status: Option<String>,
    pub retained: usize,
    pub start_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub summary: HistorySummary,
    pub checks: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub consecutive_failures: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardHealth {
    pub status: String,
    pub service: String,
    pub version: String,
    pub port: u16,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}
