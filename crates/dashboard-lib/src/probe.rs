//! Bounded-timeout HTTP health probes
//!
//! A probe issues exactly one request and never retries; the polling cadence
//! is the only retry policy. Every failure is folded into the returned
//! `ServiceStatus` rather than surfaced as an error.

use crate::error::{DashboardError, Result};
use crate::models::{ServiceStatus, ServiceTarget};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Default per-probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Body bytes read per check; the rest of a larger body is left unread
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Trait for service health probes
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    /// Check one target, classifying any failure as `Critical`
    async fn probe(&self, target: &ServiceTarget, timeout: Duration) -> ServiceStatus;
}

/// Probe issuing a single GET per check
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("status-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DashboardError::ProbeUnreachable(format!("failed to build client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn request(&self, target: &ServiceTarget, timeout: Duration) -> Result<()> {
        let timeout_ms = timeout.as_millis() as u64;
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                DashboardError::ProbeTimeout { timeout_ms }
            } else {
                DashboardError::ProbeUnreachable(e.to_string())
            }
        };

        let mut response = self
            .client
            .get(&target.url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        // Latency covers the body up to the cap, not just the headers.
        let mut read = 0;
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            read += chunk.len();
            if read >= MAX_BODY_BYTES {
                break;
            }
        }

        if status.is_success() {
            Ok(())
        } else {
            Err(DashboardError::ProbeHttpError {
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl ServiceProbe for HttpProbe {
    async fn probe(&self, target: &ServiceTarget, timeout: Duration) -> ServiceStatus {
        let start = Instant::now();
        let outcome = self.request(target, timeout).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => ServiceStatus::healthy(target, elapsed_ms),
            Err(e) => {
                debug!(service = %target.name, url = %target.url, error = %e, "Probe failed");
                ServiceStatus::critical(target, elapsed_ms, e.to_string())
            }
        }
    }
}

/// Check that a target has a name and an absolute http(s) URL
pub fn validate_target(target: &ServiceTarget) -> Result<()> {
    if target.name.trim().is_empty() {
        return Err(DashboardError::InvalidTarget(format!(
            "empty name for {}",
            target.url
        )));
    }

    let url = Url::parse(&target.url)
        .map_err(|e| DashboardError::InvalidTarget(format!("{}: {} ({e})", target.name, target.url)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(DashboardError::InvalidTarget(format!(
            "{}: unsupported scheme {other}",
            target.name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceState;
    use axum::{
        body::{Body, Bytes},
        http::StatusCode,
        routing::get,
        Router,
    };
    use futures_util::stream;

    async fn spawn_server() -> String {
        let app = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route(
                "/broken",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route(
                "/endless",
                get(|| async {
                    Body::from_stream(stream::repeat_with(|| {
                        Ok::<_, std::io::Error>(Bytes::from(vec![b'x'; 8192]))
                    }))
                }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    "late"
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn closed_port_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/health", addr)
    }

    #[tokio::test]
    async fn test_probe_2xx_is_healthy() {
        let base = spawn_server().await;
        let probe = HttpProbe::new().unwrap();
        let target = ServiceTarget::new("api", format!("{}/ok", base));

        let status = probe.probe(&target, Duration::from_secs(2)).await;

        assert_eq!(status.state, ServiceState::Healthy);
        assert!(status.error.is_none());
        assert_eq!(status.name, "api");
    }

    #[tokio::test]
    async fn test_probe_non_2xx_is_critical() {
        let base = spawn_server().await;
        let probe = HttpProbe::new().unwrap();
        let target = ServiceTarget::new("api", format!("{}/broken", base));

        let status = probe.probe(&target, Duration::from_secs(2)).await;

        assert_eq!(status.state, ServiceState::Critical);
        assert_eq!(status.error.as_deref(), Some("HTTP 500"));
    }

    #[tokio::test]
    async fn test_probe_stops_reading_oversized_body() {
        let base = spawn_server().await;
        let probe = HttpProbe::new().unwrap();
        let target = ServiceTarget::new("chatty", format!("{}/endless", base));

        let status = probe.probe(&target, Duration::from_secs(2)).await;

        assert_eq!(status.state, ServiceState::Healthy);
        assert!(status.response_time_ms < 2000);
    }

    #[tokio::test]
    async fn test_probe_timeout_is_critical() {
        let base = spawn_server().await;
        let probe = HttpProbe::new().unwrap();
        let target = ServiceTarget::new("slow", format!("{}/slow", base));

        let status = probe.probe(&target, Duration::from_millis(200)).await;

        assert_eq!(status.state, ServiceState::Critical);
        assert_eq!(status.error.as_deref(), Some("timed out after 200ms"));
        assert!(status.response_time_ms < 2000);
    }

    #[tokio::test]
    async fn test_probe_unreachable_is_critical() {
        let probe = HttpProbe::new().unwrap();
        let target = ServiceTarget::new("gone", closed_port_url().await);

        let status = probe.probe(&target, Duration::from_secs(2)).await;

        assert_eq!(status.state, ServiceState::Critical);
        assert!(status.error.unwrap().starts_with("unreachable"));
    }

    #[test]
    fn test_validate_target() {
        assert!(validate_target(&ServiceTarget::new("api", "http://localhost:8080/health")).is_ok());
        assert!(validate_target(&ServiceTarget::new("api", "not a url")).is_err());
        assert!(validate_target(&ServiceTarget::new("api", "ftp://host/file")).is_err());
        assert!(validate_target(&ServiceTarget::new(" ", "http://localhost")).is_err());
    }
}
