//! Dashboard configuration
//!
//! Values come from an optional config file layered under `DASHBOARD_*`
//! environment variables. Nested keys use a double underscore, e.g.
//! `DASHBOARD_THRESHOLDS__CPU_LOAD_CEILING=8`. Services can be listed in the
//! file or with the `DASHBOARD_TARGETS="api=http://...,db=http://..."` shorthand.

use anyhow::{bail, Context, Result};
use dashboard_lib::{AlertThresholds, ServiceTarget};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "DASHBOARD";
const TARGETS_VAR: &str = "DASHBOARD_TARGETS";
const CONFIG_PATH_VAR: &str = "DASHBOARD_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "dashboard.toml";

/// Dashboard configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Listen port for the dashboard and API
    #[serde(default = "default_port")]
    pub port: u16,

    /// Name reported by `/health`
    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// Number of checks kept in the alert history
    #[serde(default = "default_history_retention")]
    pub history_retention: usize,

    /// JSON file mirroring the alert history (in-memory only when unset)
    #[serde(default)]
    pub history_path: Option<PathBuf>,

    /// Client-side refresh interval of the HTML page
    #[serde(default = "default_refresh")]
    pub refresh_secs: u64,

    /// Probe targets in display order
    #[serde(default)]
    pub services: Vec<ServiceTarget>,

    #[serde(default)]
    pub thresholds: AlertThresholds,

    /// Static operator-supplied fields shown next to the measured ones
    #[serde(default)]
    pub display: BTreeMap<String, String>,
}

fn default_port() -> u16 {
    3000
}

fn default_service_name() -> String {
    "status-dashboard".to_string()
}

fn default_poll_interval() -> u64 {
    30
}

fn default_probe_timeout() -> u64 {
    5000
}

fn default_history_retention() -> usize {
    dashboard_lib::history::DEFAULT_RETENTION
}

fn default_refresh() -> u64 {
    dashboard_lib::presenter::DEFAULT_REFRESH_SECS
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            service_name: default_service_name(),
            poll_interval_secs: default_poll_interval(),
            probe_timeout_ms: default_probe_timeout(),
            history_retention: default_history_retention(),
            history_path: None,
            refresh_secs: default_refresh(),
            services: Vec::new(),
            thresholds: AlertThresholds::default(),
            display: BTreeMap::new(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from the process environment and config file
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Some(Path::new(&path)), None)
    }

    /// Load from an optional file and an explicit variable map
    ///
    /// `env: None` reads the process environment.
    pub fn load_from(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let targets_shorthand = match &env {
            Some(vars) => vars.get(TARGETS_VAR).cloned(),
            None => std::env::var(TARGETS_VAR).ok(),
        };

        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let mut config: DashboardConfig = builder
            .build()
            .context("Failed to read dashboard configuration")?
            .try_deserialize()
            .context("Invalid dashboard configuration")?;

        if let Some(list) = targets_shorthand {
            config.services.extend(parse_targets(&list)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the dashboard cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be greater than zero");
        }
        if self.probe_timeout_ms == 0 {
            bail!("probe_timeout_ms must be greater than zero");
        }
        if self.history_retention == 0 {
            bail!("history_retention must be greater than zero");
        }
        let t = &self.thresholds;
        if t.memory_warning_ratio >= t.memory_critical_ratio {
            bail!(
                "memory_warning_ratio ({}) must be below memory_critical_ratio ({})",
                t.memory_warning_ratio,
                t.memory_critical_ratio
            );
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Parse `name=url` pairs separated by commas
pub fn parse_targets(list: &str) -> Result<Vec<ServiceTarget>> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, url) = entry
                .split_once('=')
                .with_context(|| format!("Expected name=url in {TARGETS_VAR}, got {entry:?}"))?;
            Ok(ServiceTarget::new(name.trim(), url.trim()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::load_from(None, env(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.history_retention, 100);
        assert!(config.services.is_empty());
    }

    #[test]
    fn test_env_overrides_and_targets_shorthand() {
        let config = DashboardConfig::load_from(
            None,
            env(&[
                ("DASHBOARD_PORT", "8088"),
                ("DASHBOARD_PROBE_TIMEOUT_MS", "1500"),
                ("DASHBOARD_THRESHOLDS__CPU_LOAD_CEILING", "8.5"),
                ("DASHBOARD_TARGETS", "api=http://localhost:8080/health, db=http://localhost:5433/"),
            ]),
        )
        .unwrap();

        assert_eq!(config.port, 8088);
        assert_eq!(config.probe_timeout_ms, 1500);
        assert_eq!(config.thresholds.cpu_load_ceiling, 8.5);
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[0].name, "api");
        assert_eq!(config.services[1].url, "http://localhost:5433/");
    }

    #[test]
    fn test_file_services_come_before_shorthand() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
poll_interval_secs = 10

[[services]]
name = "gateway"
url = "http://gateway.local/health"
system = true

[display]
environment = "staging"
"#
        )
        .unwrap();

        let config = DashboardConfig::load_from(
            Some(file.path()),
            env(&[("DASHBOARD_TARGETS", "api=http://api.local/")]),
        )
        .unwrap();

        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.services[0].name, "gateway");
        assert!(config.services[0].system);
        assert_eq!(config.services[1].name, "api");
        assert_eq!(config.display["environment"], "staging");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(DashboardConfig::load_from(None, env(&[("DASHBOARD_POLL_INTERVAL_SECS", "0")])).is_err());
        assert!(DashboardConfig::load_from(None, env(&[("DASHBOARD_TARGETS", "no-equals-sign")])).is_err());
        assert!(DashboardConfig::load_from(
            None,
            env(&[("DASHBOARD_THRESHOLDS__MEMORY_WARNING_RATIO", "0.99")])
        )
        .is_err());
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let config =
            DashboardConfig::load_from(Some(Path::new("/nonexistent/dashboard.toml")), env(&[]))
                .unwrap();
        assert_eq!(config.service_name, "status-dashboard");
    }
}
