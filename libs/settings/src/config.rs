//! Suite configuration loaded from the environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Default bound on waiting for a plugin to come back online.
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 5 * 60;

/// Default delay between two online checks.
pub const DEFAULT_WAIT_INTERVAL_SECS: u64 = 5;

/// Default bound on a single HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration shared by the checks and scenarios.
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    /// Package path of the InfluxDB-Grafana plugin.
    pub influxdb_grafana_plugin_path: PathBuf,

    /// Package path of the LMA collector plugin.
    pub lma_collector_plugin_path: PathBuf,

    /// Log filter (trace, debug, info, warn, error or a directive list).
    pub log_level: String,

    pub wait_timeout: Duration,

    pub wait_interval: Duration,

    /// Bound on each HTTP request sent to the plugin services.
    pub request_timeout: Duration,
}

impl SuiteConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let influxdb_grafana_plugin_path = lookup("INFLUXDB_GRAFANA_PLUGIN_PATH")
            .map(PathBuf::from)
            .unwrap_or_default();

        let lma_collector_plugin_path = lookup("LMA_COLLECTOR_PLUGIN_PATH")
            .map(PathBuf::from)
            .unwrap_or_default();

        let log_level = lookup("STACKLIGHT_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let wait_timeout = secs(
            &lookup,
            "STACKLIGHT_WAIT_TIMEOUT_SECS",
            DEFAULT_WAIT_TIMEOUT_SECS,
        )?;
        let wait_interval = secs(
            &lookup,
            "STACKLIGHT_WAIT_INTERVAL_SECS",
            DEFAULT_WAIT_INTERVAL_SECS,
        )?;

        let request_timeout = secs(
            &lookup,
            "STACKLIGHT_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        if wait_interval.is_zero() {
            anyhow::bail!("STACKLIGHT_WAIT_INTERVAL_SECS must be greater than zero");
        }
        if request_timeout.is_zero() {
            anyhow::bail!("STACKLIGHT_REQUEST_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            influxdb_grafana_plugin_path,
            lma_collector_plugin_path,
            log_level,
            wait_timeout,
            wait_interval,
            request_timeout,
        })
    }
}

fn secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Duration::from_secs)
            .with_context(|| format!("Invalid {key}: {raw:?}")),
        None => Ok(Duration::from_secs(default)),
    }
}
