//! CLI commands.

mod metrics;
mod online;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stacklight_influxdb_grafana::{InfluxdbPluginApi, Protocol, StaticDiscovery};
use stacklight_settings::influxdb_grafana::{self, GRAFANA_VIP_NAME, VIP_NAME};
use stacklight_settings::{InfluxdbGrafanaSettings, SuiteConfig};
use stacklight_testing::PollPolicy;
use tracing::debug;

use crate::output::OutputFormat;

/// slt - check the StackLight InfluxDB-Grafana plugin of a deployed environment.
#[derive(Debug, Parser)]
#[command(name = "slt")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    /// Virtual IP of the InfluxDB service.
    #[arg(long, global = true, env = "SLT_INFLUXDB_VIP")]
    influxdb_vip: Option<String>,

    /// Virtual IP of the Grafana service (defaults to the InfluxDB VIP).
    #[arg(long, global = true, env = "SLT_GRAFANA_VIP")]
    grafana_vip: Option<String>,

    /// Protocol of the public dashboards (http or https).
    #[arg(long, global = true, env = "SLT_PROTOCOL", default_value = "http")]
    protocol: Protocol,

    /// Plugin package path; overrides INFLUXDB_GRAFANA_PLUGIN_PATH.
    #[arg(long, global = true)]
    plugin_path: Option<PathBuf>,

    /// InfluxDB port, when not the plugin default.
    #[arg(long, global = true)]
    influxdb_port: Option<u16>,

    /// Grafana port, when not the protocol default.
    #[arg(long, global = true)]
    grafana_port: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the resolved plugin settings.
    Settings(settings::SettingsCommand),

    /// Check once that InfluxDB and Grafana are up and enforce authentication.
    Online(online::OnlineCommand),

    /// Poll the online check until it passes.
    WaitOnline(online::WaitOnlineCommand),

    /// Check the number of InfluxDB cluster members.
    Nodes(metrics::NodesCommand),

    /// Check the last value of a metric.
    LastValue(metrics::LastValueCommand),

    /// List recent points of a metric.
    Series(metrics::SeriesCommand),
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self, config: SuiteConfig) -> Result<()> {
        let format = match self.format.as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Table,
        };

        let ctx = CommandContext {
            config,
            format,
            influxdb_vip: self.influxdb_vip,
            grafana_vip: self.grafana_vip,
            protocol: self.protocol,
            plugin_path: self.plugin_path,
            influxdb_port: self.influxdb_port,
            grafana_port: self.grafana_port,
        };
        debug!(
            plugin_path = %ctx.plugin_path().display(),
            protocol = %ctx.protocol,
            "Resolved command context"
        );

        match self.command {
            Commands::Settings(cmd) => cmd.run(ctx),
            Commands::Online(cmd) => cmd.run(ctx).await,
            Commands::WaitOnline(cmd) => cmd.run(ctx).await,
            Commands::Nodes(cmd) => cmd.run(ctx).await,
            Commands::LastValue(cmd) => cmd.run(ctx).await,
            Commands::Series(cmd) => cmd.run(ctx).await,
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: SuiteConfig,
    pub format: OutputFormat,
    pub influxdb_vip: Option<String>,
    pub grafana_vip: Option<String>,
    pub protocol: Protocol,
    pub plugin_path: Option<PathBuf>,
    pub influxdb_port: Option<u16>,
    pub grafana_port: Option<u16>,
}

impl CommandContext {
    /// Plugin package path, preferring the flag over the configuration.
    pub fn plugin_path(&self) -> PathBuf {
        self.plugin_path
            .clone()
            .unwrap_or_else(|| self.config.influxdb_grafana_plugin_path.clone())
    }

    /// Settings of the InfluxDB-Grafana plugin, with port overrides applied.
    pub fn settings(&self) -> InfluxdbGrafanaSettings {
        let settings = influxdb_grafana::settings(&self.plugin_path());
        let influxdb_port = self.influxdb_port.unwrap_or(settings.influxdb_port);
        settings.with_ports(influxdb_port, self.grafana_port)
    }

    /// Client for the plugin services named on the command line.
    pub fn api(&self) -> Result<InfluxdbPluginApi> {
        let influxdb_vip = self
            .influxdb_vip
            .as_deref()
            .context("No InfluxDB VIP specified. Use --influxdb-vip or set SLT_INFLUXDB_VIP.")?;
        let grafana_vip = self.grafana_vip.as_deref().unwrap_or(influxdb_vip);

        let discovery = StaticDiscovery::new(self.protocol)
            .with_vip(VIP_NAME, influxdb_vip)
            .with_vip(GRAFANA_VIP_NAME, grafana_vip);

        let api = InfluxdbPluginApi::new(self.settings(), Arc::new(discovery))?
            .with_request_timeout(self.config.request_timeout)?;
        Ok(api)
    }

    /// Polling bounds, with optional overrides of the configured ones.
    pub fn poll_policy(&self, timeout: Option<u64>, interval: Option<u64>) -> PollPolicy {
        PollPolicy::new(
            timeout.map_or(self.config.wait_timeout, Duration::from_secs),
            interval.map_or(self.config.wait_interval, Duration::from_secs),
        )
    }
}
