//! Metric checks and queries.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use stacklight_influxdb_grafana::query::RECENT_SERIES_SINCE;
use tabled::Tabled;

use crate::output::{print_check, print_output};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct NodesCommand {
    /// Expected number of InfluxDB cluster members.
    #[arg(long)]
    expected: usize,
}

impl NodesCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let api = ctx.api()?;
        api.check_node_count(self.expected).await?;

        let message = if api.settings().plugin.is_legacy() {
            format!("InfluxDB has {} cluster members.", self.expected)
        } else {
            "InfluxDB clustering is not used by this plugin version; nothing to check.".to_string()
        };
        print_check("nodes", &message, ctx.format);
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct LastValueCommand {
    /// Measurement name, e.g. cluster_status.
    metric: String,

    /// Expected value; JSON literals (0, 1.5, true) compare as such.
    #[arg(long, value_parser = parse_value)]
    expected: Value,

    /// Extra WHERE condition, e.g. "cluster_name='mysql'".
    #[arg(long)]
    filter: Option<String>,
}

impl LastValueCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let api = ctx.api()?;
        api.check_last_metric_value(&self.metric, self.filter.as_deref(), self.expected.clone())
            .await?;

        print_check(
            "last-value",
            &format!("Last value of '{}' is {}.", self.metric, self.expected),
            ctx.format,
        );
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct SeriesCommand {
    /// Measurement name.
    metric: String,

    /// Lower time bound as an InfluxQL expression.
    #[arg(long, default_value = RECENT_SERIES_SINCE)]
    since: String,
}

#[derive(Debug, Serialize, Tabled)]
struct PointRow {
    #[tabled(rename = "Time")]
    time: String,

    #[tabled(rename = "Value")]
    value: String,
}

impl SeriesCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let api = ctx.api()?;
        let points = api.fetch_recent_metric_series(&self.metric, &self.since).await?;

        let rows: Vec<PointRow> = points
            .iter()
            .map(|point| PointRow {
                time: point.time.to_rfc3339(),
                value: point.value.to_string(),
            })
            .collect();
        print_output(&rows, ctx.format);
        Ok(())
    }
}

fn parse_value(s: &str) -> Result<Value, String> {
    Ok(serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string())))
}
