//! Plugin settings.

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::Serialize;
use stacklight_settings::{lma_collector, OptionMap, PluginOptions, PluginSettings};
use tabled::Tabled;

use crate::output::{mask_secret, print_output, print_single, OutputFormat};

use super::CommandContext;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Plugin {
    InfluxdbGrafana,
    LmaCollector,
}

#[derive(Debug, Args)]
pub struct SettingsCommand {
    /// Plugin whose settings to show.
    #[arg(long, value_enum, default_value = "influxdb-grafana")]
    plugin: Plugin,

    /// Show the toolchain activation options instead of the defaults.
    #[arg(long)]
    toolchain: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct SettingRow {
    #[tabled(rename = "Setting")]
    key: String,

    #[tabled(rename = "Value")]
    value: String,
}

impl SettingRow {
    fn new(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }
}

impl SettingsCommand {
    pub fn run(self, ctx: CommandContext) -> Result<()> {
        match self.plugin {
            Plugin::InfluxdbGrafana => {
                let settings = ctx.settings();
                if ctx.format == OutputFormat::Json {
                    print_single(&settings);
                    return Ok(());
                }

                let mut rows = plugin_rows(&settings.plugin, self.toolchain);
                rows.push(SettingRow::new("influxdb_db_name", &settings.influxdb_db_name));
                rows.push(SettingRow::new("influxdb_port", settings.influxdb_port.to_string()));
                rows.push(SettingRow::new(
                    "grafana_port",
                    settings
                        .grafana_port
                        .map_or_else(|| "(protocol default)".to_string(), |p| p.to_string()),
                ));
                print_output(&rows, ctx.format);
            }
            Plugin::LmaCollector => {
                let settings = lma_collector::settings(&ctx.config.lma_collector_plugin_path);
                if ctx.format == OutputFormat::Json {
                    print_single(&settings);
                    return Ok(());
                }
                print_output(&plugin_rows(&settings, self.toolchain), ctx.format);
            }
        }
        Ok(())
    }
}

fn plugin_rows<O: PluginOptions>(plugin: &PluginSettings<O>, toolchain: bool) -> Vec<SettingRow> {
    let options: OptionMap = if toolchain {
        plugin.toolchain_option_map()
    } else {
        plugin.default_option_map()
    };

    let mut rows = vec![
        SettingRow::new("name", plugin.name),
        SettingRow::new("plugin_path", plugin.plugin_path.display().to_string()),
        SettingRow::new("version", plugin.version_str()),
        SettingRow::new(
            "topology",
            if plugin.is_legacy() { "legacy" } else { "current" },
        ),
    ];
    rows.extend(
        options
            .iter()
            .map(|(key, value)| SettingRow::new(key, mask_secret(key, value))),
    );
    rows
}
