//! Online checks.

use anyhow::Result;
use clap::Args;

use crate::output::{print_check, print_info, OutputFormat};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct OnlineCommand {}

impl OnlineCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let api = ctx.api()?;
        api.check_online().await?;
        print_check(
            "online",
            "InfluxDB and Grafana are online and require authentication.",
            ctx.format,
        );
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct WaitOnlineCommand {
    /// Give up after this many seconds (default: STACKLIGHT_WAIT_TIMEOUT_SECS).
    #[arg(long)]
    timeout: Option<u64>,

    /// Seconds between two checks (default: STACKLIGHT_WAIT_INTERVAL_SECS).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,
}

impl WaitOnlineCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let api = ctx.api()?;
        let policy = ctx.poll_policy(self.timeout, self.interval);

        if ctx.format == OutputFormat::Table {
            print_info(&format!(
                "Waiting up to {}s for the plugin to come online",
                policy.timeout.as_secs()
            ));
        }
        api.wait_plugin_online(&policy).await?;

        print_check("wait-online", "The plugin is online.", ctx.format);
        Ok(())
    }
}
