//! slt - run StackLight plugin checks against a deployed environment.
//!
//! Endpoints come from flags (or `SLT_*` variables); plugin paths, log level
//! and wait bounds from the suite configuration variables.

use anyhow::Result;
use clap::Parser;
use stacklight_settings::SuiteConfig;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match SuiteConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error::print_error(&e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli.run(config).await {
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
