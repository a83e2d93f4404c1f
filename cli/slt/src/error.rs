//! Error display for the CLI.

use colored::Colorize;
use stacklight_influxdb_grafana::CheckError;
use stacklight_testing::{HealthError, WaitError};

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(hint) = hint(err) {
        eprintln!("\n{}", format!("Hint: {hint}").yellow());
    }
}

fn hint(err: &anyhow::Error) -> Option<&'static str> {
    if err.downcast_ref::<WaitError<HealthError>>().is_some() {
        return Some(concat!(
            "The plugin may need longer to recover. ",
            "Raise STACKLIGHT_WAIT_TIMEOUT_SECS or pass --timeout."
        ));
    }

    match err.downcast_ref::<CheckError>()?.root() {
        CheckError::UnexpectedStatus { actual: 401, .. }
        | CheckError::UnexpectedStatus { actual: 403, .. } => {
            Some("The service rejected the plugin credentials.")
        }
        CheckError::UnexpectedStatus { actual, .. } if *actual >= 500 => {
            Some("The service is up but failing. Check its logs on the plugin node.")
        }
        CheckError::Network(_) => {
            Some("Could not reach the service. Check the VIP, port and --protocol flags.")
        }
        CheckError::Discovery { .. } => Some("Use --influxdb-vip and --grafana-vip."),
        CheckError::NotFound { .. } => {
            Some("No recent data. The collectors may not be sending metrics yet.")
        }
        _ => None,
    }
}
