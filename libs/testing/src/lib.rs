//! # stacklight-testing
//!
//! Helpers shared by the StackLight checks and disruptive scenarios:
//!
//! - [`wait_until`]: bounded polling with an explicit timeout and interval
//! - [`PluginHealth`]: the seam scenarios use to wait for plugin recovery
//! - [`init_test_tracing`]: tracing output captured by the test harness

mod health;
mod poll;

pub use health::{wait_plugin_online, HealthError, PluginHealth};
pub use poll::{wait_until, PollPolicy, WaitError};

/// Install a tracing subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,stacklight=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
