//! Plugin health seam used by disruptive scenarios.

use std::error::Error as StdError;

use async_trait::async_trait;
use tracing::info;

use crate::poll::{wait_until, PollPolicy, WaitError};

/// Boxed error returned by a health check.
pub type HealthError = Box<dyn StdError + Send + Sync + 'static>;

/// A plugin whose backends can be checked for availability.
#[async_trait]
pub trait PluginHealth: Send + Sync {
    /// Plugin name, for logs and error messages.
    fn plugin_name(&self) -> &str;

    /// Run the full online check once, failing on the first broken step.
    async fn check_online(&self) -> Result<(), HealthError>;
}

/// Wait until `plugin` passes its online check.
pub async fn wait_plugin_online(
    plugin: &dyn PluginHealth,
    policy: &PollPolicy,
) -> Result<(), WaitError<HealthError>> {
    info!(
        plugin = plugin.plugin_name(),
        timeout = ?policy.timeout,
        "waiting until the plugin is online"
    );
    let what = format!("{} plugin online check", plugin.plugin_name());
    wait_until(&what, policy, || plugin.check_online()).await
}
