//! Operations delegated to the deployment framework.

use std::path::Path;

use async_trait::async_trait;
use stacklight_settings::OptionMap;

/// Plugin lifecycle on the master node.
#[async_trait]
pub trait PluginManager: Send + Sync {
    /// Upload and install the plugin package.
    async fn prepare_plugin(&self, plugin_path: &Path) -> anyhow::Result<()>;

    /// Enable the plugin in the cluster with the given options.
    async fn activate_plugin(
        &self,
        name: &str,
        version: &str,
        options: &OptionMap,
    ) -> anyhow::Result<()>;

    async fn uninstall_plugin(&self, name: &str, version: &str) -> anyhow::Result<()>;

    /// Succeeds when uninstalling the plugin is refused (it is in use).
    async fn check_plugin_cannot_be_uninstalled(
        &self,
        name: &str,
        version: &str,
    ) -> anyhow::Result<()>;
}

/// Browser-level dashboard checks.
#[async_trait]
pub trait DashboardUi: Send + Sync {
    async fn check_dashboards(&self, grafana_url: &str) -> anyhow::Result<()>;

    /// Log in through LDAP; with `authz`, also verify LDAP group mapping.
    async fn check_ldap(&self, grafana_url: &str, authz: bool) -> anyhow::Result<()>;
}
