//! Disruptive scenarios for the StackLight plugins toolchain.
//!
//! Each scenario reverts a deployed environment, cuts the network, waits
//! for every plugin to come back online, and finishes with an OSTF run.
//! The environment itself (snapshots, SSH, network emulation) is reached
//! through [`Environment`]; plugins through [`PluginHealth`].
//!
//! Scenarios stop at the first failing step.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stacklight_testing::{wait_plugin_online, HealthError, PluginHealth, PollPolicy, WaitError};
use thiserror::Error;
use tracing::info;

/// Snapshot with the toolchain deployed on HA controllers.
pub const HA_TOOLCHAIN_SNAPSHOT: &str = "deploy_ha_toolchain";

/// Snapshot with the toolchain deployed on a standalone node.
pub const TOOLCHAIN_SNAPSHOT: &str = "deploy_toolchain";

/// Roles carried by the standalone toolchain node.
pub const STACKLIGHT_ROLES: [&str; 3] = [
    "elasticsearch_kibana",
    "influxdb_grafana",
    "infrastructure_alerting",
];

/// How long the whole cluster stays disconnected.
pub const CLUSTER_OUTAGE: Duration = Duration::from_secs(7 * 60);

/// How long the toolchain node stays disconnected.
pub const NODE_OUTAGE: Duration = Duration::from_secs(30);

/// Operations on the deployed test environment.
#[async_trait]
pub trait Environment: Send + Sync {
    async fn revert_snapshot(&self, name: &str) -> anyhow::Result<()>;

    /// Cut every node off the network and restore it after
    /// `delay_before_recover`.
    async fn emulate_whole_network_disaster(
        &self,
        delay_before_recover: Duration,
    ) -> anyhow::Result<()>;

    /// Name of the primary node carrying all of `roles`.
    async fn master_node_by_role(&self, roles: &[&str]) -> anyhow::Result<String>;

    /// Take down the network interfaces of `node` for `duration`.
    async fn simulate_network_interrupt_on_node(
        &self,
        node: &str,
        duration: Duration,
    ) -> anyhow::Result<()>;

    /// Run the OpenStack health checks.
    async fn run_ostf(&self) -> anyhow::Result<()>;
}

/// A step of a disruptive scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioStep {
    RevertSnapshot,
    NetworkDisaster,
    LocateNode,
    NetworkInterrupt,
    WaitPluginOnline,
    RunOstf,
}

impl fmt::Display for ScenarioStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RevertSnapshot => "revert_snapshot",
            Self::NetworkDisaster => "network_disaster",
            Self::LocateNode => "locate_node",
            Self::NetworkInterrupt => "network_interrupt",
            Self::WaitPluginOnline => "wait_plugin_online",
            Self::RunOstf => "run_ostf",
        };
        f.write_str(name)
    }
}

/// Scenario failures.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("{step} failed: {source}")]
    Environment {
        step: ScenarioStep,
        #[source]
        source: anyhow::Error,
    },

    #[error("plugin {plugin} did not recover: {source}")]
    PluginOffline {
        plugin: String,
        #[source]
        source: WaitError<HealthError>,
    },
}

impl ScenarioError {
    pub fn step(&self) -> ScenarioStep {
        match self {
            Self::Environment { step, .. } => *step,
            Self::PluginOffline { .. } => ScenarioStep::WaitPluginOnline,
        }
    }
}

pub type Result<T, E = ScenarioError> = std::result::Result<T, E>;

fn at(step: ScenarioStep) -> impl FnOnce(anyhow::Error) -> ScenarioError {
    move |source| ScenarioError::Environment { step, source }
}

/// The toolchain plugins and the environment they are deployed in.
pub struct Toolchain {
    env: Arc<dyn Environment>,
    plugins: Vec<Arc<dyn PluginHealth>>,
    policy: PollPolicy,
}

impl Toolchain {
    pub fn new(env: Arc<dyn Environment>, policy: PollPolicy) -> Self {
        Self {
            env,
            plugins: Vec::new(),
            policy,
        }
    }

    /// Add a plugin that must recover after each outage.
    pub fn with_plugin(mut self, plugin: Arc<dyn PluginHealth>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Verify the backends and dashboards recover after a network outage of
    /// the whole HA cluster.
    pub async fn check_cluster_outage_toolchain(&self) -> Result<()> {
        info!(snapshot = HA_TOOLCHAIN_SNAPSHOT, "Revert the HA toolchain snapshot");
        self.env
            .revert_snapshot(HA_TOOLCHAIN_SNAPSHOT)
            .await
            .map_err(at(ScenarioStep::RevertSnapshot))?;

        info!(delay = ?CLUSTER_OUTAGE, "Simulate a network outage of the whole cluster");
        self.env
            .emulate_whole_network_disaster(CLUSTER_OUTAGE)
            .await
            .map_err(at(ScenarioStep::NetworkDisaster))?;

        self.wait_plugins_online().await?;

        // The OpenStack cluster may not fully recover; the toolchain must.
        self.run_ostf().await
    }

    /// Verify the backends and dashboards recover after a network outage
    /// of the standalone toolchain node.
    pub async fn check_node_outage_toolchain(&self) -> Result<()> {
        info!(snapshot = TOOLCHAIN_SNAPSHOT, "Revert the toolchain snapshot");
        self.env
            .revert_snapshot(TOOLCHAIN_SNAPSHOT)
            .await
            .map_err(at(ScenarioStep::RevertSnapshot))?;

        let node = self
            .env
            .master_node_by_role(&STACKLIGHT_ROLES)
            .await
            .map_err(at(ScenarioStep::LocateNode))?;

        info!(
            node = %node,
            duration = ?NODE_OUTAGE,
            "Simulate network interruption on the toolchain node"
        );
        self.env
            .simulate_network_interrupt_on_node(&node, NODE_OUTAGE)
            .await
            .map_err(at(ScenarioStep::NetworkInterrupt))?;

        self.wait_plugins_online().await?;
        self.run_ostf().await
    }

    async fn wait_plugins_online(&self) -> Result<()> {
        for plugin in &self.plugins {
            wait_plugin_online(plugin.as_ref(), &self.policy)
                .await
                .map_err(|source| ScenarioError::PluginOffline {
                    plugin: plugin.plugin_name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    async fn run_ostf(&self) -> Result<()> {
        info!("Run OSTF");
        self.env.run_ostf().await.map_err(at(ScenarioStep::RunOstf))
    }
}
