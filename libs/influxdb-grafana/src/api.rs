//! API of the InfluxDB-Grafana plugin under test.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Response;
use serde_json::Value;
use stacklight_settings::influxdb_grafana::{GRAFANA_VIP_NAME, VIP_NAME};
use stacklight_settings::{InfluxdbGrafanaSettings, OptionMap, UserCredentials};
use stacklight_testing::{HealthError, PluginHealth, PollPolicy, WaitError};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::checker::{HttpChecker, DEFAULT_REQUEST_TIMEOUT};
use crate::collaborators::{DashboardUi, PluginManager};
use crate::endpoint::{Protocol, ServiceDiscovery, ServiceEndpoint};
use crate::error::{CheckError, OnlineStep, Result};
use crate::query::{
    last_value_query, series_query, values_match, QueryResponse, SeriesPoint, LAST_VALUE_WINDOW,
    RECENT_SERIES_SINCE,
};
use crate::status::ExpectedStatus;

const NOVA_INSTANCE_CREATION_TIME: &str = "openstack_nova_instance_creation_time";

/// Protocol and port Grafana is served on, resolved once per client.
#[derive(Debug, Clone, Copy)]
struct GrafanaAccess {
    protocol: Protocol,
    port: u16,
}

/// Client for the InfluxDB and Grafana services deployed by the plugin.
pub struct InfluxdbPluginApi {
    settings: InfluxdbGrafanaSettings,
    discovery: Arc<dyn ServiceDiscovery>,
    plugin_manager: Option<Arc<dyn PluginManager>>,
    dashboard_ui: Option<Arc<dyn DashboardUi>>,
    checker: HttpChecker,
    grafana_access: OnceCell<GrafanaAccess>,
}

impl InfluxdbPluginApi {
    pub fn new(
        settings: InfluxdbGrafanaSettings,
        discovery: Arc<dyn ServiceDiscovery>,
    ) -> Result<Self> {
        Ok(Self {
            settings,
            discovery,
            plugin_manager: None,
            dashboard_ui: None,
            checker: HttpChecker::new(DEFAULT_REQUEST_TIMEOUT)?,
            grafana_access: OnceCell::new(),
        })
    }

    /// Replace the per-request timeout (30s by default).
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.checker = HttpChecker::new(timeout)?;
        Ok(self)
    }

    pub fn with_plugin_manager(mut self, manager: Arc<dyn PluginManager>) -> Self {
        self.plugin_manager = Some(manager);
        self
    }

    pub fn with_dashboard_ui(mut self, ui: Arc<dyn DashboardUi>) -> Self {
        self.dashboard_ui = Some(ui);
        self
    }

    pub fn settings(&self) -> &InfluxdbGrafanaSettings {
        &self.settings
    }

    fn plugin_manager(&self) -> Result<&dyn PluginManager> {
        self.plugin_manager
            .as_deref()
            .ok_or(CheckError::MissingCollaborator("plugin manager"))
    }

    fn dashboard_ui(&self) -> Result<&dyn DashboardUi> {
        self.dashboard_ui
            .as_deref()
            .ok_or(CheckError::MissingCollaborator("dashboard UI"))
    }

    // =========================================================================
    // Plugin lifecycle
    // =========================================================================

    pub async fn prepare_plugin(&self) -> Result<()> {
        self.plugin_manager()?
            .prepare_plugin(&self.settings.plugin.plugin_path)
            .await
            .map_err(|source| CheckError::Collaborator {
                operation: "prepare plugin",
                source,
            })
    }

    /// Activate the plugin, with its default options unless `options` is set.
    pub async fn activate_plugin(&self, options: Option<&OptionMap>) -> Result<()> {
        let defaults;
        let options = match options {
            Some(options) => options,
            None => {
                defaults = self.settings.plugin.default_option_map();
                &defaults
            }
        };
        let plugin = &self.settings.plugin;
        self.plugin_manager()?
            .activate_plugin(plugin.name, plugin.version_str(), options)
            .await
            .map_err(|source| CheckError::Collaborator {
                operation: "activate plugin",
                source,
            })
    }

    pub async fn uninstall_plugin(&self) -> Result<()> {
        let plugin = &self.settings.plugin;
        self.plugin_manager()?
            .uninstall_plugin(plugin.name, plugin.version_str())
            .await
            .map_err(|source| CheckError::Collaborator {
                operation: "uninstall plugin",
                source,
            })
    }

    /// Succeeds when the plugin refuses to be uninstalled.
    pub async fn check_uninstall_failure(&self) -> Result<()> {
        let plugin = &self.settings.plugin;
        self.plugin_manager()?
            .check_plugin_cannot_be_uninstalled(plugin.name, plugin.version_str())
            .await
            .map_err(|source| CheckError::Collaborator {
                operation: "check uninstall failure",
                source,
            })
    }

    // =========================================================================
    // Endpoints
    // =========================================================================

    async fn vip(&self, name: &str) -> Result<String> {
        self.discovery
            .vip_address(name)
            .await
            .map_err(|source| CheckError::Discovery {
                service: format!("VIP '{name}'"),
                source,
            })
    }

    async fn grafana_access(&self) -> Result<GrafanaAccess> {
        let access = self
            .grafana_access
            .get_or_try_init(|| async {
                let protocol = self.discovery.http_protocol().await.map_err(|source| {
                    CheckError::Discovery {
                        service: "dashboard protocol".to_string(),
                        source,
                    }
                })?;
                let port = self
                    .settings
                    .grafana_port
                    .unwrap_or_else(|| protocol.default_port());
                Ok::<_, CheckError>(GrafanaAccess { protocol, port })
            })
            .await?;
        Ok(*access)
    }

    /// InfluxDB endpoint: plain HTTP on the fixed InfluxDB port.
    pub async fn influxdb_endpoint(&self) -> Result<ServiceEndpoint> {
        let vip = self.vip(VIP_NAME).await?;
        Ok(ServiceEndpoint::new(
            Protocol::Http,
            vip,
            self.settings.influxdb_port,
        ))
    }

    /// Grafana endpoint. `0.x` plugins serve Grafana behind the InfluxDB VIP.
    pub async fn grafana_endpoint(&self) -> Result<ServiceEndpoint> {
        let access = self.grafana_access().await?;
        let vip_name = if self.settings.plugin.is_legacy() {
            VIP_NAME
        } else {
            GRAFANA_VIP_NAME
        };
        let vip = self.vip(vip_name).await?;
        Ok(ServiceEndpoint::new(access.protocol, vip, access.port))
    }

    pub async fn influxdb_url(&self, path: &str) -> Result<String> {
        Ok(self.influxdb_endpoint().await?.url(path))
    }

    pub async fn grafana_url(&self, path: &str) -> Result<String> {
        Ok(self.grafana_endpoint().await?.url(path))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Run `query` against database `db` as `user`, requiring an `expected`
    /// status. The response is returned unparsed.
    pub async fn query(
        &self,
        db: &str,
        query: &str,
        user: &str,
        password: &str,
        expected: &ExpectedStatus,
    ) -> Result<Response> {
        debug!(query, db, user, "Making query to InfluxDB");
        let url = self.influxdb_url("query").await?;
        self.checker
            .check_get(
                &url,
                expected,
                &[("db", db), ("u", user), ("p", password), ("q", query)],
                None,
            )
            .await
    }

    /// Run `query` on the plugin database with the given credentials.
    pub async fn query_as(
        &self,
        query: &str,
        creds: &UserCredentials,
        expected: &ExpectedStatus,
    ) -> Result<Response> {
        self.query(
            &self.settings.influxdb_db_name,
            query,
            &creds.username,
            &creds.password,
            expected,
        )
        .await
    }

    /// Run `query` on the plugin database as the plugin user.
    pub async fn query_default(&self, query: &str, expected: &ExpectedStatus) -> Result<Response> {
        self.query_as(query, &self.settings.influxdb_user, expected)
            .await
    }

    /// Run `query` as the plugin user and parse the result.
    pub async fn query_json(&self, query: &str) -> Result<QueryResponse> {
        self.query_json_as(query, &self.settings.influxdb_user).await
    }

    async fn query_json_as(&self, query: &str, creds: &UserCredentials) -> Result<QueryResponse> {
        let response = self.query_as(query, creds, &ExpectedStatus::ok()).await?;
        let body = response.bytes().await?;
        QueryResponse::from_slice(&body)
    }

    // =========================================================================
    // Checks
    // =========================================================================

    /// Verify that InfluxDB and Grafana are up and enforce authentication.
    ///
    /// Steps run in [`OnlineStep::ALL`] order; the first failure aborts the
    /// check and is reported as [`CheckError::Step`].
    pub async fn check_online(&self) -> Result<()> {
        let settings = &self.settings;
        let influxdb = self.influxdb_endpoint().await?;
        info!("InfluxDB service is at {influxdb}");

        run_step(OnlineStep::InfluxdbPing, async {
            self.checker
                .check_get(&influxdb.url("ping"), &ExpectedStatus::no_content(), &[], None)
                .await
        })
        .await?;

        let rogue = UserCredentials::new(settings.influxdb_user.username.clone(), "rogue");
        run_step(
            OnlineStep::InfluxdbRequiresAuth,
            self.query_as("show measurements", &rogue, &ExpectedStatus::unauthorized()),
        )
        .await?;

        run_step(
            OnlineStep::InfluxdbUserAuthorized,
            self.query_as(
                "show measurements",
                &settings.influxdb_user,
                &ExpectedStatus::ok(),
            ),
        )
        .await?;

        // 401 is for InfluxDB 0.11 and 403 for InfluxDB 1.1
        run_step(
            OnlineStep::InfluxdbUserNotAdmin,
            self.query_as(
                "show stats",
                &settings.influxdb_user,
                &ExpectedStatus::unauthorized().or(403),
            ),
        )
        .await?;

        run_step(
            OnlineStep::InfluxdbRootIsAdmin,
            self.query_as("show stats", &settings.influxdb_root, &ExpectedStatus::ok()),
        )
        .await?;

        let grafana = self.grafana_endpoint().await?;
        info!("Grafana service is at {grafana}");

        run_step(OnlineStep::GrafanaLoginPage, async {
            self.checker
                .check_get(&grafana.url("login"), &ExpectedStatus::ok(), &[], None)
                .await
        })
        .await?;

        let org_url = grafana.url("api/org");
        run_step(OnlineStep::GrafanaAdminAuthorized, async {
            self.checker
                .check_get(
                    &org_url,
                    &ExpectedStatus::ok(),
                    &[],
                    Some(&settings.grafana_user),
                )
                .await
        })
        .await?;

        let rogue = UserCredentials::new(settings.grafana_user.username.clone(), "rogue");
        run_step(OnlineStep::GrafanaRequiresAuth, async {
            self.checker
                .check_get(&org_url, &ExpectedStatus::unauthorized(), &[], Some(&rogue))
                .await
        })
        .await?;

        Ok(())
    }

    /// Check the number of InfluxDB cluster members.
    ///
    /// Clustering was removed in plugin 1.0 (InfluxDB 1.1), so this only
    /// checks `0.x` plugins and is a no-op otherwise.
    pub async fn check_node_count(&self, expected: usize) -> Result<()> {
        if !self.settings.plugin.is_legacy() {
            debug!(
                version = self.settings.plugin.version_str(),
                "skipping InfluxDB node count check, clustering not supported"
            );
            return Ok(());
        }

        debug!("Check the number of InfluxDB servers");
        let response = self
            .query_json_as("show servers", &self.settings.influxdb_root)
            .await?;
        let actual = response
            .first_series_rows()?
            .ok_or_else(|| CheckError::NotFound {
                query: "show servers".to_string(),
            })?
            .len();

        if actual != expected {
            return Err(CheckError::ValueMismatch {
                header: "Wrong number of InfluxDB nodes!".to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    /// Check the most recent value of `metric` over the last few minutes.
    pub async fn check_last_metric_value(
        &self,
        metric: &str,
        filter: Option<&str>,
        expected: impl Into<Value>,
    ) -> Result<()> {
        let header = format!("Wrong last value of '{metric}'!");
        self.check_last_value(metric, LAST_VALUE_WINDOW, filter, &expected.into(), &header)
            .await
    }

    /// Check the reported state of a cluster service.
    pub async fn check_cluster_status(
        &self,
        name: &str,
        expected_status: impl Into<Value>,
        interval: &str,
    ) -> Result<()> {
        let filter = format!("cluster_name='{name}'");
        let header = format!("Wrong '{name}' service state has been found!");
        self.check_last_value(
            "cluster_status",
            interval,
            Some(&filter),
            &expected_status.into(),
            &header,
        )
        .await
    }

    /// Check how many HAProxy backends of `service` are in `node_state`.
    pub async fn check_count_of_haproxy_backends(
        &self,
        service: &str,
        node_state: &str,
        expected_count: i64,
        interval: &str,
    ) -> Result<()> {
        let filter = format!("backend='{service}' AND state='{node_state}'");
        let header =
            format!("Wrong amount of nodes with service '{service}' in '{node_state}' state!");
        self.check_last_value(
            "haproxy_backend_servers",
            interval,
            Some(&filter),
            &Value::from(expected_count),
            &header,
        )
        .await
    }

    async fn check_last_value(
        &self,
        metric: &str,
        window: &str,
        filter: Option<&str>,
        expected: &Value,
        header: &str,
    ) -> Result<()> {
        let query = last_value_query(metric, window, filter);
        let response = self.query_json(&query).await?;

        let Some(actual) = response.last_value()? else {
            error!(query = %query, "The query result is empty");
            return Err(CheckError::NotFound { query });
        };

        if !values_match(expected, actual) {
            return Err(CheckError::ValueMismatch {
                header: header.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    /// Values of `metric` since `time_filter` (e.g. `now() - 1h`), oldest
    /// first. Empty when the metric has no points in the window.
    pub async fn fetch_recent_metric_series(
        &self,
        metric: &str,
        time_filter: &str,
    ) -> Result<Vec<SeriesPoint>> {
        let response = self.query_json(&series_query(metric, time_filter)).await?;
        let Some(rows) = response.first_series_rows()? else {
            return Ok(Vec::new());
        };
        rows.iter().map(|row| SeriesPoint::from_row(row)).collect()
    }

    /// Nova instance creation times since `time_point` (default: last hour).
    pub async fn get_nova_instance_creation_time_metrics(
        &self,
        time_point: Option<&str>,
    ) -> Result<Vec<SeriesPoint>> {
        info!("Getting Nova instance creation metrics");
        self.fetch_recent_metric_series(
            NOVA_INSTANCE_CREATION_TIME,
            time_point.unwrap_or(RECENT_SERIES_SINCE),
        )
        .await
    }

    // =========================================================================
    // Dashboards
    // =========================================================================

    pub async fn check_grafana_dashboards(&self) -> Result<()> {
        let url = self.grafana_url("").await?;
        self.dashboard_ui()?
            .check_dashboards(&url)
            .await
            .map_err(|source| CheckError::Collaborator {
                operation: "check Grafana dashboards",
                source,
            })
    }

    /// Check dashboards are reachable with LDAP authentication, and with
    /// `authz` that LDAP groups grant the expected roles.
    pub async fn check_plugin_ldap(&self, authz: bool) -> Result<()> {
        let url = self.grafana_url("").await?;
        self.dashboard_ui()?
            .check_ldap(&url, authz)
            .await
            .map_err(|source| CheckError::Collaborator {
                operation: "check Grafana LDAP",
                source,
            })
    }

    /// Poll [`check_online`](Self::check_online) until it passes.
    pub async fn wait_plugin_online(
        &self,
        policy: &PollPolicy,
    ) -> Result<(), WaitError<HealthError>> {
        stacklight_testing::wait_plugin_online(self, policy).await
    }
}

#[async_trait]
impl PluginHealth for InfluxdbPluginApi {
    fn plugin_name(&self) -> &str {
        self.settings.plugin.name
    }

    async fn check_online(&self) -> Result<(), HealthError> {
        InfluxdbPluginApi::check_online(self)
            .await
            .map_err(Into::into)
    }
}

async fn run_step<T, F>(step: OnlineStep, check: F) -> Result<()>
where
    F: Future<Output = Result<T>>,
{
    info!(step = %step, "{}", step.description());
    check.await.map(drop).map_err(|source| CheckError::Step {
        step,
        source: Box::new(source),
    })
}
