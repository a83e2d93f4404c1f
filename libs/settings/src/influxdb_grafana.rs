//! Settings of the InfluxDB-Grafana plugin.

use std::path::Path;

use serde::Serialize;

use crate::plugin::{put, OptionMap, PluginOptions, PluginSettings};

pub const NAME: &str = "influxdb_grafana";
pub const VIP_NAME: &str = "influxdb";
pub const GRAFANA_VIP_NAME: &str = "grafana";

pub const INFLUXDB_PORT: u16 = 8086;
pub const INFLUXDB_DB_NAME: &str = "lma";

/// A username/password pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserCredentials {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl UserCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Where Grafana keeps its own state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MysqlMode {
    Local,
    External { host: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MysqlOptions {
    pub mode: MysqlMode,
    pub dbname: String,
    pub user: UserCredentials,
}

/// Activation options of the plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfluxdbGrafanaOptions {
    #[serde(skip_serializing)]
    pub influxdb_rootpass: String,
    pub influxdb_user: UserCredentials,
    pub grafana_user: UserCredentials,
    pub mysql: MysqlOptions,
}

impl PluginOptions for InfluxdbGrafanaOptions {
    fn to_option_map(&self) -> OptionMap {
        let mut map = OptionMap::new();
        put(&mut map, "influxdb_rootpass", &self.influxdb_rootpass);
        put(&mut map, "influxdb_username", &self.influxdb_user.username);
        put(&mut map, "influxdb_userpass", &self.influxdb_user.password);
        put(&mut map, "grafana_username", &self.grafana_user.username);
        put(&mut map, "grafana_userpass", &self.grafana_user.password);
        match &self.mysql.mode {
            MysqlMode::Local => put(&mut map, "mysql_mode", "local"),
            MysqlMode::External { host } => {
                put(&mut map, "mysql_mode", "external");
                put(&mut map, "mysql_host", host);
            }
        }
        put(&mut map, "mysql_dbname", &self.mysql.dbname);
        put(&mut map, "mysql_username", &self.mysql.user.username);
        put(&mut map, "mysql_password", &self.mysql.user.password);
        map
    }
}

/// Everything the InfluxDB/Grafana checks need to know about the plugin.
#[derive(Debug, Clone, Serialize)]
pub struct InfluxdbGrafanaSettings {
    pub plugin: PluginSettings<InfluxdbGrafanaOptions>,
    pub influxdb_db_name: String,
    pub influxdb_user: UserCredentials,
    pub influxdb_root: UserCredentials,
    pub grafana_user: UserCredentials,
    pub influxdb_port: u16,
    /// Fixed Grafana port; derived from the protocol when unset.
    pub grafana_port: Option<u16>,
}

impl InfluxdbGrafanaSettings {
    /// Override the service ports, e.g. to point the checks at local mocks.
    pub fn with_ports(mut self, influxdb_port: u16, grafana_port: Option<u16>) -> Self {
        self.influxdb_port = influxdb_port;
        self.grafana_port = grafana_port;
        self
    }
}

/// Resolve plugin settings from its package path.
pub fn settings(plugin_path: &Path) -> InfluxdbGrafanaSettings {
    let influxdb_user = UserCredentials::new("influxdb", "influxdbpass");
    let influxdb_root = UserCredentials::new("root", "r00tme");
    let grafana_user = UserCredentials::new("grafana", "grafanapass");

    let options = InfluxdbGrafanaOptions {
        influxdb_rootpass: influxdb_root.password.clone(),
        influxdb_user: influxdb_user.clone(),
        grafana_user: grafana_user.clone(),
        mysql: MysqlOptions {
            mode: MysqlMode::Local,
            dbname: "grafanalma".to_string(),
            user: UserCredentials::new("grafanalma", "mysqlpass"),
        },
    };

    // The toolchain deployment activates the plugin with its defaults.
    let plugin = PluginSettings::resolve(NAME, plugin_path, |_| (options.clone(), options));

    InfluxdbGrafanaSettings {
        plugin,
        influxdb_db_name: INFLUXDB_DB_NAME.to_string(),
        influxdb_user,
        influxdb_root,
        grafana_user,
        influxdb_port: INFLUXDB_PORT,
        grafana_port: None,
    }
}
