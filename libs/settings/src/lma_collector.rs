//! Settings of the LMA collector plugin.
//!
//! The collector runs on every node, so it has no role name. Only `0.x`
//! releases expose the `alerting_mode` option; the option sets are modelled as
//! one variant per major line so the key cannot leak into newer deployments.

use std::path::Path;

use serde::Serialize;

use crate::plugin::{put, OptionMap, PluginOptions, PluginSettings};
use crate::version::VersionClass;

pub const NAME: &str = "lma_collector";

pub const ENVIRONMENT_LABEL: &str = "deploy_lma_toolchain";

/// Where a backend lives relative to the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendMode {
    Local,
    Remote,
}

impl BackendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Options shared by all collector versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommonOptions {
    pub environment_label: String,
    pub elasticsearch_mode: BackendMode,
    pub influxdb_mode: BackendMode,
    /// Addresses are only meaningful for remote backends.
    pub elasticsearch_address: Option<String>,
    pub influxdb_address: Option<String>,
}

impl CommonOptions {
    /// Backends reached at fixed remote addresses.
    pub fn remote(address: &str) -> Self {
        Self {
            environment_label: ENVIRONMENT_LABEL.to_string(),
            elasticsearch_mode: BackendMode::Remote,
            influxdb_mode: BackendMode::Remote,
            elasticsearch_address: Some(address.to_string()),
            influxdb_address: Some(address.to_string()),
        }
    }

    /// Backends deployed by the toolchain plugins in the same environment.
    pub fn local() -> Self {
        Self {
            environment_label: ENVIRONMENT_LABEL.to_string(),
            elasticsearch_mode: BackendMode::Local,
            influxdb_mode: BackendMode::Local,
            elasticsearch_address: None,
            influxdb_address: None,
        }
    }

    fn write(&self, map: &mut OptionMap) {
        put(map, "environment_label", &self.environment_label);
        put(map, "elasticsearch_mode", self.elasticsearch_mode.as_str());
        put(map, "influxdb_mode", self.influxdb_mode.as_str());
        if let Some(address) = &self.elasticsearch_address {
            put(map, "elasticsearch_address", address);
        }
        if let Some(address) = &self.influxdb_address {
            put(map, "influxdb_address", address);
        }
    }
}

/// Collector option set, one variant per major version line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "line", rename_all = "snake_case")]
pub enum CollectorOptions {
    Legacy {
        common: CommonOptions,
        alerting_mode: BackendMode,
    },
    Current {
        common: CommonOptions,
    },
}

impl CollectorOptions {
    fn for_class(class: VersionClass, common: CommonOptions) -> Self {
        match class {
            VersionClass::Legacy => Self::Legacy {
                common,
                alerting_mode: BackendMode::Local,
            },
            VersionClass::Current => Self::Current { common },
        }
    }

    pub fn common(&self) -> &CommonOptions {
        match self {
            Self::Legacy { common, .. } | Self::Current { common } => common,
        }
    }
}

impl PluginOptions for CollectorOptions {
    fn to_option_map(&self) -> OptionMap {
        let mut map = OptionMap::new();
        self.common().write(&mut map);
        if let Self::Legacy { alerting_mode, .. } = self {
            put(&mut map, "alerting_mode", alerting_mode.as_str());
        }
        map
    }
}

pub type LmaCollectorSettings = PluginSettings<CollectorOptions>;

/// Resolve collector settings from its package path.
pub fn settings(plugin_path: &Path) -> LmaCollectorSettings {
    PluginSettings::resolve(NAME, plugin_path, |class| {
        (
            CollectorOptions::for_class(class, CommonOptions::remote("127.0.0.1")),
            CollectorOptions::for_class(class, CommonOptions::local()),
        )
    })
}
