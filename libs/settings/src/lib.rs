//! # stacklight-settings
//!
//! Static settings of the StackLight toolchain plugins under test.
//!
//! Settings are resolved once from a plugin's package path. The package
//! version decides the deployment topology ([`VersionClass`]) and which
//! activation options exist: `0.x` plugins expose options that later
//! releases removed, so each plugin models its option set as a typed value
//! per version line instead of a mapping with conditional keys.

pub mod config;
pub mod influxdb_grafana;
pub mod lma_collector;
mod plugin;
mod version;

pub use config::SuiteConfig;
pub use influxdb_grafana::{InfluxdbGrafanaSettings, UserCredentials};
pub use plugin::{OptionMap, PluginOptions, PluginSettings};
pub use version::{
    classify, plugin_version_from_path, PluginVersion, VersionClass, LEGACY_MAJOR_PREFIX,
};
