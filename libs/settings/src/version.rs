//! Plugin version discovery and classification.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Version prefix of the legacy plugin line.
pub const LEGACY_MAJOR_PREFIX: &str = "0.";

/// Dotted plugin version string, e.g. `0.9` or `1.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginVersion(String);

impl PluginVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify the version by its major prefix.
    pub fn class(&self) -> VersionClass {
        if self.0.starts_with(LEGACY_MAJOR_PREFIX) {
            VersionClass::Legacy
        } else {
            VersionClass::Current
        }
    }
}

impl fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PluginVersion {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Deployment topology implied by a plugin version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionClass {
    /// `0.x` plugins: clustered InfluxDB sharing its VIP with Grafana, and
    /// the collector still exposes `alerting_mode`.
    Legacy,

    /// `1.x` and later.
    Current,
}

impl VersionClass {
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy)
    }
}

/// Classify an optional version. A plugin that is not installed has no
/// version and is treated as current.
pub fn classify(version: Option<&PluginVersion>) -> VersionClass {
    version
        .map(PluginVersion::class)
        .unwrap_or(VersionClass::Current)
}

/// Extract the plugin version from a package path.
///
/// Packages are named `<name>-<version>-<full version>-<release>.noarch.rpm`,
/// so the version is the second dash-separated component of the file stem.
pub fn plugin_version_from_path(path: &Path) -> Option<PluginVersion> {
    let stem = path.file_stem()?.to_str()?;
    let version = stem.split('-').nth(1)?;
    if version.is_empty() {
        return None;
    }
    Some(PluginVersion::new(version))
}
