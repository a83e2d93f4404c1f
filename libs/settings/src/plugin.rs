//! Generic resolved plugin settings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::version::{classify, plugin_version_from_path, PluginVersion, VersionClass};

/// Option mapping passed to plugin activation (`"<key>/value" -> value`).
pub type OptionMap = BTreeMap<String, String>;

/// A typed set of plugin activation options.
pub trait PluginOptions {
    /// Render the options as the flat mapping the deployment framework expects.
    fn to_option_map(&self) -> OptionMap;
}

/// Settings of an installed plugin, resolved once from its package path.
#[derive(Debug, Clone, Serialize)]
pub struct PluginSettings<O> {
    pub name: &'static str,
    pub plugin_path: PathBuf,
    pub version: Option<PluginVersion>,
    pub default_options: O,
    pub toolchain_options: O,
}

impl<O: PluginOptions> PluginSettings<O> {
    /// Resolve settings for `name` from its package path. The option sets are
    /// built by `build` from the version class of the package.
    pub fn resolve<F>(name: &'static str, plugin_path: &Path, build: F) -> Self
    where
        F: FnOnce(VersionClass) -> (O, O),
    {
        let version = plugin_version_from_path(plugin_path);
        let class = classify(version.as_ref());
        tracing::debug!(
            plugin = name,
            path = %plugin_path.display(),
            version = ?version,
            class = ?class,
            "resolved plugin settings"
        );
        let (default_options, toolchain_options) = build(class);

        Self {
            name,
            plugin_path: plugin_path.to_path_buf(),
            version,
            default_options,
            toolchain_options,
        }
    }

    pub fn version_class(&self) -> VersionClass {
        classify(self.version.as_ref())
    }

    pub fn is_legacy(&self) -> bool {
        self.version_class().is_legacy()
    }

    /// Version string as reported to the deployment framework; empty when the
    /// package carries no version.
    pub fn version_str(&self) -> &str {
        self.version.as_ref().map(PluginVersion::as_str).unwrap_or("")
    }

    pub fn default_option_map(&self) -> OptionMap {
        self.default_options.to_option_map()
    }

    pub fn toolchain_option_map(&self) -> OptionMap {
        self.toolchain_options.to_option_map()
    }
}

/// Insert `value` under the `<key>/value` option name.
pub(crate) fn put(map: &mut OptionMap, key: &str, value: impl Into<String>) {
    map.insert(format!("{key}/value"), value.into());
}
