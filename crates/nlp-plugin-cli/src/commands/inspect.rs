//! `inspect` command: one plugin's descriptor with resources resolved.

use super::common::{self, PluginSummary};
use crate::cli::{ExitCode, OutputFormat};
use crate::formatters::format_output;
use anyhow::Result;
use nlp_plugin_core::{ComponentIdentity, HostConfig};
use nlp_plugin_index::{IndexedPlugin, PluginCatalog};
use serde::Serialize;
use std::sync::Arc;

/// Detailed view of one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    /// Catalog entry
    pub plugin: PluginSummary,
    /// Host route to the plugin's info screen
    pub settings_route: Option<String>,
    /// Plugin's own settings screen
    pub settings_component: Option<String>,
    /// Descriptor fields, one `key = value` per line
    pub description: Vec<String>,
}

impl From<&IndexedPlugin> for InspectReport {
    fn from(plugin: &IndexedPlugin) -> Self {
        Self {
            plugin: PluginSummary::from(plugin),
            settings_route: plugin.settings_route(),
            settings_component: plugin.settings_component().as_ref().map(ToString::to_string),
            description: plugin.describe().lines().map(str::to_string).collect(),
        }
    }
}

/// Looks up a plugin by id, or by `package/service` for invalid entries.
#[must_use]
pub fn find(catalog: &PluginCatalog, key: &str) -> Option<Arc<IndexedPlugin>> {
    catalog.find_by_capability(key).or_else(|| {
        key.parse::<ComponentIdentity>()
            .ok()
            .and_then(|component| catalog.find_by_component(&component))
    })
}

/// Runs the command.
pub fn run(config: &HostConfig, key: &str, format: OutputFormat) -> Result<ExitCode> {
    let catalog = common::index(config)?;
    let Some(plugin) = find(&catalog, key) else {
        tracing::error!(plugin = key, "no such plugin");
        return Ok(ExitCode::PLUGIN_NOT_FOUND);
    };
    println!("{}", format_output(&InspectReport::from(plugin.as_ref()), format)?);
    Ok(ExitCode::SUCCESS)
}
