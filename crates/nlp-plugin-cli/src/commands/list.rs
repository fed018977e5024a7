//! `list` command: every indexed plugin with its validation state.

use super::common::{self, PluginSummary};
use crate::cli::{ExitCode, OutputFormat};
use crate::formatters::format_output;
use anyhow::Result;
use nlp_plugin_core::HostConfig;
use nlp_plugin_index::PluginCatalog;
use serde::Serialize;

/// Catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListReport {
    /// Scanned package directory
    pub registry: String,
    /// Number of usable plugins
    pub valid: usize,
    /// Listed entries
    pub plugins: Vec<PluginSummary>,
}

/// Builds the listing for `catalog`.
#[must_use]
pub fn collect(config: &HostConfig, catalog: &PluginCatalog, valid_only: bool) -> ListReport {
    let plugins = catalog
        .plugins()
        .iter()
        .filter(|plugin| !valid_only || plugin.is_valid())
        .map(|plugin| PluginSummary::from(plugin.as_ref()))
        .collect();
    ListReport {
        registry: config.registry_dir.display().to_string(),
        valid: catalog.valid().count(),
        plugins,
    }
}

/// Runs the command.
pub fn run(config: &HostConfig, valid_only: bool, format: OutputFormat) -> Result<ExitCode> {
    let catalog = common::index(config)?;
    let report = collect(config, &catalog, valid_only);
    tracing::info!(total = catalog.len(), valid = report.valid, "catalog indexed");
    println!("{}", format_output(&report, format)?);
    Ok(ExitCode::SUCCESS)
}
