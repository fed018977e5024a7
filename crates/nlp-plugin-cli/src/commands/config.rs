//! `config` command: shows the effective host configuration.
//!
//! Configuration is read from TOML at:
//! - Linux: `~/.config/nlp-plugin/config.toml`
//! - macOS: `~/Library/Application Support/nlp-plugin/config.toml`
//! - Windows: `%APPDATA%\nlp-plugin\config.toml`

use super::common;
use crate::actions::ConfigAction;
use crate::cli::{ExitCode, OutputFormat};
use crate::formatters::format_output;
use anyhow::{Context, Result};
use nlp_plugin_core::{ConsumerInfo, HostConfig};
use serde::Serialize;
use std::path::Path;

/// Effective configuration, durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigReport {
    /// File the configuration was read from
    pub path: Option<String>,
    /// Whether that file exists
    pub file_exists: bool,
    /// Reply deadline
    pub request_timeout_ms: u64,
    /// Staged messages per connection
    pub replay_capacity: usize,
    /// Scanned package directory
    pub registry_dir: String,
    /// Package directory poll interval
    pub rescan_interval_ms: u64,
    /// Whether plugins from other packages are indexed
    pub allow_external_plugins: bool,
    /// Identity sent to providers
    pub consumer: ConsumerInfo,
}

impl ConfigReport {
    /// Describes `config` as loaded from `path`.
    #[must_use]
    pub fn new(config: &HostConfig, path: Option<&Path>) -> Self {
        Self {
            path: path.map(|p| p.display().to_string()),
            file_exists: path.is_some_and(Path::exists),
            request_timeout_ms: millis(config.request_timeout),
            replay_capacity: config.replay_capacity,
            registry_dir: config.registry_dir.display().to_string(),
            rescan_interval_ms: millis(config.rescan_interval),
            allow_external_plugins: config.allow_external_plugins,
            consumer: config.consumer.clone(),
        }
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Runs the command.
pub fn run(
    action: ConfigAction,
    config: &HostConfig,
    explicit: Option<&Path>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let path = common::config_path(explicit);
    match action {
        ConfigAction::Path => {
            let Some(path) = path else {
                tracing::error!("platform has no configuration directory");
                return Ok(ExitCode::ERROR);
            };
            println!("{}", path.display());
        }
        ConfigAction::Show => {
            let report = ConfigReport::new(config, path.as_deref());
            let output = if format == OutputFormat::Text {
                toml::to_string_pretty(&report).context("failed to render configuration")?
            } else {
                format_output(&report, format)?
            };
            println!("{}", output.trim_end());
        }
    }
    Ok(ExitCode::SUCCESS)
}
