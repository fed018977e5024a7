//! `spell` command: checks one word with a plugin.

use super::common;
use crate::cli::{ExitCode, OutputFormat, RequestArgs};
use crate::formatters::format_output;
use anyhow::Result;
use nlp_plugin_core::{HostConfig, NlpProvider, SpellingProvider, SpellingResult, Subtype};
use serde::Serialize;

/// Spelling verdict for one word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpellReport {
    /// Plugin that answered
    pub plugin: String,
    /// Checked word
    pub word: String,
    /// Provider verdict
    pub result: SpellingResult,
}

/// Runs the command.
pub async fn run(
    config: &HostConfig,
    plugin_id: &str,
    word: String,
    before: &[String],
    after: &[String],
    request: &RequestArgs,
    format: OutputFormat,
) -> Result<ExitCode> {
    let catalog = common::index(config)?;
    let Some(plugin) = catalog.find_by_capability(plugin_id) else {
        tracing::error!(plugin = plugin_id, "no valid plugin with this id");
        return Ok(ExitCode::PLUGIN_NOT_FOUND);
    };
    let Some(provider) = common::connect(&plugin, config).await else {
        return Ok(ExitCode::BIND_FAILED);
    };

    provider
        .preload(&Subtype::new(request.subtype_id, request.locale.clone()))
        .await;
    let result = provider
        .spell(request.subtype_id, &word, before, after, request.flags())
        .await;
    provider.destroy().await;

    let report = SpellReport {
        plugin: plugin_id.to_string(),
        word,
        result,
    };
    println!("{}", format_output(&report, format)?);
    Ok(ExitCode::SUCCESS)
}
