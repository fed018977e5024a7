//! `suggest` command: asks a plugin for completion candidates.

use super::common;
use crate::cli::{ExitCode, OutputFormat, RequestArgs};
use crate::formatters::format_output;
use anyhow::Result;
use nlp_plugin_core::{
    EditorContent, HostConfig, NlpProvider, Subtype, SuggestionCandidate, SuggestionProvider,
};
use serde::Serialize;

/// Candidates for one composed word.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestReport {
    /// Plugin that answered
    pub plugin: String,
    /// Composed word
    pub word: String,
    /// Candidates, best first
    pub candidates: Vec<SuggestionCandidate>,
}

/// Runs the command.
pub async fn run(
    config: &HostConfig,
    plugin_id: &str,
    word: String,
    before: Vec<String>,
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

    let content = EditorContent {
        current_word: word,
        preceding_words: before,
        following_words: Vec::new(),
    };
    provider
        .preload(&Subtype::new(request.subtype_id, request.locale.clone()))
        .await;
    let candidates = provider
        .suggest(request.subtype_id, &content, request.flags())
        .await;
    provider.destroy().await;

    let report = SuggestReport {
        plugin: plugin_id.to_string(),
        word: content.current_word,
        candidates,
    };
    println!("{}", format_output(&report, format)?);
    Ok(ExitCode::SUCCESS)
}
