//! Provider that answers every request neutrally.

use super::{NlpProvider, SpellingProvider, SuggestionProvider};
use crate::{EditorContent, SpellingResult, Subtype, SuggestionCandidate, SuggestionRequestFlags};
use async_trait::async_trait;

/// Stand-in used when no plugin is selected.
///
/// Spelling yields [`SpellingResult::unspecified`], suggestions are empty and
/// removal always fails.
///
/// # Examples
///
/// ```
/// use nlp_plugin_core::traits::{FallbackProvider, SuggestionProvider};
/// use nlp_plugin_core::{EditorContent, SuggestionRequestFlags};
///
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// let candidates = rt.block_on(FallbackProvider.suggest(
///     0,
///     &EditorContent::word("hel"),
///     SuggestionRequestFlags::default(),
/// ));
/// assert!(candidates.is_empty());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackProvider;

#[async_trait]
impl NlpProvider for FallbackProvider {
    async fn create(&self) {}

    async fn preload(&self, _subtype: &Subtype) {}

    async fn destroy(&self) {}
}

#[async_trait]
impl SpellingProvider for FallbackProvider {
    async fn spell(
        &self,
        _subtype_id: i64,
        _word: &str,
        _preceding_words: &[String],
        _following_words: &[String],
        _flags: SuggestionRequestFlags,
    ) -> SpellingResult {
        SpellingResult::unspecified()
    }
}

#[async_trait]
impl SuggestionProvider for FallbackProvider {
    async fn suggest(
        &self,
        _subtype_id: i64,
        _content: &EditorContent,
        _flags: SuggestionRequestFlags,
    ) -> Vec<SuggestionCandidate> {
        Vec::new()
    }

    async fn notify_suggestion_accepted(&self, _subtype_id: i64, _candidate: &SuggestionCandidate) {}

    async fn notify_suggestion_reverted(&self, _subtype_id: i64, _candidate: &SuggestionCandidate) {}

    async fn remove_suggestion(&self, _subtype_id: i64, _candidate: &SuggestionCandidate) -> bool {
        false
    }
}
