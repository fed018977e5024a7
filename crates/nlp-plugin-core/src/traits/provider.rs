//! Lifecycle and capability traits.

use crate::{EditorContent, SpellingResult, Subtype, SuggestionCandidate, SuggestionRequestFlags};
use async_trait::async_trait;
use std::fmt::Debug;

/// Lifecycle shared by every provider.
///
/// All methods are infallible: a provider that cannot do its work logs the
/// problem and degrades to neutral answers.
#[async_trait]
pub trait NlpProvider: Send + Sync + Debug {
    /// Called once before the first request.
    async fn create(&self);

    /// Prepares resources for `subtype` ahead of use.
    async fn preload(&self, subtype: &Subtype);

    /// Releases all resources. No requests follow.
    async fn destroy(&self);
}

/// Spell-checking capability.
#[async_trait]
pub trait SpellingProvider: NlpProvider {
    /// Checks `word` in the context of its neighbours.
    async fn spell(
        &self,
        subtype_id: i64,
        word: &str,
        preceding_words: &[String],
        following_words: &[String],
        flags: SuggestionRequestFlags,
    ) -> SpellingResult;
}

/// Word suggestion capability.
#[async_trait]
pub trait SuggestionProvider: NlpProvider {
    /// Produces candidates for the word being composed.
    ///
    /// At most `flags.max_suggestion_count` candidates are returned.
    async fn suggest(
        &self,
        subtype_id: i64,
        content: &EditorContent,
        flags: SuggestionRequestFlags,
    ) -> Vec<SuggestionCandidate>;

    /// The user committed `candidate`.
    async fn notify_suggestion_accepted(&self, subtype_id: i64, candidate: &SuggestionCandidate);

    /// The user undid an automatic commit of `candidate`.
    async fn notify_suggestion_reverted(&self, subtype_id: i64, candidate: &SuggestionCandidate);

    /// Asks the provider to stop offering `candidate`.
    ///
    /// Returns `true` if the candidate was removed.
    async fn remove_suggestion(&self, subtype_id: i64, candidate: &SuggestionCandidate) -> bool;
}
