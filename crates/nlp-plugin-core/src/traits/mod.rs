//! Provider contracts.
//!
//! A plugin implements [`NlpProvider`] plus any capability traits it
//! supports. The same traits are implemented on the host side by the remote
//! provider facade, so callers cannot tell a local provider from one running
//! in another process.
//!
//! # Examples
//!
//! ```
//! use async_trait::async_trait;
//! use nlp_plugin_core::traits::{NlpProvider, SpellingProvider};
//! use nlp_plugin_core::{SpellingResult, Subtype, SuggestionRequestFlags};
//!
//! #[derive(Debug)]
//! struct Yes;
//!
//! #[async_trait]
//! impl NlpProvider for Yes {
//!     async fn create(&self) {}
//!     async fn preload(&self, _subtype: &Subtype) {}
//!     async fn destroy(&self) {}
//! }
//!
//! #[async_trait]
//! impl SpellingProvider for Yes {
//!     async fn spell(
//!         &self,
//!         _subtype_id: i64,
//!         _word: &str,
//!         _preceding_words: &[String],
//!         _following_words: &[String],
//!         _flags: SuggestionRequestFlags,
//!     ) -> SpellingResult {
//!         SpellingResult::valid_word()
//!     }
//! }
//! ```

mod fallback;
mod provider;

pub use fallback::FallbackProvider;
pub use provider::{NlpProvider, SpellingProvider, SuggestionProvider};
