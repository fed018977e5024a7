//! Provider contracts implemented over a [`PluginConnection`].

use crate::connection::{ConnectionStats, ConnectionState, PluginConnection};
use crate::transport::ServiceBinder;
use async_trait::async_trait;
use nlp_plugin_core::message::encode_payload;
use nlp_plugin_core::{
    Action, CandidateFeedback, ComponentIdentity, EditorContent, Error, HostConfig, Message,
    NlpProvider, Result, SpellingProvider, SpellingResult, Subtype, SuggestionCandidate,
    SuggestionProvider, SuggestionRequest, SuggestionRequestFlags,
};
use nlp_plugin_index::IndexedPlugin;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

/// A plugin seen through the spelling and suggestion contracts.
///
/// Every call is a message round trip to the provider. Slow, broken or
/// absent providers never surface as errors: awaited calls fall back to
/// neutral answers once the request timeout expires.
///
/// # Examples
///
/// ```no_run
/// use nlp_plugin_bridge::{LocalBinder, RemoteProvider};
/// use nlp_plugin_core::{ComponentIdentity, HostConfig, NlpProvider, SpellingProvider};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let binder = Arc::new(LocalBinder::new());
/// let provider = RemoteProvider::new(
///     ComponentIdentity::new("org.example", "Spell"),
///     binder,
///     &HostConfig::default(),
/// );
/// provider.create().await;
/// let result = provider.spell(0, "helo", &[], &[], Default::default()).await;
/// println!("{result:?}");
/// provider.destroy().await;
/// # }
/// ```
#[derive(Debug)]
pub struct RemoteProvider {
    connection: PluginConnection,
    next_id: AtomicI32,
    request_timeout: Duration,
}

impl RemoteProvider {
    /// Creates an unbound facade for `component`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new(
        component: ComponentIdentity,
        binder: Arc<dyn ServiceBinder>,
        config: &HostConfig,
    ) -> Self {
        Self {
            connection: PluginConnection::with_config(component, binder, config),
            next_id: AtomicI32::new(1),
            request_timeout: config.request_timeout,
        }
    }

    /// Creates a facade for a catalog entry. Returns `None` for invalid entries.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn for_plugin(
        plugin: &IndexedPlugin,
        binder: Arc<dyn ServiceBinder>,
        config: &HostConfig,
    ) -> Option<Self> {
        plugin
            .is_valid()
            .then(|| Self::new(plugin.identity().clone(), binder, config))
    }

    /// Component behind this facade.
    #[must_use]
    pub fn component(&self) -> &ComponentIdentity {
        self.connection.component()
    }

    /// Binding state of the underlying connection.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Traffic counters of the underlying connection.
    #[must_use]
    pub fn stats(&self) -> ConnectionStats {
        self.connection.stats()
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &PluginConnection {
        &self.connection
    }

    /// Per-request deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn next_correlation_id(&self) -> i32 {
        // Ids stay non-negative across wrap-around.
        self.next_id.fetch_add(1, Ordering::Relaxed) & i32::MAX
    }

    fn notify<P: Serialize>(&self, action: Action, payload: &P) {
        match encode_payload(payload) {
            Ok(data) => {
                let id = self.next_correlation_id();
                self.connection
                    .send(Message::request_to_service(action, id, Some(data)));
            }
            Err(e) => tracing::error!(component = %self.component(), %action, error = %e, "failed to encode request"),
        }
    }

    async fn request<P: Serialize + Sync, R: DeserializeOwned + Send>(&self, action: Action, payload: &P) -> Result<R> {
        let data = encode_payload(payload)?;
        let id = self.next_correlation_id();
        let reply = self
            .connection
            .send_and_await(
                Message::request_to_service(action, id, Some(data)),
                self.request_timeout,
            )
            .await?;
        reply.decode_payload().map_err(|e| Error::MalformedReply {
            correlation_id: id,
            reason: e.to_string(),
        })
    }

    fn degrade<R>(&self, action: Action, result: Result<R>, fallback: impl FnOnce() -> R) -> R {
        result.unwrap_or_else(|e| {
            if e.is_timeout() {
                tracing::warn!(component = %self.component(), %action, error = %e, "provider did not answer");
            } else {
                tracing::warn!(component = %self.component(), %action, error = %e, "provider answer unusable");
            }
            fallback()
        })
    }
}

#[async_trait]
impl NlpProvider for RemoteProvider {
    async fn create(&self) {
        if let Err(e) = self.connection.bind() {
            tracing::error!(component = %self.component(), error = %e, "failed to bind provider");
        }
    }

    async fn preload(&self, subtype: &Subtype) {
        self.notify(Action::Preload, subtype);
    }

    async fn destroy(&self) {
        self.connection.unbind();
    }
}

#[async_trait]
impl SpellingProvider for RemoteProvider {
    async fn spell(
        &self,
        subtype_id: i64,
        word: &str,
        preceding_words: &[String],
        following_words: &[String],
        flags: SuggestionRequestFlags,
    ) -> SpellingResult {
        let request = SuggestionRequest {
            subtype_id,
            word: word.to_string(),
            preceding_words: preceding_words.to_vec(),
            following_words: following_words.to_vec(),
            flags,
        };
        let result = self.request(Action::Spell, &request).await;
        self.degrade(Action::Spell, result, SpellingResult::unspecified)
    }
}

#[async_trait]
impl SuggestionProvider for RemoteProvider {
    async fn suggest(
        &self,
        subtype_id: i64,
        content: &EditorContent,
        flags: SuggestionRequestFlags,
    ) -> Vec<SuggestionCandidate> {
        let request = SuggestionRequest::from_content(subtype_id, content, flags);
        let result: Result<Vec<SuggestionCandidate>> = self.request(Action::Suggest, &request).await;
        let mut candidates = self.degrade(Action::Suggest, result, Vec::new);
        candidates.truncate(usize::from(flags.max_suggestion_count));
        candidates
    }

    async fn notify_suggestion_accepted(&self, subtype_id: i64, candidate: &SuggestionCandidate) {
        let feedback = CandidateFeedback {
            subtype_id,
            candidate: candidate.clone(),
        };
        self.notify(Action::NotifySuggestionAccepted, &feedback);
    }

    async fn notify_suggestion_reverted(&self, subtype_id: i64, candidate: &SuggestionCandidate) {
        let feedback = CandidateFeedback {
            subtype_id,
            candidate: candidate.clone(),
        };
        self.notify(Action::NotifySuggestionReverted, &feedback);
    }

    async fn remove_suggestion(&self, subtype_id: i64, candidate: &SuggestionCandidate) -> bool {
        let feedback = CandidateFeedback {
            subtype_id,
            candidate: candidate.clone(),
        };
        let result = self.request(Action::RemoveSuggestion, &feedback).await;
        self.degrade(Action::RemoveSuggestion, result, || false)
    }
}
