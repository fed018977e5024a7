//! Routes consumer requests to a provider's capabilities.

use nlp_plugin_bridge::MessageSender;
use nlp_plugin_core::message::encode_payload;
use nlp_plugin_core::{
    Action, CandidateFeedback, Message, NlpProvider, SpellingProvider, Subtype,
    SuggestionProvider, SuggestionRequest,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// Capability table of one provider.
///
/// Requests for a capability the table lacks are dropped without a reply.
///
/// # Examples
///
/// ```
/// use nlp_plugin_core::FallbackProvider;
/// use nlp_plugin_service::ProviderHandlers;
/// use std::sync::Arc;
///
/// let provider = Arc::new(FallbackProvider);
/// let spelling_only = ProviderHandlers::new(provider.clone()).with_spelling(provider);
/// assert!(spelling_only.supports_spelling());
/// assert!(!spelling_only.supports_suggestion());
/// ```
#[derive(Clone)]
pub struct ProviderHandlers {
    base: Arc<dyn NlpProvider>,
    spelling: Option<Arc<dyn SpellingProvider>>,
    suggestion: Option<Arc<dyn SuggestionProvider>>,
}

impl fmt::Debug for ProviderHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandlers")
            .field("base", &self.base)
            .field("spelling", &self.spelling.is_some())
            .field("suggestion", &self.suggestion.is_some())
            .finish()
    }
}

impl ProviderHandlers {
    /// Creates a table with lifecycle handling only.
    #[must_use]
    pub fn new(base: Arc<dyn NlpProvider>) -> Self {
        Self {
            base,
            spelling: None,
            suggestion: None,
        }
    }

    /// Adds the spelling capability.
    #[must_use]
    pub fn with_spelling(mut self, provider: Arc<dyn SpellingProvider>) -> Self {
        self.spelling = Some(provider);
        self
    }

    /// Adds the suggestion capability.
    #[must_use]
    pub fn with_suggestion(mut self, provider: Arc<dyn SuggestionProvider>) -> Self {
        self.suggestion = Some(provider);
        self
    }

    /// Creates a table where `provider` handles everything.
    #[must_use]
    pub fn full<P>(provider: Arc<P>) -> Self
    where
        P: SpellingProvider + SuggestionProvider + 'static,
    {
        Self {
            base: provider.clone(),
            spelling: Some(provider.clone()),
            suggestion: Some(provider),
        }
    }

    /// Lifecycle handler.
    #[must_use]
    pub fn base(&self) -> &Arc<dyn NlpProvider> {
        &self.base
    }

    /// Returns `true` if spell requests are handled.
    #[must_use]
    pub const fn supports_spelling(&self) -> bool {
        self.spelling.is_some()
    }

    /// Returns `true` if suggestion requests are handled.
    #[must_use]
    pub const fn supports_suggestion(&self) -> bool {
        self.suggestion.is_some()
    }
}

/// What the dispatcher did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A reply was sent
    Replied,
    /// The request was handled; the action has no reply
    Handled,
    /// The message was dropped without looking at its payload
    Ignored,
    /// The payload could not be decoded or the reply could not be encoded
    Rejected,
}

/// Decodes consumer requests and invokes the provider.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    handlers: ProviderHandlers,
}

impl Dispatcher {
    /// Creates a dispatcher over `handlers`.
    #[must_use]
    pub const fn new(handlers: ProviderHandlers) -> Self {
        Self { handlers }
    }

    /// Capability table.
    #[must_use]
    pub const fn handlers(&self) -> &ProviderHandlers {
        &self.handlers
    }

    /// Handles one inbound message, replying on `reply_to` when the action calls for it.
    ///
    /// Messages other than consumer requests are ignored, as are requests
    /// for capabilities the provider lacks.
    pub async fn handle_message(&self, message: Message, reply_to: &MessageSender) -> DispatchOutcome {
        if !message.is_consumer_request() {
            tracing::debug!(header = ?message.header, id = message.id, "ignoring non-request message");
            return DispatchOutcome::Ignored;
        }
        let action = message.header.action;
        tracing::debug!(%action, id = message.id, "dispatching request");

        match action {
            Action::Preload => {
                let Some(subtype) = decode::<Subtype>(&message) else {
                    return DispatchOutcome::Rejected;
                };
                self.handlers.base.preload(&subtype).await;
                DispatchOutcome::Handled
            }
            Action::Spell => {
                let Some(spelling) = &self.handlers.spelling else {
                    return unsupported(action);
                };
                let Some(request) = decode::<SuggestionRequest>(&message) else {
                    return DispatchOutcome::Rejected;
                };
                let result = spelling
                    .spell(
                        request.subtype_id,
                        &request.word,
                        &request.preceding_words,
                        &request.following_words,
                        request.flags,
                    )
                    .await;
                reply(&message, &result, reply_to)
            }
            Action::Suggest => {
                let Some(suggestion) = &self.handlers.suggestion else {
                    return unsupported(action);
                };
                let Some(request) = decode::<SuggestionRequest>(&message) else {
                    return DispatchOutcome::Rejected;
                };
                let mut candidates = suggestion
                    .suggest(request.subtype_id, &request.content(), request.flags)
                    .await;
                candidates.truncate(usize::from(request.flags.max_suggestion_count));
                reply(&message, &candidates, reply_to)
            }
            Action::NotifySuggestionAccepted | Action::NotifySuggestionReverted => {
                let Some(suggestion) = &self.handlers.suggestion else {
                    return unsupported(action);
                };
                let Some(feedback) = decode::<CandidateFeedback>(&message) else {
                    return DispatchOutcome::Rejected;
                };
                if action == Action::NotifySuggestionAccepted {
                    suggestion
                        .notify_suggestion_accepted(feedback.subtype_id, &feedback.candidate)
                        .await;
                } else {
                    suggestion
                        .notify_suggestion_reverted(feedback.subtype_id, &feedback.candidate)
                        .await;
                }
                DispatchOutcome::Handled
            }
            Action::RemoveSuggestion => {
                let Some(suggestion) = &self.handlers.suggestion else {
                    return unsupported(action);
                };
                let Some(feedback) = decode::<CandidateFeedback>(&message) else {
                    return DispatchOutcome::Rejected;
                };
                let removed = suggestion
                    .remove_suggestion(feedback.subtype_id, &feedback.candidate)
                    .await;
                reply(&message, &removed, reply_to)
            }
        }
    }
}

fn unsupported(action: Action) -> DispatchOutcome {
    tracing::debug!(%action, "provider lacks the capability, dropping request");
    DispatchOutcome::Ignored
}

fn decode<T: DeserializeOwned>(message: &Message) -> Option<T> {
    match message.decode_payload() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(
                action = %message.header.action,
                id = message.id,
                error = %e,
                "dropping request with undecodable payload"
            );
            None
        }
    }
}

fn reply<T: Serialize>(request: &Message, value: &T, reply_to: &MessageSender) -> DispatchOutcome {
    let data = match encode_payload(value) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(action = %request.header.action, id = request.id, error = %e, "failed to encode reply");
            return DispatchOutcome::Rejected;
        }
    };
    let reply = Message::reply_to_consumer(request.header.action, request.id, Some(data));
    if reply_to.send(reply).is_err() {
        tracing::debug!(id = request.id, "consumer went away before the reply");
    }
    DispatchOutcome::Replied
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlp_plugin_core::{
        EditorContent, FallbackProvider, SpellingResult, SuggestionCandidate, SuggestionRequestFlags,
    };
    use tokio::sync::mpsc;

    fn spell_request(id: i32, data: Option<&str>) -> Message {
        Message::request_to_service(Action::Spell, id, data.map(str::to_string))
    }

    fn spell_payload() -> String {
        let request = SuggestionRequest::from_content(
            0,
            &EditorContent::word("helo"),
            SuggestionRequestFlags::default(),
        );
        encode_payload(&request).unwrap()
    }

    #[tokio::test]
    async fn test_spell_replies_with_matching_id() {
        let dispatcher = Dispatcher::new(ProviderHandlers::full(Arc::new(FallbackProvider)));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = dispatcher
            .handle_message(spell_request(7, Some(&spell_payload())), &tx)
            .await;

        assert_eq!(outcome, DispatchOutcome::Replied);
        let reply = rx.try_recv().unwrap();
        assert!(reply.is_service_response());
        assert_eq!(reply.id, 7);
        assert_eq!(reply.header.action, Action::Spell);
        assert_eq!(reply.decode_payload::<SpellingResult>().unwrap(), SpellingResult::unspecified());
    }

    #[tokio::test]
    async fn test_non_requests_are_ignored() {
        let dispatcher = Dispatcher::new(ProviderHandlers::full(Arc::new(FallbackProvider)));
        let (tx, mut rx) = mpsc::unbounded_channel();

        for message in [
            Message::reply_to_consumer(Action::Spell, 1, Some(spell_payload())),
            Message::request_to_consumer(Action::Spell, 2, Some(spell_payload())),
            Message::reply_to_service(Action::Spell, 3, Some(spell_payload())),
        ] {
            assert_eq!(dispatcher.handle_message(message, &tx).await, DispatchOutcome::Ignored);
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_capability_drops_silently() {
        let provider = Arc::new(FallbackProvider);
        let dispatcher = Dispatcher::new(ProviderHandlers::new(provider.clone()).with_spelling(provider));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let request = Message::request_to_service(Action::Suggest, 4, Some(spell_payload()));
        assert_eq!(dispatcher.handle_message(request, &tx).await, DispatchOutcome::Ignored);

        let feedback = CandidateFeedback {
            subtype_id: 0,
            candidate: SuggestionCandidate::word("hello", 0.5),
        };
        let request = Message::request_to_service(
            Action::RemoveSuggestion,
            5,
            Some(encode_payload(&feedback).unwrap()),
        );
        assert_eq!(dispatcher.handle_message(request, &tx).await, DispatchOutcome::Ignored);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_bad_payloads_are_rejected() {
        let dispatcher = Dispatcher::new(ProviderHandlers::full(Arc::new(FallbackProvider)));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let preload = Message::request_to_service(Action::Preload, 1, Some("{\"id\":".into()));
        assert_eq!(dispatcher.handle_message(preload, &tx).await, DispatchOutcome::Rejected);
        assert_eq!(
            dispatcher.handle_message(spell_request(2, None), &tx).await,
            DispatchOutcome::Rejected
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_preload_is_handled_without_reply() {
        let dispatcher = Dispatcher::new(ProviderHandlers::full(Arc::new(FallbackProvider)));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subtype = encode_payload(&Subtype::new(1, "en-US")).unwrap();

        let outcome = dispatcher
            .handle_message(Message::request_to_service(Action::Preload, 1, Some(subtype)), &tx)
            .await;
        assert_eq!(outcome, DispatchOutcome::Handled);
        assert!(rx.try_recv().is_err());
    }
}
