//! Tests to verify that shared types are Send + Sync.

use nlp_plugin_core::traits::{FallbackProvider, NlpProvider, SpellingProvider, SuggestionProvider};
use nlp_plugin_core::*;
use std::sync::Arc;

const fn assert_send_sync<T: Send + Sync + ?Sized>() {}

#[test]
fn test_domain_types_are_send_sync() {
    assert_send_sync::<PluginId>();
    assert_send_sync::<ComponentIdentity>();
    assert_send_sync::<ConsumerInfo>();
    assert_send_sync::<BindExtras>();
}

#[test]
fn test_envelope_types_are_send_sync() {
    assert_send_sync::<Message>();
    assert_send_sync::<Frame>();
    assert_send_sync::<MessageHeader>();
}

#[test]
fn test_payload_types_are_send_sync() {
    assert_send_sync::<SuggestionRequest>();
    assert_send_sync::<SpellingResult>();
    assert_send_sync::<SuggestionCandidate>();
    assert_send_sync::<CandidateFeedback>();
}

#[test]
fn test_config_and_error_are_send_sync() {
    assert_send_sync::<HostConfig>();
    assert_send_sync::<Error>();
}

#[test]
fn test_provider_trait_objects_are_send_sync() {
    assert_send_sync::<dyn NlpProvider>();
    assert_send_sync::<dyn SpellingProvider>();
    assert_send_sync::<dyn SuggestionProvider>();

    let provider: Arc<dyn SuggestionProvider> = Arc::new(FallbackProvider);
    let handle = std::thread::spawn(move || format!("{provider:?}"));
    assert_eq!(handle.join().unwrap(), "FallbackProvider");
}
