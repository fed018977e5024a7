//! Host facade talking to an in-process plugin service.

use nlp_plugin_bridge::{ConnectionState, LocalBinder, RemoteProvider};
use nlp_plugin_core::{
    ComponentIdentity, EditorContent, FallbackProvider, HostConfig, NlpProvider, SpellingProvider,
    Subtype, SuggestionCandidate, SuggestionProvider, SuggestionRequestFlags,
};
use nlp_plugin_service::{PluginService, ProviderHandlers, WordListProvider};
use std::sync::Arc;
use std::time::Duration;

fn component() -> ComponentIdentity {
    ComponentIdentity::new("org.example.demo", "DemoService")
}

async fn bound_provider(binder: &Arc<LocalBinder>) -> RemoteProvider {
    let provider = RemoteProvider::new(component(), binder.clone(), &HostConfig::default());
    provider.create().await;
    let mut states = provider.connection().watch_state();
    tokio::time::timeout(
        Duration::from_secs(1),
        states.wait_for(|s| *s == ConnectionState::Bound),
    )
    .await
    .expect("provider did not bind")
    .unwrap();
    provider
}

#[tokio::test]
async fn test_word_list_round_trips() {
    let binder = Arc::new(LocalBinder::new());
    let service = PluginService::start(ProviderHandlers::full(Arc::new(WordListProvider::new([
        "hello", "help", "world",
    ]))));
    binder.register(component(), service.clone());

    let provider = bound_provider(&binder).await;
    let flags = SuggestionRequestFlags::default();

    provider.preload(&Subtype::new(1, "en-US")).await;

    let result = provider.spell(1, "helo", &[], &[], flags).await;
    assert!(result.looks_like_typo);
    assert_eq!(result.suggestions, vec!["hello".to_string(), "help".to_string()]);

    let candidates = provider.suggest(1, &EditorContent::word("wor"), flags).await;
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].text, "world");

    assert!(
        provider
            .remove_suggestion(1, &SuggestionCandidate::word("world", 0.5))
            .await
    );
    assert!(provider.suggest(1, &EditorContent::word("wor"), flags).await.is_empty());

    assert_eq!(
        service.consumer().map(|c| c.package_name),
        Some(HostConfig::default().consumer.package_name)
    );
    assert_eq!(binder.live_bindings(&component()), 1);

    provider.destroy().await;
    assert_eq!(binder.live_bindings(&component()), 0);
    assert_eq!(service.active_bindings(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_capability_times_out_to_empty() {
    let binder = Arc::new(LocalBinder::new());
    let spelling_only = Arc::new(FallbackProvider);
    let service = PluginService::start(
        ProviderHandlers::new(spelling_only.clone()).with_spelling(spelling_only),
    );
    binder.register(component(), service);

    let provider = bound_provider(&binder).await;
    let started = tokio::time::Instant::now();
    let candidates = provider
        .suggest(0, &EditorContent::word("hel"), SuggestionRequestFlags::default())
        .await;

    assert!(candidates.is_empty());
    assert!(started.elapsed() >= Duration::from_secs(5));
}

#[tokio::test]
async fn test_killed_binding_reconnects() {
    let binder = Arc::new(LocalBinder::new());
    let service = PluginService::start(ProviderHandlers::full(Arc::new(WordListProvider::builtin())));
    binder.register(component(), service);

    let provider = bound_provider(&binder).await;
    let mut states = provider.connection().watch_state();
    states.borrow_and_update();
    assert_eq!(binder.kill(&component()), 1);

    // The rebind happens without caller involvement.
    tokio::time::timeout(Duration::from_secs(1), async {
        states.changed().await.unwrap();
        states.wait_for(|s| *s == ConnectionState::Bound).await.unwrap();
    })
    .await
    .expect("provider did not rebind");

    let result = provider
        .spell(0, "hello", &[], &[], SuggestionRequestFlags::default())
        .await;
    assert!(result.is_in_dictionary);
    assert_eq!(binder.live_bindings(&component()), 1);
}

#[tokio::test]
async fn test_unidentified_consumer_is_refused() {
    let binder = Arc::new(LocalBinder::new());
    let service = PluginService::start(ProviderHandlers::full(Arc::new(FallbackProvider)));
    binder.register(component(), service);

    let mut config = HostConfig::default();
    config.consumer.package_name = String::new();
    let provider = RemoteProvider::new(component(), binder.clone(), &config);
    provider.create().await;

    let mut states = provider.connection().watch_state();
    tokio::time::timeout(
        Duration::from_secs(1),
        states.wait_for(|s| *s == ConnectionState::Unbound),
    )
    .await
    .expect("refusal was not observed")
    .unwrap();
    assert_eq!(binder.live_bindings(&component()), 0);
}
