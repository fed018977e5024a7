//! Provider executables driven through the process binder.

#![cfg(unix)]

use nlp_plugin_bridge::{ConnectionState, ProcessBinder, RemoteProvider};
use nlp_plugin_core::{
    ComponentIdentity, HostConfig, NlpProvider, SuggestionCandidate, SuggestionProvider,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

async fn wait_for_state(provider: &RemoteProvider, state: ConnectionState) {
    let mut states = provider.connection().watch_state();
    tokio::time::timeout(Duration::from_secs(10), states.wait_for(|s| *s == state))
        .await
        .expect("state not reached in time")
        .unwrap();
}

#[tokio::test]
async fn test_process_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    // Answers every request with a RemoveSuggestion reply carrying `true`.
    let script = write_script(
        dir.path(),
        "provider.sh",
        r#"echo '{"bound":true}'
while IFS= read -r line; do
  id=$(echo "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p')
  echo "{\"what\":1569,\"id\":$id,\"data\":\"true\"}"
done
"#,
    );

    let component = ComponentIdentity::new("org.example.script", "ScriptService");
    let binder = Arc::new(ProcessBinder::new());
    binder.register(component.clone(), script);
    let provider = RemoteProvider::new(component, binder, &HostConfig::default());

    provider.create().await;
    wait_for_state(&provider, ConnectionState::Bound).await;

    let removed = provider
        .remove_suggestion(0, &SuggestionCandidate::word("hello", 0.5))
        .await;
    assert!(removed);
    provider.destroy().await;
    assert_eq!(provider.state(), ConnectionState::Unbound);
}

#[tokio::test]
async fn test_process_refusing_handshake_is_null_binding() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "refuse.sh", "echo '{\"bound\":false}'\n");

    let component = ComponentIdentity::new("org.example.script", "RefusingService");
    let binder = Arc::new(ProcessBinder::new());
    binder.register(component.clone(), script);
    let provider = RemoteProvider::new(component, binder, &HostConfig::default());

    provider.create().await;
    wait_for_state(&provider, ConnectionState::Unbound).await;
}
