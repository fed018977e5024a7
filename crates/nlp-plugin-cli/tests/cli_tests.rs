//! Commands against a package directory on disk.

use nlp_plugin_cli::commands::{common, inspect, list};
use nlp_plugin_core::HostConfig;
use std::fs;
use std::path::Path;

const LATIN_MANIFEST: &str = r#"
[package]
name = "org.example.latin"
version_code = 3
version_name = "1.0.0"

[[service]]
name = "LatinService"
interface = "nlp.plugin.PluginService"
exec = "provider.sh"

[service.meta]
"nlp.plugin.flp" = "flp.toml"
"#;

const LATIN_DESCRIPTOR: &str = r#"[plugin]
id = "org.example.latin"
version = "1.0"
title = "@string/title"
settings_activity = ".SettingsActivity"

[plugin.spelling]
[plugin.suggestion]
"#;

const BROKEN_MANIFEST: &str = r#"
[package]
name = "org.example.broken"
version_code = 1
version_name = "0.1"

[[service]]
name = "BrokenService"
interface = "nlp.plugin.PluginService"

[service.meta]
"nlp.plugin.flp" = "flp.toml"
"#;

fn write_package(root: &Path, dir: &str, files: &[(&str, &str)]) {
    let dir = root.join(dir);
    fs::create_dir_all(&dir).unwrap();
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
}

fn fixture(root: &Path) -> HostConfig {
    write_package(
        root,
        "latin",
        &[
            ("package.toml", LATIN_MANIFEST),
            ("flp.toml", LATIN_DESCRIPTOR),
            ("resources.toml", "[string]\ntitle = \"Latin\"\n"),
        ],
    );
    write_package(
        root,
        "broken",
        &[("package.toml", BROKEN_MANIFEST), ("flp.toml", "title = \"no plugin table\"\n")],
    );
    HostConfig::builder().registry_dir(root).build()
}

#[test]
fn test_list_reports_valid_and_invalid_plugins() {
    let root = tempfile::tempdir().unwrap();
    let config = fixture(root.path());
    let catalog = common::index(&config).unwrap();

    let report = list::collect(&config, &catalog, false);
    assert_eq!(report.plugins.len(), 2);
    assert_eq!(report.valid, 1);

    let latin = report
        .plugins
        .iter()
        .find(|p| p.id.as_deref() == Some("org.example.latin"))
        .unwrap();
    assert_eq!(latin.title.as_deref(), Some("Latin"));
    assert_eq!(latin.features, vec!["spelling", "suggestion"]);
    assert_eq!(latin.state, "ok");
    assert!(latin.executable.as_deref().unwrap().ends_with("provider.sh"));

    let broken = report
        .plugins
        .iter()
        .find(|p| p.component == "org.example.broken/BrokenService")
        .unwrap();
    assert_eq!(broken.state, "invalid metadata");
    assert!(broken.id.is_none());

    let valid_only = list::collect(&config, &catalog, true);
    assert_eq!(valid_only.plugins.len(), 1);
}

#[test]
fn test_inspect_finds_by_id_or_component() {
    let root = tempfile::tempdir().unwrap();
    let config = fixture(root.path());
    let catalog = common::index(&config).unwrap();

    let latin = inspect::find(&catalog, "org.example.latin").unwrap();
    let report = inspect::InspectReport::from(latin.as_ref());
    assert!(report.description.iter().any(|line| line == "title = Latin"));
    assert_eq!(
        report.settings_component.as_deref(),
        Some("org.example.latin/SettingsActivity")
    );
    assert!(report.settings_route.is_none());

    let broken = inspect::find(&catalog, "org.example.broken/BrokenService").unwrap();
    assert!(!broken.is_valid());
    assert!(inspect::find(&catalog, "org.example.missing").is_none());
}

#[test]
fn test_empty_registry_lists_nothing() {
    let root = tempfile::tempdir().unwrap();
    let config = HostConfig::builder().registry_dir(root.path().join("absent")).build();
    let catalog = common::index(&config).unwrap();
    assert!(list::collect(&config, &catalog, false).plugins.is_empty());
}

#[cfg(unix)]
mod process {
    use super::*;
    use nlp_plugin_core::{NlpProvider, SuggestionCandidate, SuggestionProvider};
    use std::os::unix::fs::PermissionsExt;

    fn install_script(root: &Path, body: &str) {
        let path = root.join("latin").join("provider.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[tokio::test]
    async fn test_connect_binds_plugin_executable() {
        let root = tempfile::tempdir().unwrap();
        let config = fixture(root.path());
        install_script(
            root.path(),
            r#"echo '{"bound":true}'
while IFS= read -r line; do
  id=$(echo "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p')
  echo "{\"what\":1569,\"id\":$id,\"data\":\"true\"}"
done
"#,
        );
        let catalog = common::index(&config).unwrap();
        let plugin = catalog.find_by_capability("org.example.latin").unwrap();

        let provider = common::connect(&plugin, &config).await.unwrap();
        assert!(
            provider
                .remove_suggestion(0, &SuggestionCandidate::word("latin", 0.5))
                .await
        );
        provider.destroy().await;
    }

    #[tokio::test]
    async fn test_connect_reports_refusal() {
        let root = tempfile::tempdir().unwrap();
        let config = fixture(root.path());
        install_script(root.path(), "echo '{\"bound\":false}'\n");
        let catalog = common::index(&config).unwrap();
        let plugin = catalog.find_by_capability("org.example.latin").unwrap();

        assert!(common::connect(&plugin, &config).await.is_none());
    }
}
