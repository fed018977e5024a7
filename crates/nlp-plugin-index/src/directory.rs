//! Registry backed by a directory of installed packages.
//!
//! ```text
//! <root>/
//! ├── latin/
//! │   ├── package.toml      # package identity + service declarations
//! │   ├── resources.toml    # optional, see TomlResources
//! │   ├── flp.toml          # plugin descriptor
//! │   └── bin/latin-provider
//! ```
//!
//! `package.toml`:
//!
//! ```toml
//! [package]
//! name = "org.example.latin"
//! version_code = 3
//! version_name = "1.0.0"
//!
//! [[service]]
//! name = "LatinService"
//! interface = "nlp.plugin.PluginService"
//! exec = "bin/latin-provider"
//!
//! [service.meta]
//! "nlp.plugin.flp" = "flp.toml"
//! ```
//!
//! Paths are relative to the package directory.

use crate::registry::{PACKAGE_EVENT_CAPACITY, PackageEvent, ServiceRecord, ServiceRegistry};
use crate::resources::{EmptyResources, ResourceContext, TomlResources};
use nlp_plugin_core::{ComponentIdentity, Error, Result, SERVICE_METADATA};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Package manifest file name.
pub const MANIFEST_FILE: &str = "package.toml";

/// Package resources file name.
pub const RESOURCES_FILE: &str = "resources.toml";

#[derive(Debug, Deserialize)]
struct PackageManifest {
    package: PackageSection,
    #[serde(default, rename = "service")]
    services: Vec<ServiceSection>,
}

#[derive(Debug, Deserialize)]
struct PackageSection {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ServiceSection {
    name: String,
    interface: String,
    #[serde(default)]
    exec: Option<PathBuf>,
    #[serde(default)]
    meta: BTreeMap<String, String>,
}

/// Per-package modification fingerprint.
type Fingerprint = BTreeMap<String, (usize, Option<SystemTime>)>;

/// Registry scanning `<root>/*/package.toml`.
#[derive(Debug)]
pub struct DirectoryRegistry {
    root: PathBuf,
    events: broadcast::Sender<PackageEvent>,
}

impl DirectoryRegistry {
    /// Creates a registry over `root`. The directory need not exist yet.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(PACKAGE_EVENT_CAPACITY);
        Self {
            root: root.into(),
            events,
        }
    }

    /// Root directory being scanned.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Subscribes to package changes detected by the watcher.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PackageEvent> {
        self.events.subscribe()
    }

    /// Starts polling the root every `interval` and emitting package events.
    ///
    /// The first scan only records a baseline. The task runs until aborted.
    pub fn spawn_watcher(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut previous: Option<Fingerprint> = None;

            loop {
                ticker.tick().await;
                let root = registry.root.clone();
                let current = match tokio::task::spawn_blocking(move || fingerprint(&root)).await {
                    Ok(current) => current,
                    Err(e) => {
                        tracing::warn!(error = %e, "package scan task failed");
                        continue;
                    }
                };

                if let Some(previous) = &previous {
                    for event in diff(previous, &current) {
                        tracing::debug!(?event, "package change detected");
                        let _ = registry.events.send(event);
                    }
                }
                previous = Some(current);
            }
        })
    }

    fn read_package(dir: &Path, interface: &str) -> Result<Vec<ServiceRecord>> {
        let manifest_source = fs::read_to_string(dir.join(MANIFEST_FILE))?;
        let manifest: PackageManifest =
            toml::from_str(&manifest_source).map_err(|e| Error::ConfigError {
                message: format!("invalid {MANIFEST_FILE}: {e}"),
            })?;

        let resources = load_resources(dir);
        let mut records = Vec::new();

        for service in manifest.services {
            if service.interface != interface {
                continue;
            }
            let identity = ComponentIdentity::new(&manifest.package.name, &service.name);
            let descriptor = service
                .meta
                .get(SERVICE_METADATA)
                .and_then(|file| match fs::read_to_string(dir.join(file)) {
                    Ok(text) => Some(text),
                    Err(e) => {
                        tracing::warn!(%identity, file = %file, error = %e, "descriptor unreadable");
                        None
                    }
                });

            records.push(ServiceRecord {
                identity,
                metadata: service.meta,
                descriptor,
                resources: Arc::clone(&resources),
                executable: service.exec.map(|exec| dir.join(exec)),
            });
        }

        Ok(records)
    }
}

impl ServiceRegistry for DirectoryRegistry {
    fn query_services(&self, interface: &str) -> Result<Vec<ServiceRecord>> {
        if !self.root.exists() {
            tracing::debug!(root = %self.root.display(), "registry directory does not exist");
            return Ok(Vec::new());
        }

        let mut dirs = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_dir() && path.join(MANIFEST_FILE).is_file() {
                dirs.push(path);
            }
        }
        dirs.sort();

        let mut records = Vec::new();
        for dir in dirs {
            match Self::read_package(&dir, interface) {
                Ok(found) => records.extend(found),
                Err(e) => {
                    tracing::warn!("Skipping package {}: {}", dir.display(), e);
                }
            }
        }
        Ok(records)
    }
}

fn load_resources(dir: &Path) -> Arc<dyn ResourceContext> {
    let path = dir.join(RESOURCES_FILE);
    if !path.is_file() {
        return Arc::new(EmptyResources);
    }
    match TomlResources::load(&path) {
        Ok(resources) => Arc::new(resources),
        Err(e) => {
            tracing::warn!("Ignoring resources {}: {}", path.display(), e);
            Arc::new(EmptyResources)
        }
    }
}

fn fingerprint(root: &Path) -> Fingerprint {
    let mut packages = Fingerprint::new();
    let Ok(entries) = fs::read_dir(root) else {
        return packages;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let mut count = 0;
        let mut newest: Option<SystemTime> = None;
        if let Ok(files) = fs::read_dir(&path) {
            for file in files.flatten() {
                count += 1;
                let modified = file.metadata().and_then(|m| m.modified()).ok();
                newest = newest.max(modified);
            }
        }
        packages.insert(name, (count, newest));
    }
    packages
}

fn diff(previous: &Fingerprint, current: &Fingerprint) -> Vec<PackageEvent> {
    let mut events = Vec::new();
    for (name, stamp) in current {
        match previous.get(name) {
            None => events.push(PackageEvent::Installed(name.clone())),
            Some(old) if old != stamp => events.push(PackageEvent::Changed(name.clone())),
            Some(_) => {}
        }
    }
    for name in previous.keys() {
        if !current.contains_key(name) {
            events.push(PackageEvent::Removed(name.clone()));
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlp_plugin_core::SERVICE_INTERFACE;

    fn write_package(root: &Path, dir: &str, manifest: &str, files: &[(&str, &str)]) {
        let dir = root.join(dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
    }

    const LATIN: &str = r#"
        [package]
        name = "org.example.latin"
        version_code = 3
        version_name = "1.0.0"

        [[service]]
        name = "LatinService"
        interface = "nlp.plugin.PluginService"
        exec = "bin/latin"

        [service.meta]
        "nlp.plugin.flp" = "flp.toml"

        [[service]]
        name = "Unrelated"
        interface = "org.example.Other"
    "#;

    #[test]
    fn test_query_reads_services_descriptor_and_resources() {
        let root = tempfile::tempdir().unwrap();
        write_package(
            root.path(),
            "latin",
            LATIN,
            &[
                ("flp.toml", "[plugin]\nid = \"latin\"\n"),
                ("resources.toml", "[string]\ntitle = \"Latin\"\n"),
            ],
        );

        let registry = DirectoryRegistry::new(root.path());
        let records = registry.query_services(SERVICE_INTERFACE).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(
            record.identity,
            ComponentIdentity::new("org.example.latin", "LatinService")
        );
        assert!(record.descriptor.as_deref().unwrap().contains("id = \"latin\""));
        assert_eq!(record.resources.resolve("string/title").as_deref(), Some("Latin"));
        assert_eq!(
            record.executable.as_deref(),
            Some(root.path().join("latin").join("bin/latin").as_path())
        );
    }

    #[test]
    fn test_missing_descriptor_file_yields_no_descriptor() {
        let root = tempfile::tempdir().unwrap();
        write_package(root.path(), "latin", LATIN, &[]);

        let records = DirectoryRegistry::new(root.path())
            .query_services(SERVICE_INTERFACE)
            .unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].descriptor.is_none());
        assert!(records[0].metadata.contains_key(SERVICE_METADATA));
    }

    #[test]
    fn test_broken_manifest_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        write_package(root.path(), "broken", "[package\n", &[]);
        write_package(root.path(), "latin", LATIN, &[]);
        fs::create_dir_all(root.path().join("not-a-package")).unwrap();

        let records = DirectoryRegistry::new(root.path())
            .query_services(SERVICE_INTERFACE)
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let root = tempfile::tempdir().unwrap();
        let registry = DirectoryRegistry::new(root.path().join("absent"));
        assert!(registry.query_services(SERVICE_INTERFACE).unwrap().is_empty());
    }

    #[test]
    fn test_fingerprint_diff() {
        let mut before = Fingerprint::new();
        before.insert("a".into(), (1, None));
        before.insert("b".into(), (1, None));

        let mut after = Fingerprint::new();
        after.insert("a".into(), (2, None));
        after.insert("c".into(), (1, None));

        let events = diff(&before, &after);
        assert_eq!(
            events,
            vec![
                PackageEvent::Changed("a".into()),
                PackageEvent::Installed("c".into()),
                PackageEvent::Removed("b".into()),
            ]
        );
        assert!(diff(&after, &after).is_empty());
    }

    #[tokio::test]
    async fn test_watcher_reports_installs_and_removals() {
        let root = tempfile::tempdir().unwrap();
        let registry = Arc::new(DirectoryRegistry::new(root.path()));
        let mut events = registry.subscribe();
        let watcher = registry.spawn_watcher(Duration::from_millis(20));

        // Let the baseline scan happen first.
        tokio::time::sleep(Duration::from_millis(100)).await;
        write_package(root.path(), "latin", LATIN, &[]);

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, PackageEvent::Installed("latin".into()));

        fs::remove_dir_all(root.path().join("latin")).unwrap();
        let removed = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let PackageEvent::Removed(name) = events.recv().await.unwrap() {
                    return name;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(removed, "latin");

        watcher.abort();
    }
}
