//! Plugin indexer and the catalog it publishes.
//!
//! The indexer asks a [`ServiceRegistry`] for every service advertising
//! [`SERVICE_INTERFACE`], validates each descriptor, and publishes the result
//! as an immutable [`PluginCatalog`]. A new catalog replaces the old one in a
//! single step, so readers never observe a half-built list.

use crate::metadata::{Feature, PluginMetadata};
use crate::registry::{PackageEvent, ServiceRecord, ServiceRegistry};
use crate::resources::ResourceContext;
use nlp_plugin_core::{
    ComponentIdentity, Error, HostConfig, PluginId, Result, SERVICE_INTERFACE,
};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Scheme of settings screens hosted by the consumer itself.
const APP_UI_SCHEME: &str = "ui://";

/// Why an indexed plugin is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndexedPluginError {
    /// The service declares no descriptor
    NoMetadata,
    /// The descriptor does not parse
    InvalidMetadata,
}

impl fmt::Display for IndexedPluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoMetadata => "no metadata",
            Self::InvalidMetadata => "invalid metadata",
        })
    }
}

/// Validation outcome of an indexed plugin.
#[derive(Debug, Clone)]
pub enum ValidationState {
    /// The descriptor parsed
    Ok,
    /// The plugin is listed but cannot be used
    Error {
        /// Failure category
        kind: IndexedPluginError,
        /// Underlying parse failure
        cause: Option<Arc<Error>>,
    },
}

impl ValidationState {
    /// Returns `true` for [`ValidationState::Ok`].
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// One discovered provider.
#[derive(Debug)]
pub struct IndexedPlugin {
    identity: ComponentIdentity,
    state: ValidationState,
    metadata: Option<PluginMetadata>,
    resources: Arc<dyn ResourceContext>,
    executable: Option<PathBuf>,
    internal: bool,
}

impl IndexedPlugin {
    /// Validates a registry record.
    ///
    /// `host_package` decides whether the plugin counts as internal.
    #[must_use]
    pub fn from_record(record: ServiceRecord, host_package: &str) -> Self {
        let internal = record.identity.package() == host_package;
        let (state, metadata) =
            match PluginMetadata::parse(&record.identity, record.descriptor.as_deref()) {
                Ok(metadata) => (ValidationState::Ok, Some(metadata)),
                Err(e) => {
                    let kind = if matches!(e, Error::NoMetadata { .. }) {
                        IndexedPluginError::NoMetadata
                    } else {
                        IndexedPluginError::InvalidMetadata
                    };
                    let state = ValidationState::Error {
                        kind,
                        cause: Some(Arc::new(e)),
                    };
                    (state, None)
                }
            };

        Self {
            identity: record.identity,
            state,
            metadata,
            resources: record.resources,
            executable: record.executable,
            internal,
        }
    }

    /// Component implementing the plugin.
    #[must_use]
    pub const fn identity(&self) -> &ComponentIdentity {
        &self.identity
    }

    /// Validation outcome.
    #[must_use]
    pub const fn state(&self) -> &ValidationState {
        &self.state
    }

    /// Parsed descriptor; `None` unless valid.
    #[must_use]
    pub const fn metadata(&self) -> Option<&PluginMetadata> {
        self.metadata.as_ref()
    }

    /// Declared plugin id; `None` unless valid.
    #[must_use]
    pub fn id(&self) -> Option<&PluginId> {
        self.metadata.as_ref().map(PluginMetadata::id)
    }

    /// Resources of the owning package.
    #[must_use]
    pub fn resources(&self) -> &dyn ResourceContext {
        self.resources.as_ref()
    }

    /// Program implementing the service out of process.
    #[must_use]
    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }

    /// Returns `true` if the descriptor parsed.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.state.is_ok()
    }

    /// Returns `true` if the plugin ships with the host package.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        self.internal
    }

    /// Returns `true` if the plugin comes from a foreign package.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        !self.internal
    }

    /// Returns `true` if the plugin is valid and declares `feature`.
    #[must_use]
    pub fn supports(&self, feature: Feature) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.has_feature(feature))
    }

    /// Host route of the settings screen when it lives inside the host.
    ///
    /// A settings activity of the form `ui://<authority>/<path>` yields
    /// `<path>`. Any other activity, or none, yields `None`.
    #[must_use]
    pub fn settings_route(&self) -> Option<String> {
        let activity = self.metadata.as_ref()?.settings_activity()?;
        let reference = activity.strip_prefix(APP_UI_SCHEME)?;
        let path = reference.split_once('/').map_or("", |(_, path)| path);
        Some(path.to_string())
    }

    /// Component of the plugin's own settings screen.
    ///
    /// A bare name is resolved inside the plugin's package. In-host
    /// `ui://` references have no component; see [`settings_route`](Self::settings_route).
    #[must_use]
    pub fn settings_component(&self) -> Option<ComponentIdentity> {
        let activity = self.metadata.as_ref()?.settings_activity()?;
        if activity.starts_with(APP_UI_SCHEME) {
            return None;
        }
        Some(activity.parse().unwrap_or_else(|_| {
            ComponentIdentity::new(self.identity.package(), activity.trim_start_matches('.'))
        }))
    }

    /// Human-readable summary with resources resolved.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = format!(
            "component = {}\nstate = {}\n",
            self.identity,
            StateDisplay(&self.state)
        );
        if let Some(metadata) = &self.metadata {
            out.push_str(&metadata.describe(self.resources.as_ref()));
        }
        out
    }

    /// Returns `true` if `other` would behave identically.
    fn same_as(&self, other: &Self) -> bool {
        self.identity == other.identity
            && self.is_valid() == other.is_valid()
            && self.metadata == other.metadata
            && self.executable == other.executable
    }
}

struct StateDisplay<'a>(&'a ValidationState);

impl fmt::Display for StateDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            ValidationState::Ok => f.write_str("ok"),
            ValidationState::Error { kind, cause: None } => write!(f, "error ({kind})"),
            ValidationState::Error {
                kind,
                cause: Some(cause),
            } => write!(f, "error ({kind}): {cause}"),
        }
    }
}

impl fmt::Display for IndexedPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexedPlugin {{ component={}, state={}", self.identity, StateDisplay(&self.state))?;
        if let Some(id) = self.id() {
            write!(f, ", id={id}")?;
        }
        f.write_str(" }")
    }
}

/// Immutable snapshot of all indexed plugins.
#[derive(Debug, Default)]
pub struct PluginCatalog {
    generation: u64,
    plugins: Vec<Arc<IndexedPlugin>>,
}

impl PluginCatalog {
    /// Number of reindex passes that produced this catalog.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// All plugins, valid or not, ordered by component.
    #[must_use]
    pub fn plugins(&self) -> &[Arc<IndexedPlugin>] {
        &self.plugins
    }

    /// Valid plugins only.
    pub fn valid(&self) -> impl Iterator<Item = &Arc<IndexedPlugin>> {
        self.plugins.iter().filter(|p| p.is_valid())
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Finds the valid plugin declaring `id`.
    ///
    /// Invalid entries never match.
    #[must_use]
    pub fn find_by_capability(&self, id: &str) -> Option<Arc<IndexedPlugin>> {
        self.valid()
            .find(|p| p.id().is_some_and(|pid| pid.as_str() == id))
            .cloned()
    }

    /// Finds the entry for `identity`, valid or not.
    #[must_use]
    pub fn find_by_component(&self, identity: &ComponentIdentity) -> Option<Arc<IndexedPlugin>> {
        self.plugins.iter().find(|p| p.identity() == identity).cloned()
    }

    /// Valid plugins declaring `feature`.
    #[must_use]
    pub fn with_feature(&self, feature: Feature) -> Vec<Arc<IndexedPlugin>> {
        self.valid().filter(|p| p.supports(feature)).cloned().collect()
    }
}

/// Discovers plugins and publishes the current [`PluginCatalog`].
///
/// # Examples
///
/// ```
/// use nlp_plugin_core::{ComponentIdentity, HostConfig, SERVICE_INTERFACE};
/// use nlp_plugin_index::{PluginIndexer, ServiceRecord, StaticRegistry};
/// use std::sync::Arc;
///
/// let registry = Arc::new(StaticRegistry::new());
/// registry.install(
///     SERVICE_INTERFACE,
///     ServiceRecord::new(ComponentIdentity::new("org.example.latin", "Latin"))
///         .with_descriptor("[plugin]\nid = \"latin\"\nversion = \"1\"\ntitle = \"Latin\"\n"),
/// );
///
/// let indexer = PluginIndexer::new(registry, &HostConfig::default());
/// let catalog = indexer.reindex().unwrap();
/// assert!(catalog.find_by_capability("latin").is_some());
/// ```
pub struct PluginIndexer {
    registry: Arc<dyn ServiceRegistry>,
    host_package: String,
    allow_external: bool,
    catalog: watch::Sender<Arc<PluginCatalog>>,
    reindex_lock: Mutex<()>,
}

impl fmt::Debug for PluginIndexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginIndexer")
            .field("host_package", &self.host_package)
            .field("allow_external", &self.allow_external)
            .field("generation", &self.catalog.borrow().generation)
            .finish_non_exhaustive()
    }
}

impl PluginIndexer {
    /// Creates an indexer with an empty catalog.
    #[must_use]
    pub fn new(registry: Arc<dyn ServiceRegistry>, config: &HostConfig) -> Self {
        let (catalog, _) = watch::channel(Arc::new(PluginCatalog::default()));
        Self {
            registry,
            host_package: config.consumer.package_name.clone(),
            allow_external: config.allow_external_plugins,
            catalog,
            reindex_lock: Mutex::new(()),
        }
    }

    /// Rebuilds the catalog from the registry.
    ///
    /// Entries whose identity and descriptor are unchanged keep their
    /// previous `Arc`.
    ///
    /// # Errors
    ///
    /// Returns the registry's error; the current catalog is left in place.
    pub fn reindex(&self) -> Result<Arc<PluginCatalog>> {
        let _guard = self.reindex_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let records = self.registry.query_services(SERVICE_INTERFACE)?;
        let previous = self.catalog();

        let mut plugins = Vec::with_capacity(records.len());
        for record in records {
            if !self.allow_external && record.identity.package() != self.host_package {
                tracing::debug!(component = %record.identity, "external plugins disabled, skipping");
                continue;
            }

            let plugin = IndexedPlugin::from_record(record, &self.host_package);
            match plugin.state() {
                ValidationState::Ok => tracing::debug!(%plugin, "indexed plugin"),
                ValidationState::Error { .. } => tracing::warn!(%plugin, "indexed unusable plugin"),
            }

            let plugin = previous
                .find_by_component(plugin.identity())
                .filter(|old| old.same_as(&plugin))
                .unwrap_or_else(|| Arc::new(plugin));
            plugins.push(plugin);
        }
        plugins.sort_by(|a, b| a.identity().cmp(b.identity()));

        let catalog = Arc::new(PluginCatalog {
            generation: previous.generation + 1,
            plugins,
        });
        tracing::info!(
            generation = catalog.generation,
            total = catalog.len(),
            valid = catalog.valid().count(),
            "plugin catalog rebuilt"
        );
        self.catalog.send_replace(Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Current catalog.
    #[must_use]
    pub fn catalog(&self) -> Arc<PluginCatalog> {
        Arc::clone(&self.catalog.borrow())
    }

    /// Subscribes to catalog replacements.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<PluginCatalog>> {
        self.catalog.subscribe()
    }

    /// Finds the valid plugin declaring `id` in the current catalog.
    #[must_use]
    pub fn find_by_capability(&self, id: &str) -> Option<Arc<IndexedPlugin>> {
        self.catalog.borrow().find_by_capability(id)
    }

    /// Reindexes whenever `events` reports a package change.
    ///
    /// Lagged receivers reindex once for all missed events. The task ends
    /// when the event channel closes.
    pub fn observe_install_changes(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<PackageEvent>,
    ) -> JoinHandle<()> {
        let indexer = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        tracing::debug!(package = event.package(), "package changed, reindexing");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "missed package events, reindexing");
                    }
                    Err(RecvError::Closed) => break,
                }

                let indexer = Arc::clone(&indexer);
                match tokio::task::spawn_blocking(move || indexer.reindex()).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => tracing::warn!(error = %e, "reindex failed"),
                    Err(e) => tracing::warn!(error = %e, "reindex task failed"),
                }
            }
            tracing::debug!("package event channel closed, observer stopping");
        })
    }
}
