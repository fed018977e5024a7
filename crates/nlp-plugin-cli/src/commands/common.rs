//! Shared plumbing for commands: configuration, indexing, and binding.

use anyhow::{Context, Result};
use nlp_plugin_bridge::{ConnectionState, ProcessBinder, RemoteProvider};
use nlp_plugin_core::config::default_config_path;
use nlp_plugin_core::{HostConfig, NlpProvider};
use nlp_plugin_index::{DirectoryRegistry, IndexedPlugin, PluginCatalog, PluginIndexer, ValidationState};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves the configuration file location.
///
/// An explicit path wins over the platform default.
#[must_use]
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(expand_home).or_else(default_config_path)
}

/// Loads the host configuration, applying a registry override.
///
/// # Errors
///
/// Returns an error if an existing configuration file is invalid.
pub fn load_config(explicit: Option<&Path>, registry: Option<&Path>) -> Result<HostConfig> {
    let mut config = match config_path(explicit) {
        Some(path) => HostConfig::load_or_default(&path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => HostConfig::default(),
    };
    if let Some(dir) = registry {
        config.registry_dir = expand_home(dir);
    }
    debug!(registry = %config.registry_dir.display(), "configuration loaded");
    Ok(config)
}

/// Expands a leading `~` to the home directory.
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Indexes the configured package directory once.
///
/// # Errors
///
/// Returns an error if the registry cannot be queried.
pub fn index(config: &HostConfig) -> Result<Arc<PluginCatalog>> {
    let registry = Arc::new(DirectoryRegistry::new(&config.registry_dir));
    PluginIndexer::new(registry, config)
        .reindex()
        .with_context(|| format!("failed to index {}", config.registry_dir.display()))
}

/// Serializable view of one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginSummary {
    /// Plugin id, when the descriptor parsed
    pub id: Option<String>,
    /// Implementing component
    pub component: String,
    /// Resolved title
    pub title: Option<String>,
    /// Descriptor version
    pub version: Option<String>,
    /// `ok`, `no metadata` or `invalid metadata`
    pub state: String,
    /// Why the descriptor was rejected
    pub reason: Option<String>,
    /// Declared features
    pub features: Vec<String>,
    /// Shipped with the host package
    pub internal: bool,
    /// Provider program
    pub executable: Option<String>,
}

impl From<&IndexedPlugin> for PluginSummary {
    fn from(plugin: &IndexedPlugin) -> Self {
        let (state, reason) = match plugin.state() {
            ValidationState::Ok => ("ok".to_string(), None),
            ValidationState::Error { kind, cause } => {
                (kind.to_string(), cause.as_ref().map(ToString::to_string))
            }
        };
        let metadata = plugin.metadata();
        Self {
            id: plugin.id().map(|id| id.as_str().to_string()),
            component: plugin.identity().to_string(),
            title: metadata.map(|m| m.title().get_or_raw(plugin.resources())),
            version: metadata.map(|m| m.version().to_string()),
            state,
            reason,
            features: metadata
                .map(|m| m.features().iter().map(|f| f.as_str().to_string()).collect())
                .unwrap_or_default(),
            internal: plugin.is_internal(),
            executable: plugin.executable().map(|p| p.display().to_string()),
        }
    }
}

/// Starts `plugin`'s executable and waits for the binding to settle.
///
/// Returns `None` if the plugin has no executable or refused the binding.
pub async fn connect(plugin: &IndexedPlugin, config: &HostConfig) -> Option<RemoteProvider> {
    let Some(executable) = plugin.executable() else {
        warn!(component = %plugin.identity(), "plugin ships no executable");
        return None;
    };
    let binder = Arc::new(ProcessBinder::new());
    binder.register(plugin.identity().clone(), executable);

    let provider = RemoteProvider::for_plugin(plugin, binder, config)?;
    provider.create().await;

    let mut states = provider.connection().watch_state();
    let bound = match tokio::time::timeout(
        config.request_timeout,
        states.wait_for(|state| *state != ConnectionState::Binding),
    )
    .await
    {
        Ok(Ok(state)) => *state == ConnectionState::Bound,
        _ => false,
    };

    if bound {
        Some(provider)
    } else {
        warn!(component = %plugin.identity(), state = %provider.state(), "plugin did not bind");
        provider.destroy().await;
        None
    }
}
