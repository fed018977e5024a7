//! Service registries: where the indexer learns about installed services.
//!
//! A registry answers one question, "which services advertise interface X",
//! and hands back everything the indexer needs to validate them. Registries
//! that can observe installs expose a [`PackageEvent`] broadcast.

use crate::resources::{EmptyResources, ResourceContext};
use nlp_plugin_core::{ComponentIdentity, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Capacity of package event channels.
pub const PACKAGE_EVENT_CAPACITY: usize = 32;

/// A service advertising a queried interface.
#[derive(Debug, Clone)]
pub struct ServiceRecord {
    /// Package and service name
    pub identity: ComponentIdentity,
    /// Raw service metadata entries
    pub metadata: BTreeMap<String, String>,
    /// Descriptor text referenced by the metadata entry, if it could be read
    pub descriptor: Option<String>,
    /// Resources of the owning package
    pub resources: Arc<dyn ResourceContext>,
    /// Program that implements the service out of process
    pub executable: Option<PathBuf>,
}

impl ServiceRecord {
    /// Creates a record with no metadata, descriptor or resources.
    #[must_use]
    pub fn new(identity: ComponentIdentity) -> Self {
        Self {
            identity,
            metadata: BTreeMap::new(),
            descriptor: None,
            resources: Arc::new(EmptyResources),
            executable: None,
        }
    }

    /// Sets the descriptor text.
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.descriptor = Some(descriptor.into());
        self
    }

    /// Sets the package resources.
    #[must_use]
    pub fn with_resources(mut self, resources: Arc<dyn ResourceContext>) -> Self {
        self.resources = resources;
        self
    }

    /// Sets the service executable.
    #[must_use]
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = Some(executable.into());
        self
    }
}

/// Change to the set of installed packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageEvent {
    /// A package appeared
    Installed(String),
    /// A package's files changed
    Changed(String),
    /// A package disappeared
    Removed(String),
}

impl PackageEvent {
    /// Name of the affected package.
    #[must_use]
    pub fn package(&self) -> &str {
        match self {
            Self::Installed(p) | Self::Changed(p) | Self::Removed(p) => p,
        }
    }
}

/// Source of installed services.
#[cfg_attr(test, mockall::automock)]
pub trait ServiceRegistry: Send + Sync {
    /// Returns every installed service advertising `interface`.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry itself cannot be read. Problems with
    /// individual packages are logged and skipped.
    fn query_services(&self, interface: &str) -> Result<Vec<ServiceRecord>>;
}

/// Registry holding records in memory.
///
/// Installing and removing records emits [`PackageEvent`]s.
///
/// # Examples
///
/// ```
/// use nlp_plugin_core::ComponentIdentity;
/// use nlp_plugin_index::{ServiceRecord, ServiceRegistry, StaticRegistry};
///
/// let registry = StaticRegistry::new();
/// registry.install(
///     "nlp.plugin.PluginService",
///     ServiceRecord::new(ComponentIdentity::new("org.example", "Spell")),
/// );
/// assert_eq!(registry.query_services("nlp.plugin.PluginService").unwrap().len(), 1);
/// assert!(registry.query_services("other").unwrap().is_empty());
/// ```
#[derive(Debug)]
pub struct StaticRegistry {
    records: RwLock<Vec<(String, ServiceRecord)>>,
    events: broadcast::Sender<PackageEvent>,
}

impl StaticRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(PACKAGE_EVENT_CAPACITY);
        Self {
            records: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Adds `record` under `interface`, replacing a record with the same identity.
    pub fn install(&self, interface: &str, record: ServiceRecord) {
        let package = record.identity.package().to_string();
        let replaced = {
            let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
            let before = records.len();
            records.retain(|(_, r)| r.identity != record.identity);
            let replaced = records.len() != before;
            records.push((interface.to_string(), record));
            replaced
        };
        let event = if replaced {
            PackageEvent::Changed(package)
        } else {
            PackageEvent::Installed(package)
        };
        let _ = self.events.send(event);
    }

    /// Removes every record owned by `package`.
    ///
    /// Returns the number of removed records.
    pub fn uninstall(&self, package: &str) -> usize {
        let removed = {
            let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
            let before = records.len();
            records.retain(|(_, r)| r.identity.package() != package);
            before - records.len()
        };
        if removed > 0 {
            let _ = self.events.send(PackageEvent::Removed(package.to_string()));
        }
        removed
    }

    /// Subscribes to install and removal events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PackageEvent> {
        self.events.subscribe()
    }
}

impl Default for StaticRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry for StaticRegistry {
    fn query_services(&self, interface: &str) -> Result<Vec<ServiceRecord>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records
            .iter()
            .filter(|(i, _)| i == interface)
            .map(|(_, r)| r.clone())
            .collect())
    }
}
