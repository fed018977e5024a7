//! Plugin discovery for NLP plugin hosts.
//!
//! This crate turns installed packages into a catalog of usable plugins:
//!
//! - [`ServiceRegistry`] lists services advertising the plugin interface.
//!   [`DirectoryRegistry`] scans a package directory, [`StaticRegistry`]
//!   holds records in memory.
//! - [`PluginMetadata`] parses the TOML descriptor each service ships,
//!   resolving `@`-prefixed values through a [`ResourceContext`].
//! - [`PluginIndexer`] validates every service and publishes an immutable
//!   [`PluginCatalog`], rebuilding it when packages change.
//!
//! # Examples
//!
//! ```no_run
//! use nlp_plugin_core::HostConfig;
//! use nlp_plugin_index::{DirectoryRegistry, PluginIndexer};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> nlp_plugin_core::Result<()> {
//! let config = HostConfig::default();
//! let registry = Arc::new(DirectoryRegistry::new(&config.registry_dir));
//! let indexer = Arc::new(PluginIndexer::new(registry.clone(), &config));
//!
//! indexer.reindex()?;
//! let _watcher = registry.spawn_watcher(config.rescan_interval);
//! let _observer = indexer.observe_install_changes(registry.subscribe());
//!
//! for plugin in indexer.catalog().valid() {
//!     println!("{plugin}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod directory;
mod indexer;
mod metadata;
mod registry;
mod resources;

pub use directory::{DirectoryRegistry, MANIFEST_FILE, RESOURCES_FILE};
pub use indexer::{IndexedPlugin, IndexedPluginError, PluginCatalog, PluginIndexer, ValidationState};
pub use metadata::{Feature, LocalizedValue, PluginMetadata};
pub use registry::{PACKAGE_EVENT_CAPACITY, PackageEvent, ServiceRecord, ServiceRegistry, StaticRegistry};
pub use resources::{EmptyResources, MapResources, ResourceContext, TomlResources};
