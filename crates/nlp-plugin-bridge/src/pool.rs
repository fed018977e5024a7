//! Keeps one bound [`RemoteProvider`] per valid catalog entry.

use crate::provider::RemoteProvider;
use crate::transport::ServiceBinder;
use nlp_plugin_core::{ComponentIdentity, HostConfig, NlpProvider};
use nlp_plugin_index::{IndexedPlugin, PluginCatalog};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

/// What a [`ProviderPool::reconcile`] pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    /// Components that got a new provider
    pub created: Vec<ComponentIdentity>,
    /// Components whose provider was kept
    pub retained: Vec<ComponentIdentity>,
    /// Components whose provider was destroyed
    pub destroyed: Vec<ComponentIdentity>,
}

impl ReconcileSummary {
    /// Returns `true` if the pass created or destroyed anything.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.created.is_empty() || !self.destroyed.is_empty()
    }
}

#[derive(Debug)]
struct PoolEntry {
    plugin: Arc<IndexedPlugin>,
    provider: Arc<RemoteProvider>,
}

/// Pool of remote providers following the plugin catalog.
#[derive(Debug)]
pub struct ProviderPool {
    binder: Arc<dyn ServiceBinder>,
    config: HostConfig,
    entries: Mutex<HashMap<ComponentIdentity, PoolEntry>>,
}

impl ProviderPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(binder: Arc<dyn ServiceBinder>, config: HostConfig) -> Self {
        Self {
            binder,
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Brings the pool in line with `catalog`.
    ///
    /// New valid entries get a created provider, vanished or invalidated
    /// entries have theirs destroyed, and unchanged components keep theirs.
    pub async fn reconcile(&self, catalog: &PluginCatalog) -> ReconcileSummary {
        let mut entries = self.entries.lock().await;
        let mut summary = ReconcileSummary::default();

        let wanted: HashMap<&ComponentIdentity, &Arc<IndexedPlugin>> =
            catalog.valid().map(|p| (p.identity(), p)).collect();

        let stale: Vec<ComponentIdentity> = entries
            .keys()
            .filter(|identity| !wanted.contains_key(identity))
            .cloned()
            .collect();
        for identity in stale {
            if let Some(entry) = entries.remove(&identity) {
                entry.provider.destroy().await;
                summary.destroyed.push(identity);
            }
        }

        for (identity, plugin) in wanted {
            if let Some(entry) = entries.get_mut(identity) {
                entry.plugin = Arc::clone(plugin);
                summary.retained.push(identity.clone());
                continue;
            }
            let provider = Arc::new(RemoteProvider::new(
                identity.clone(),
                Arc::clone(&self.binder),
                &self.config,
            ));
            provider.create().await;
            entries.insert(
                identity.clone(),
                PoolEntry {
                    plugin: Arc::clone(plugin),
                    provider,
                },
            );
            summary.created.push(identity.clone());
        }

        summary.created.sort();
        summary.retained.sort();
        summary.destroyed.sort();
        tracing::info!(
            generation = catalog.generation(),
            created = summary.created.len(),
            retained = summary.retained.len(),
            destroyed = summary.destroyed.len(),
            "provider pool reconciled"
        );
        summary
    }

    /// Provider for the plugin declaring `plugin_id`.
    pub async fn get(&self, plugin_id: &str) -> Option<Arc<RemoteProvider>> {
        let entries = self.entries.lock().await;
        let mut matches: Vec<_> = entries
            .iter()
            .filter(|(_, e)| e.plugin.id().is_some_and(|id| id.as_str() == plugin_id))
            .collect();
        matches.sort_by(|(a, _), (b, _)| a.cmp(b));
        matches.first().map(|(_, e)| Arc::clone(&e.provider))
    }

    /// Provider for `component`.
    pub async fn get_by_component(&self, component: &ComponentIdentity) -> Option<Arc<RemoteProvider>> {
        self.entries
            .lock()
            .await
            .get(component)
            .map(|e| Arc::clone(&e.provider))
    }

    /// All pooled providers, ordered by component.
    pub async fn providers(&self) -> Vec<Arc<RemoteProvider>> {
        let entries = self.entries.lock().await;
        let mut pooled: Vec<_> = entries.iter().collect();
        pooled.sort_by(|(a, _), (b, _)| a.cmp(b));
        pooled.into_iter().map(|(_, e)| Arc::clone(&e.provider)).collect()
    }

    /// Number of pooled providers.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns `true` if the pool holds no provider.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Reconciles on every catalog published through `catalogs`.
    ///
    /// The current catalog is reconciled immediately. The task ends when
    /// the sender is dropped.
    pub fn spawn_reconciler(
        self: &Arc<Self>,
        mut catalogs: watch::Receiver<Arc<PluginCatalog>>,
    ) -> JoinHandle<()> {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let catalog = Arc::clone(&catalogs.borrow_and_update());
                pool.reconcile(&catalog).await;
                if catalogs.changed().await.is_err() {
                    tracing::debug!("catalog stream closed, reconciler stopping");
                    return;
                }
            }
        })
    }

    /// Destroys every pooled provider.
    pub async fn shutdown(&self) {
        let drained: Vec<_> = self.entries.lock().await.drain().collect();
        for (identity, entry) in drained {
            tracing::debug!(component = %identity, "destroying pooled provider");
            entry.provider.destroy().await;
        }
    }
}
