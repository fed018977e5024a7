//! Provider-side binding target with a single handler loop.

use crate::dispatcher::{Dispatcher, ProviderHandlers};
use nlp_plugin_bridge::{BindableService, MessageSender, ServiceEndpoint};
use nlp_plugin_core::{BindExtras, ConsumerInfo, Error, Message, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

enum Command {
    Dispatch {
        message: Message,
        reply_to: MessageSender,
    },
    Shutdown(oneshot::Sender<()>),
}

/// Hosts one provider and accepts consumer bindings.
///
/// Every message from every binding is handled in arrival order on one
/// task, so the provider never sees two requests at once.
///
/// # Examples
///
/// ```
/// use nlp_plugin_bridge::BindableService;
/// use nlp_plugin_core::{BindExtras, ConsumerInfo, FallbackProvider};
/// use nlp_plugin_service::{PluginService, ProviderHandlers};
/// use std::sync::Arc;
/// use tokio::sync::mpsc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let service = PluginService::start(ProviderHandlers::full(Arc::new(FallbackProvider)));
/// let (replies, _) = mpsc::unbounded_channel();
///
/// // Consumers must identify themselves.
/// assert!(service.on_bind(&BindExtras::new(), replies.clone()).is_none());
/// assert!(service.on_bind(&ConsumerInfo::default().to_extras(), replies).is_some());
/// service.shutdown().await;
/// # }
/// ```
#[derive(Debug)]
pub struct PluginService {
    handlers: ProviderHandlers,
    inbound: mpsc::UnboundedSender<Command>,
    consumer: Mutex<Option<ConsumerInfo>>,
    bindings: AtomicUsize,
    handler: JoinHandle<()>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dispatch { message, .. } => f.debug_tuple("Dispatch").field(message).finish(),
            Self::Shutdown(_) => f.write_str("Shutdown"),
        }
    }
}

impl PluginService {
    /// Creates the provider and starts the handler loop.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn start(handlers: ProviderHandlers) -> Arc<Self> {
        let (inbound, commands) = mpsc::unbounded_channel();
        let handler = tokio::spawn(run_handler(Dispatcher::new(handlers.clone()), commands));
        Arc::new(Self {
            handlers,
            inbound,
            consumer: Mutex::new(None),
            bindings: AtomicUsize::new(0),
            handler,
        })
    }

    /// Identity of the most recently bound consumer.
    #[must_use]
    pub fn consumer(&self) -> Option<ConsumerInfo> {
        self.consumer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of open bindings.
    #[must_use]
    pub fn active_bindings(&self) -> usize {
        self.bindings.load(Ordering::SeqCst)
    }

    /// Capability table of the hosted provider.
    #[must_use]
    pub const fn handlers(&self) -> &ProviderHandlers {
        &self.handlers
    }

    /// Returns `true` once the handler loop has stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inbound.is_closed()
    }

    /// Destroys the provider after the messages already queued are handled.
    ///
    /// New bindings are refused afterwards.
    pub async fn shutdown(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.inbound.send(Command::Shutdown(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

impl Drop for PluginService {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

impl BindableService for PluginService {
    fn on_bind(&self, extras: &BindExtras, reply_to: MessageSender) -> Option<Arc<dyn ServiceEndpoint>> {
        let Some(consumer) = ConsumerInfo::from_extras(extras) else {
            tracing::warn!("refusing binding without consumer identity");
            return None;
        };
        if self.is_stopped() {
            tracing::warn!(consumer = %consumer.package_name, "refusing binding after shutdown");
            return None;
        }
        tracing::info!(
            consumer = %consumer.package_name,
            version_code = consumer.version_code,
            version_name = %consumer.version_name,
            "consumer bound"
        );
        *self.consumer.lock().unwrap_or_else(PoisonError::into_inner) = Some(consumer);
        self.bindings.fetch_add(1, Ordering::SeqCst);

        Some(Arc::new(HandlerEndpoint {
            inbound: self.inbound.clone(),
            reply_to,
        }))
    }

    fn on_unbind(&self) {
        let previous = self
            .bindings
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        tracing::debug!(remaining = previous.map_or(0, |n| n - 1), "consumer unbound");
    }
}

async fn run_handler(dispatcher: Dispatcher, mut commands: mpsc::UnboundedReceiver<Command>) {
    let provider = dispatcher.handlers().base().clone();
    provider.create().await;
    tracing::debug!("provider created");

    while let Some(command) = commands.recv().await {
        match command {
            Command::Dispatch { message, reply_to } => {
                dispatcher.handle_message(message, &reply_to).await;
            }
            Command::Shutdown(done) => {
                commands.close();
                provider.destroy().await;
                tracing::info!("provider destroyed");
                let _ = done.send(());
                return;
            }
        }
    }
}

#[derive(Debug)]
struct HandlerEndpoint {
    inbound: mpsc::UnboundedSender<Command>,
    reply_to: MessageSender,
}

impl ServiceEndpoint for HandlerEndpoint {
    fn send(&self, message: Message) -> Result<()> {
        self.inbound
            .send(Command::Dispatch {
                message,
                reply_to: self.reply_to.clone(),
            })
            .map_err(|_| Error::ConnectionDied {
                component: "plugin service".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlp_plugin_core::{Action, FallbackProvider};

    #[tokio::test]
    async fn test_bind_records_consumer() {
        let service = PluginService::start(ProviderHandlers::full(Arc::new(FallbackProvider)));
        let (tx, _rx) = mpsc::unbounded_channel();
        let consumer = ConsumerInfo::new("org.example.keyboard", 3, "0.3.0");

        assert!(service.on_bind(&consumer.to_extras(), tx).is_some());
        assert_eq!(service.consumer(), Some(consumer));
        assert_eq!(service.active_bindings(), 1);

        service.on_unbind();
        service.on_unbind();
        assert_eq!(service.active_bindings(), 0);
    }

    #[tokio::test]
    async fn test_incomplete_identity_is_refused() {
        let service = PluginService::start(ProviderHandlers::full(Arc::new(FallbackProvider)));
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut extras = BindExtras::new();
        extras.insert(nlp_plugin_core::CONSUMER_PACKAGE_NAME, "org.example.keyboard");

        assert!(service.on_bind(&extras, tx).is_none());
        assert_eq!(service.consumer(), None);
    }

    #[tokio::test]
    async fn test_shutdown_refuses_new_work() {
        let service = PluginService::start(ProviderHandlers::full(Arc::new(FallbackProvider)));
        let (tx, _rx) = mpsc::unbounded_channel();
        let endpoint = service
            .on_bind(&ConsumerInfo::default().to_extras(), tx.clone())
            .unwrap();

        service.shutdown().await;

        assert!(service.is_stopped());
        assert!(endpoint.send(Message::request_to_service(Action::Preload, 1, None)).is_err());
        assert!(service.on_bind(&ConsumerInfo::default().to_extras(), tx).is_none());
    }
}
