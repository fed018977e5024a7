//! One binding to a provider, with outbound replay and an inbound reply stream.
//!
//! ```text
//! Unbound ──bind()──► Binding ──Connected──► Bound
//!    ▲                   ▲                     │
//!    │                   └──── rebind ◄── BindingDied
//!    └──────── Disconnected / NullBinding / unbind() ◄┘
//! ```
//!
//! Outbound messages always go through the replay buffer. A single drain
//! task forwards them in FIFO order once an endpoint is available. Inbound
//! replies are published on a broadcast stream; callers correlate them.

use crate::replay::ReplayBuffer;
use crate::transport::{
    BindRequest, Binding, ConnectionEvent, EventReceiver, EventSender, MessageSender, ServiceBinder,
    ServiceEndpoint,
};
use nlp_plugin_core::{BindExtras, ComponentIdentity, ConsumerInfo, Error, HostConfig, Message, Result};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

/// Binding state of a [`PluginConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No binding, or the provider is currently disconnected
    Unbound,
    /// Bind requested, waiting for the provider
    Binding,
    /// Messages are being delivered
    Bound,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unbound => "unbound",
            Self::Binding => "binding",
            Self::Bound => "bound",
        };
        f.write_str(name)
    }
}

/// Counters describing a connection's traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    /// Messages accepted by [`PluginConnection::send`]
    pub sent: u64,
    /// Messages handed to an endpoint
    pub delivered: u64,
    /// Messages evicted from the replay buffer
    pub dropped_on_overflow: u64,
    /// Provider replies published on the reply stream
    pub replies_received: u64,
    /// Inbound messages rejected because they were not provider replies
    pub replies_discarded: u64,
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    delivered: AtomicU64,
    replies_received: AtomicU64,
    replies_discarded: AtomicU64,
}

struct Shared {
    component: ComponentIdentity,
    extras: BindExtras,
    binder: Arc<dyn ServiceBinder>,
    bind_requested: AtomicBool,
    binding: Mutex<Option<Box<dyn Binding>>>,
    generation: AtomicU64,
    endpoint: watch::Sender<Option<Arc<dyn ServiceEndpoint>>>,
    state: watch::Sender<ConnectionState>,
    outbound: ReplayBuffer<Message>,
    replies: broadcast::Sender<Message>,
    events_tx: EventSender,
    reply_tx: MessageSender,
    counters: Counters,
}

impl Shared {
    fn lock_binding(&self) -> MutexGuard<'_, Option<Box<dyn Binding>>> {
        self.binding.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn establish(&self) -> Result<()> {
        let mut binding = self.lock_binding();
        if binding.is_some() {
            return Ok(());
        }
        self.state.send_replace(ConnectionState::Binding);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let request = BindRequest {
            component: self.component.clone(),
            extras: self.extras.clone(),
            events: self.events_tx.with_generation(generation),
            reply_to: self.reply_tx.clone(),
        };
        match self.binder.bind(request) {
            Ok(handle) => {
                *binding = Some(handle);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(component = %self.component, error = %e, "bind request failed");
                self.bind_requested.store(false, Ordering::SeqCst);
                self.state.send_replace(ConnectionState::Unbound);
                Err(e)
            }
        }
    }

    fn release(&self) {
        let binding = self.lock_binding().take();
        // Events still in flight from the released binding become stale.
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(mut binding) = binding {
            binding.unbind();
        }
        self.endpoint.send_replace(None);
        self.state.send_replace(ConnectionState::Unbound);
    }

    fn handle_event(&self, generation: u64, event: ConnectionEvent) {
        let current = self.generation.load(Ordering::SeqCst);
        if generation != current {
            tracing::debug!(
                component = %self.component,
                event = event.name(),
                generation,
                current,
                "ignoring event from a released binding"
            );
            return;
        }
        tracing::debug!(component = %self.component, event = event.name(), generation, "connection event");
        match event {
            ConnectionEvent::Connected(endpoint) => {
                if !self.bind_requested.load(Ordering::SeqCst) {
                    tracing::debug!(component = %self.component, "ignoring connect after unbind");
                    return;
                }
                self.endpoint.send_replace(Some(endpoint));
                self.state.send_replace(ConnectionState::Bound);
                tracing::info!(
                    component = %self.component,
                    pending = self.outbound.len(),
                    "provider connected"
                );
            }
            ConnectionEvent::Disconnected => {
                tracing::warn!(component = %self.component, "provider disconnected");
                self.endpoint.send_replace(None);
                self.state.send_replace(ConnectionState::Unbound);
            }
            ConnectionEvent::BindingDied => {
                tracing::warn!(component = %self.component, "binding died, rebinding");
                self.release();
                if self.bind_requested.load(Ordering::SeqCst)
                    && let Err(e) = self.establish()
                {
                    tracing::error!(component = %self.component, error = %e, "rebind failed");
                }
            }
            ConnectionEvent::NullBinding => {
                tracing::warn!(component = %self.component, "provider refused the binding");
                self.bind_requested.store(false, Ordering::SeqCst);
                self.release();
            }
        }
    }

    fn accept_inbound(&self, message: Message) {
        if !message.is_service_response() {
            self.counters.replies_discarded.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                component = %self.component,
                header = ?message.header,
                id = message.id,
                "discarding inbound message that is not a provider reply"
            );
            return;
        }
        self.counters.replies_received.fetch_add(1, Ordering::Relaxed);
        // No subscriber means nobody is waiting; the reply is stale.
        let _ = self.replies.send(message);
    }
}

async fn run_events(shared: Arc<Shared>, mut events: EventReceiver) {
    while let Some((generation, event)) = events.recv().await {
        shared.handle_event(generation, event);
    }
}

async fn run_inbound(shared: Arc<Shared>, mut inbound: mpsc::UnboundedReceiver<Message>) {
    while let Some(message) = inbound.recv().await {
        shared.accept_inbound(message);
    }
}

async fn run_drain(shared: Arc<Shared>) {
    let mut endpoint_rx = shared.endpoint.subscribe();
    loop {
        let endpoint = match endpoint_rx.wait_for(Option::is_some).await {
            Ok(current) => current.clone(),
            Err(_) => return,
        };
        let Some(endpoint) = endpoint else { continue };

        let message = tokio::select! {
            message = shared.outbound.pop() => message,
            _ = endpoint_rx.changed() => continue,
        };

        match endpoint.send(message.clone()) {
            Ok(()) => {
                shared.counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!(
                    component = %shared.component,
                    id = message.id,
                    error = %e,
                    "delivery failed, keeping message for the next endpoint"
                );
                if shared.outbound.push_front(message).is_some() {
                    tracing::warn!(component = %shared.component, "replay buffer full, message dropped");
                }
                if endpoint_rx.changed().await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Owns one binding to a provider component.
///
/// Creating a connection spawns its background tasks, so it must happen
/// inside a tokio runtime. Dropping it stops the tasks and releases the
/// binding.
pub struct PluginConnection {
    shared: Arc<Shared>,
    tasks: Vec<JoinHandle<()>>,
}

impl fmt::Debug for PluginConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginConnection")
            .field("component", &self.shared.component)
            .field("state", &self.state())
            .field("pending", &self.shared.outbound.len())
            .finish_non_exhaustive()
    }
}

impl PluginConnection {
    /// Creates an unbound connection to `component`.
    ///
    /// `replay_capacity` bounds both the outbound buffer and the reply stream.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn new(
        component: ComponentIdentity,
        consumer: &ConsumerInfo,
        binder: Arc<dyn ServiceBinder>,
        replay_capacity: usize,
    ) -> Self {
        let capacity = replay_capacity.max(1);
        let (events_tx, events_rx) = EventSender::channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let (replies, _) = broadcast::channel(capacity);
        let (endpoint, _) = watch::channel(None);
        let (state, _) = watch::channel(ConnectionState::Unbound);

        let shared = Arc::new(Shared {
            component,
            extras: consumer.to_extras(),
            binder,
            bind_requested: AtomicBool::new(false),
            binding: Mutex::new(None),
            generation: AtomicU64::new(0),
            endpoint,
            state,
            outbound: ReplayBuffer::new(capacity),
            replies,
            events_tx,
            reply_tx,
            counters: Counters::default(),
        });

        let tasks = vec![
            tokio::spawn(run_events(Arc::clone(&shared), events_rx)),
            tokio::spawn(run_inbound(Arc::clone(&shared), reply_rx)),
            tokio::spawn(run_drain(Arc::clone(&shared))),
        ];

        Self { shared, tasks }
    }

    /// Creates a connection using the consumer identity and replay capacity of `config`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn with_config(
        component: ComponentIdentity,
        binder: Arc<dyn ServiceBinder>,
        config: &HostConfig,
    ) -> Self {
        Self::new(component, &config.consumer, binder, config.replay_capacity)
    }

    /// Requests a binding. Does nothing if one was already requested.
    ///
    /// # Errors
    ///
    /// Returns the binder's error if the request is rejected outright, for
    /// example [`Error::ServiceNotFound`]. The connection stays unbound and
    /// `bind` may be called again.
    pub fn bind(&self) -> Result<()> {
        if self.shared.bind_requested.swap(true, Ordering::SeqCst) {
            tracing::debug!(component = %self.shared.component, "bind already requested");
            return Ok(());
        }
        tracing::info!(component = %self.shared.component, "binding provider");
        self.shared.establish()
    }

    /// Releases the binding. Does nothing if the connection is not bound.
    ///
    /// Buffered messages are kept for the next binding.
    pub fn unbind(&self) {
        if !self.shared.bind_requested.swap(false, Ordering::SeqCst) {
            return;
        }
        tracing::info!(component = %self.shared.component, "unbinding provider");
        self.shared.release();
    }

    /// Queues `message` for delivery without waiting.
    pub fn send(&self, message: Message) {
        self.shared.counters.sent.fetch_add(1, Ordering::Relaxed);
        if let Some(evicted) = self.shared.outbound.push(message) {
            tracing::warn!(
                component = %self.shared.component,
                action = %evicted.header.action,
                id = evicted.id,
                "replay buffer full, dropped oldest message"
            );
        }
    }

    /// Sends `message` and waits for the reply carrying the same correlation id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequestTimeout`] if no matching reply arrives within
    /// `timeout`, or [`Error::ConnectionDied`] if the reply stream closes.
    pub async fn send_and_await(&self, message: Message, timeout: Duration) -> Result<Message> {
        let id = message.id;
        let mut replies = self.subscribe_replies();
        self.send(message);

        let matching = async {
            loop {
                match replies.recv().await {
                    Ok(reply) if reply.id == id => return Ok(reply),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(component = %self.shared.component, id, skipped, "reply stream lagged");
                    }
                    Err(RecvError::Closed) => {
                        return Err(Error::ConnectionDied {
                            component: self.shared.component.to_string(),
                        });
                    }
                }
            }
        };

        tokio::time::timeout(timeout, matching).await.unwrap_or_else(|_| {
            tracing::warn!(component = %self.shared.component, id, ?timeout, "request timed out");
            Err(Error::RequestTimeout {
                correlation_id: id,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })
        })
    }

    /// Subscribes to every provider reply received from now on.
    #[must_use]
    pub fn subscribe_replies(&self) -> broadcast::Receiver<Message> {
        self.shared.replies.subscribe()
    }

    /// Current binding state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Observes state transitions.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Returns `true` while messages are being delivered.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.state() == ConnectionState::Bound
    }

    /// Component this connection binds to.
    #[must_use]
    pub fn component(&self) -> &ComponentIdentity {
        &self.shared.component
    }

    /// Number of messages waiting for delivery.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.outbound.len()
    }

    /// Snapshot of the traffic counters.
    #[must_use]
    pub fn stats(&self) -> ConnectionStats {
        let counters = &self.shared.counters;
        ConnectionStats {
            sent: counters.sent.load(Ordering::Relaxed),
            delivered: counters.delivered.load(Ordering::Relaxed),
            dropped_on_overflow: self.shared.outbound.dropped(),
            replies_received: counters.replies_received.load(Ordering::Relaxed),
            replies_discarded: counters.replies_discarded.load(Ordering::Relaxed),
        }
    }
}

impl Drop for PluginConnection {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        self.unbind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LocalBinder;

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Unbound.to_string(), "unbound");
        assert_eq!(ConnectionState::Binding.to_string(), "binding");
        assert_eq!(ConnectionState::Bound.to_string(), "bound");
    }

    #[tokio::test]
    async fn test_bind_unknown_component_resets() {
        let binder = Arc::new(LocalBinder::new());
        let connection = PluginConnection::new(
            ComponentIdentity::new("org.example", "Missing"),
            &ConsumerInfo::default(),
            binder,
            8,
        );

        let err = connection.bind().unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(connection.state(), ConnectionState::Unbound);
        assert!(connection.bind().is_err(), "a failed bind can be retried");
    }

    #[tokio::test]
    async fn test_send_while_unbound_is_buffered() {
        let binder = Arc::new(LocalBinder::new());
        let connection = PluginConnection::new(
            ComponentIdentity::new("org.example", "Later"),
            &ConsumerInfo::default(),
            binder,
            2,
        );

        for id in 0..3 {
            connection.send(Message::request_to_service(
                nlp_plugin_core::Action::Preload,
                id,
                None,
            ));
        }

        assert_eq!(connection.pending(), 2);
        let stats = connection.stats();
        assert_eq!(stats.sent, 3);
        assert_eq!(stats.dropped_on_overflow, 1);
        assert_eq!(stats.delivered, 0);
    }

    #[tokio::test]
    async fn test_unbind_without_bind_is_noop() {
        let binder = Arc::new(LocalBinder::new());
        let connection = PluginConnection::new(
            ComponentIdentity::new("org.example", "Idle"),
            &ConsumerInfo::default(),
            binder,
            8,
        );
        connection.unbind();
        connection.unbind();
        assert_eq!(connection.state(), ConnectionState::Unbound);
    }
}
