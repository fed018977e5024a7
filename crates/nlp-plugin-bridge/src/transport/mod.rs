//! Transport seam between a connection and a provider.
//!
//! A [`ServiceBinder`] turns a [`BindRequest`] into a live binding. The
//! binder reports progress asynchronously through the request's event
//! channel:
//!
//! ```text
//! bind() ──► Connected(endpoint) ──► Disconnected ──► Connected(endpoint) ...
//!        └─► NullBinding                         └─► BindingDied
//! ```
//!
//! Replies from the provider arrive on the request's `reply_to` channel.
//! Two binders ship with the crate: [`LocalBinder`] for in-process services
//! and [`ProcessBinder`] for provider executables.

mod local;
mod process;

pub use local::LocalBinder;
pub use process::ProcessBinder;

use nlp_plugin_core::{BindExtras, ComponentIdentity, ConsumerInfo, Message, Result};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;

/// Channel delivering messages to their receiver.
pub type MessageSender = mpsc::UnboundedSender<Message>;

/// Receiving half of an event channel. Each event carries the generation
/// of the binding that produced it.
pub type EventReceiver = mpsc::UnboundedReceiver<(u64, ConnectionEvent)>;

/// Delivers the lifecycle events of one binding.
///
/// Events are tagged with the sender's binding generation, so a receiver
/// shared by successive bindings can tell them apart.
///
/// # Examples
///
/// ```
/// use nlp_plugin_bridge::{ConnectionEvent, EventSender};
///
/// let (events, mut rx) = EventSender::channel();
/// events.with_generation(3).send(ConnectionEvent::Disconnected).unwrap();
///
/// let (generation, event) = rx.try_recv().unwrap();
/// assert_eq!(generation, 3);
/// assert_eq!(event.name(), "disconnected");
/// ```
#[derive(Debug, Clone)]
pub struct EventSender {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, ConnectionEvent)>,
}

impl EventSender {
    /// Creates an event channel whose sender tags events with generation 0.
    #[must_use]
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { generation: 0, tx }, rx)
    }

    /// Sender on the same channel tagging events with `generation`.
    #[must_use]
    pub fn with_generation(&self, generation: u64) -> Self {
        Self {
            generation,
            tx: self.tx.clone(),
        }
    }

    /// Binding generation attached to sent events.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Sends `event` without waiting.
    ///
    /// # Errors
    ///
    /// Returns the event if the receiver is gone.
    pub fn send(&self, event: ConnectionEvent) -> std::result::Result<(), SendError<ConnectionEvent>> {
        self.tx
            .send((self.generation, event))
            .map_err(|SendError((_, event))| SendError(event))
    }
}

/// Binding lifecycle notification.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// The provider accepted the binding and can receive messages.
    Connected(Arc<dyn ServiceEndpoint>),
    /// The provider went away; the binding may reconnect on its own.
    Disconnected,
    /// The binding is permanently broken and must be re-established.
    BindingDied,
    /// The provider refused the binding.
    NullBinding,
}

impl ConnectionEvent {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::Disconnected => "disconnected",
            Self::BindingDied => "binding_died",
            Self::NullBinding => "null_binding",
        }
    }
}

/// Everything a binder needs to establish a binding.
#[derive(Debug)]
pub struct BindRequest {
    /// Service to bind
    pub component: ComponentIdentity,
    /// Extras handed to the provider, including the consumer identity
    pub extras: BindExtras,
    /// Lifecycle events go here
    pub events: EventSender,
    /// Provider replies go here
    pub reply_to: MessageSender,
}

impl BindRequest {
    /// Creates a request carrying `consumer` as extras.
    #[must_use]
    pub fn new(
        component: ComponentIdentity,
        consumer: &ConsumerInfo,
        events: EventSender,
        reply_to: MessageSender,
    ) -> Self {
        Self {
            component,
            extras: consumer.to_extras(),
            events,
            reply_to,
        }
    }
}

/// Sending half of a live binding.
pub trait ServiceEndpoint: Send + Sync + Debug {
    /// Hands `message` to the provider without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`nlp_plugin_core::Error::ConnectionDied`] if the provider is gone.
    fn send(&self, message: Message) -> Result<()>;
}

/// Handle keeping a binding alive.
pub trait Binding: Send + Debug {
    /// Releases the binding. Calling it again has no effect.
    fn unbind(&mut self);
}

/// Establishes bindings to services.
pub trait ServiceBinder: Send + Sync + Debug {
    /// Starts binding to `request.component`.
    ///
    /// Success means the request was accepted, not that the provider is
    /// connected; watch `request.events` for that.
    ///
    /// # Errors
    ///
    /// Returns [`nlp_plugin_core::Error::ServiceNotFound`] if the binder does
    /// not know the component, or an I/O error if it cannot be started.
    fn bind(&self, request: BindRequest) -> Result<Box<dyn Binding>>;
}

/// Provider-side entry point of an in-process service.
pub trait BindableService: Send + Sync + Debug {
    /// Accepts or refuses a consumer.
    ///
    /// Returning `None` refuses the binding. Replies to accepted messages
    /// are sent on `reply_to`.
    fn on_bind(&self, extras: &BindExtras, reply_to: MessageSender) -> Option<Arc<dyn ServiceEndpoint>>;

    /// Called when a consumer releases its binding.
    fn on_unbind(&self) {}
}
