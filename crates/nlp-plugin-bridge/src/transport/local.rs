//! In-process binder.

use super::{BindRequest, BindableService, Binding, ConnectionEvent, EventSender, ServiceBinder};
use nlp_plugin_core::{ComponentIdentity, Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

struct LiveBinding {
    id: u64,
    component: ComponentIdentity,
    events: EventSender,
}

type LiveBindings = Arc<Mutex<Vec<LiveBinding>>>;

/// Binds to services registered in the same process.
///
/// Besides normal binding, the binder can simulate provider failures with
/// [`kill`](Self::kill) and [`disconnect`](Self::disconnect).
///
/// # Examples
///
/// ```
/// use nlp_plugin_bridge::{BindRequest, EventSender, LocalBinder, ServiceBinder};
/// use nlp_plugin_core::{ComponentIdentity, ConsumerInfo};
/// use tokio::sync::mpsc;
///
/// let binder = LocalBinder::new();
/// let (events, _) = EventSender::channel();
/// let (replies, _) = mpsc::unbounded_channel();
/// let request = BindRequest::new(
///     ComponentIdentity::new("org.example", "Missing"),
///     &ConsumerInfo::default(),
///     events,
///     replies,
/// );
/// assert!(binder.bind(request).unwrap_err().is_connection_error());
/// ```
#[derive(Default)]
pub struct LocalBinder {
    services: RwLock<HashMap<ComponentIdentity, Arc<dyn BindableService>>>,
    live: LiveBindings,
    next_id: AtomicU64,
}

impl fmt::Debug for LocalBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let services = self.services.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("LocalBinder")
            .field("services", &services.keys().collect::<Vec<_>>())
            .field("live_bindings", &self.live.lock().unwrap_or_else(PoisonError::into_inner).len())
            .finish()
    }
}

impl LocalBinder {
    /// Creates a binder with no services.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `service` bindable as `component`.
    pub fn register(&self, component: ComponentIdentity, service: Arc<dyn BindableService>) {
        tracing::debug!(%component, "registering local service");
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(component, service);
    }

    /// Removes a service. Existing bindings stay open.
    pub fn unregister(&self, component: &ComponentIdentity) -> Option<Arc<dyn BindableService>> {
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(component)
    }

    /// Number of open bindings to `component`.
    #[must_use]
    pub fn live_bindings(&self, component: &ComponentIdentity) -> usize {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|b| &b.component == component)
            .count()
    }

    /// Reports [`ConnectionEvent::BindingDied`] to every binding of `component`.
    ///
    /// Returns the number of notified bindings.
    pub fn kill(&self, component: &ComponentIdentity) -> usize {
        self.notify(component, &ConnectionEvent::BindingDied)
    }

    /// Reports [`ConnectionEvent::Disconnected`] to every binding of `component`.
    ///
    /// Returns the number of notified bindings.
    pub fn disconnect(&self, component: &ComponentIdentity) -> usize {
        self.notify(component, &ConnectionEvent::Disconnected)
    }

    fn notify(&self, component: &ComponentIdentity, event: &ConnectionEvent) -> usize {
        let live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        live.iter()
            .filter(|b| &b.component == component)
            .filter(|b| b.events.send(event.clone()).is_ok())
            .count()
    }
}

impl ServiceBinder for LocalBinder {
    fn bind(&self, request: BindRequest) -> Result<Box<dyn Binding>> {
        let service = self
            .services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&request.component)
            .cloned()
            .ok_or_else(|| Error::ServiceNotFound {
                component: request.component.to_string(),
            })?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LiveBinding {
                id,
                component: request.component.clone(),
                events: request.events.clone(),
            });

        let event = match service.on_bind(&request.extras, request.reply_to) {
            Some(endpoint) => ConnectionEvent::Connected(endpoint),
            None => ConnectionEvent::NullBinding,
        };
        tracing::debug!(component = %request.component, event = event.name(), "local bind");
        let _ = request.events.send(event);

        Ok(Box::new(LocalBinding {
            id,
            service,
            live: Arc::clone(&self.live),
            released: false,
        }))
    }
}

struct LocalBinding {
    id: u64,
    service: Arc<dyn BindableService>,
    live: LiveBindings,
    released: bool,
}

impl fmt::Debug for LocalBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBinding")
            .field("id", &self.id)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl Binding for LocalBinding {
    fn unbind(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|b| b.id != self.id);
        self.service.on_unbind();
    }
}

impl Drop for LocalBinding {
    fn drop(&mut self) {
        self.unbind();
    }
}
