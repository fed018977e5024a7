//! Shared helpers for bridge integration tests.

#![allow(dead_code)]

use nlp_plugin_bridge::{
    BindRequest, Binding, EventSender, MessageSender, ServiceBinder, ServiceEndpoint,
};
use nlp_plugin_core::{BindExtras, Error, Message, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Binder that records requests and lets the test drive lifecycle events.
#[derive(Debug, Default)]
pub struct ScriptedBinder {
    requests: Mutex<Vec<BindRequest>>,
    unbinds: Arc<AtomicUsize>,
}

impl ScriptedBinder {
    pub fn binds(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn unbinds(&self) -> usize {
        self.unbinds.load(Ordering::SeqCst)
    }

    /// Event channel of the most recent bind request.
    pub fn events(&self) -> EventSender {
        self.requests.lock().unwrap().last().expect("no bind request").events.clone()
    }

    /// Reply channel of the most recent bind request.
    pub fn reply_to(&self) -> MessageSender {
        self.requests.lock().unwrap().last().expect("no bind request").reply_to.clone()
    }

    /// Extras of the most recent bind request.
    pub fn extras(&self) -> BindExtras {
        self.requests.lock().unwrap().last().expect("no bind request").extras.clone()
    }
}

impl ServiceBinder for ScriptedBinder {
    fn bind(&self, request: BindRequest) -> Result<Box<dyn Binding>> {
        self.requests.lock().unwrap().push(request);
        Ok(Box::new(ScriptedBinding {
            unbinds: Arc::clone(&self.unbinds),
            released: false,
        }))
    }
}

#[derive(Debug)]
struct ScriptedBinding {
    unbinds: Arc<AtomicUsize>,
    released: bool,
}

impl Binding for ScriptedBinding {
    fn unbind(&mut self) {
        if !self.released {
            self.released = true;
            self.unbinds.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug)]
struct ChannelEndpoint {
    tx: mpsc::UnboundedSender<Message>,
}

impl ServiceEndpoint for ChannelEndpoint {
    fn send(&self, message: Message) -> Result<()> {
        self.tx.send(message).map_err(|_| Error::ConnectionDied {
            component: "test".into(),
        })
    }
}

/// Endpoint whose deliveries can be read from the returned receiver.
pub fn channel_endpoint() -> (Arc<dyn ServiceEndpoint>, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelEndpoint { tx }), rx)
}

/// Waits until `condition` holds, failing the test after a second.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Receives the next delivered message, failing the test after a second.
pub async fn delivered(rx: &mut mpsc::UnboundedReceiver<Message>) -> Message {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("nothing delivered in time")
        .expect("endpoint closed")
}
