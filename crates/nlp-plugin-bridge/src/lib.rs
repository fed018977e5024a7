//! NLP Bridge: talks to out-of-process spelling and suggestion providers.
//!
//! This crate is the host side of the plugin protocol. It provides:
//!
//! - A transport seam ([`ServiceBinder`], [`Binding`], [`ServiceEndpoint`])
//!   with an in-process [`LocalBinder`] and a child-process [`ProcessBinder`]
//! - [`PluginConnection`]: one binding, a bounded [`ReplayBuffer`] for
//!   outbound messages and a broadcast stream of replies
//! - [`RemoteProvider`]: the provider contracts from `nlp-plugin-core`
//!   implemented as timed request/reply round trips
//! - [`ProviderPool`]: one provider per valid catalog entry, kept in sync
//!   with the indexer
//!
//! # Architecture
//!
//! Messages are never sent directly. They are queued, and a single drain
//! task per connection delivers them in order once the provider is bound.
//! Replies arrive on a shared stream and each waiting call picks out its
//! own correlation id. A provider that crashes is rebound transparently; a
//! provider that refuses the binding stays unbound and its calls time out
//! to neutral answers.
//!
//! # Examples
//!
//! ```no_run
//! use nlp_plugin_bridge::{ProcessBinder, RemoteProvider};
//! use nlp_plugin_core::{ComponentIdentity, HostConfig, NlpProvider, SpellingProvider};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let component = ComponentIdentity::new("org.example.latin", "LatinService");
//! let binder = Arc::new(ProcessBinder::new());
//! binder.register(component.clone(), "/opt/latin/bin/latin-provider");
//!
//! let provider = RemoteProvider::new(component, binder, &HostConfig::default());
//! provider.create().await;
//!
//! let result = provider.spell(0, "helo", &[], &[], Default::default()).await;
//! println!("typo: {}, suggestions: {:?}", result.looks_like_typo, result.suggestions);
//!
//! provider.destroy().await;
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod connection;
mod pool;
mod provider;
mod replay;
pub mod transport;

pub use connection::{ConnectionState, ConnectionStats, PluginConnection};
pub use pool::{ProviderPool, ReconcileSummary};
pub use provider::RemoteProvider;
pub use replay::ReplayBuffer;
pub use transport::{
    BindRequest, BindableService, Binding, ConnectionEvent, EventReceiver, EventSender, LocalBinder,
    MessageSender, ProcessBinder, ServiceBinder, ServiceEndpoint,
};
