//! Provider side of the NLP plugin protocol.
//!
//! A provider executable hosts one spelling and/or suggestion implementation
//! and serves the consumer that started it. This crate provides:
//!
//! - [`ProviderHandlers`]: the capability table of a provider
//! - [`Dispatcher`]: decodes consumer requests and invokes the table
//! - [`PluginService`]: accepts bindings and runs every request on one
//!   handler loop
//! - [`serve_stdio`]: the stdin/stdout transport used by provider executables
//! - [`WordListProvider`]: a small dictionary provider used by the demo binary
//!
//! # Examples
//!
//! ```no_run
//! use nlp_plugin_service::{PluginService, ProviderHandlers, WordListProvider, serve_stdio};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> nlp_plugin_core::Result<()> {
//! let provider = Arc::new(WordListProvider::builtin());
//! let service = PluginService::start(ProviderHandlers::full(provider));
//! serve_stdio(&service).await?;
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! The same service can be registered with an in-process
//! [`LocalBinder`](nlp_plugin_bridge::LocalBinder), which is how hosts embed
//! providers without spawning a process.

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod demo;
mod dispatcher;
mod service;
mod stdio;

pub use demo::WordListProvider;
pub use dispatcher::{DispatchOutcome, Dispatcher, ProviderHandlers};
pub use service::PluginService;
pub use stdio::{serve, serve_stdio};
