//! Core types, provider contracts, and errors for out-of-process NLP plugins.
//!
//! A host (an input method) discovers spelling and suggestion providers
//! installed as separate packages and talks to them over a message-passing
//! binding. This crate holds what both sides share:
//!
//! - The message envelope and wire frame ([`message`])
//! - Request and result payloads ([`SuggestionRequest`], [`SpellingResult`], ...)
//! - Provider contracts ([`traits`])
//! - Host configuration ([`HostConfig`])
//! - The error taxonomy ([`Error`])
//!
//! # Examples
//!
//! ```
//! use nlp_plugin_core::message::{Action, Message};
//! use nlp_plugin_core::{SuggestionRequest, EditorContent, SuggestionRequestFlags};
//!
//! let request = SuggestionRequest::from_content(
//!     0,
//!     &EditorContent::word("helo"),
//!     SuggestionRequestFlags::default(),
//! );
//! let payload = nlp_plugin_core::message::encode_payload(&request).unwrap();
//! let message = Message::request_to_service(Action::Spell, 1, Some(payload));
//! assert!(message.is_consumer_request());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod config;
mod error;
pub mod message;
pub mod traits;
mod types;

pub use config::{HostConfig, HostConfigBuilder};
pub use error::{Error, Result};
pub use message::{Action, Frame, Message, MessageHeader, MessageType, Source};
pub use traits::{FallbackProvider, NlpProvider, SpellingProvider, SuggestionProvider};
pub use types::{
    BindExtras, CandidateFeedback, ComponentIdentity, ConsumerInfo, EditorContent, PluginId,
    SpellingResult, Subtype, SuggestionCandidate, SuggestionRequest, SuggestionRequestFlags,
};

/// Interface name a service advertises to be discovered as a plugin.
pub const SERVICE_INTERFACE: &str = "nlp.plugin.PluginService";

/// Service metadata key whose value names the plugin descriptor.
pub const SERVICE_METADATA: &str = "nlp.plugin.flp";

/// Bind extra carrying the consumer package name.
pub const CONSUMER_PACKAGE_NAME: &str = "nlp.plugin.CONSUMER_PACKAGE_NAME";

/// Bind extra carrying the consumer version code.
pub const CONSUMER_VERSION_CODE: &str = "nlp.plugin.CONSUMER_VERSION_CODE";

/// Bind extra carrying the consumer version name.
pub const CONSUMER_VERSION_NAME: &str = "nlp.plugin.CONSUMER_VERSION_NAME";

/// All consumer identity keys, in the order providers read them.
pub const CONSUMER_EXTRAS: [&str; 3] = [
    CONSUMER_PACKAGE_NAME,
    CONSUMER_VERSION_CODE,
    CONSUMER_VERSION_NAME,
];
