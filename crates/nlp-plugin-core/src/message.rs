//! Message envelope shared by consumers and providers.
//!
//! Every message carries a 32-bit header word packing three tags:
//!
//! | bits   | tag      | values                               |
//! |--------|----------|--------------------------------------|
//! | 0..4   | source   | [`Source`]                           |
//! | 4..8   | type     | [`MessageType`]                      |
//! | 8..16  | action   | [`Action`]                           |
//!
//! [`encode`] and [`decode`] work on raw tag values and mask out-of-range
//! input. [`MessageHeader`] is the typed view. On the wire a message travels
//! as a [`Frame`], one JSON object per line.
//!
//! # Examples
//!
//! ```
//! use nlp_plugin_core::message::{self, Action, Message, MessageType, Source};
//!
//! let word = message::encode(2, 1, 3);
//! assert_eq!(message::decode(word), (2, 1, 3));
//!
//! let request = Message::request_to_service(Action::Suggest, 7, Some("{}".to_string()));
//! assert_eq!(request.header.source, Source::Consumer);
//! assert_eq!(request.header.kind, MessageType::Request);
//! ```

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

const SOURCE_MASK: u32 = 0x0F;
const TYPE_MASK: u32 = 0x0F;
const ACTION_MASK: u32 = 0xFF;
const TYPE_SHIFT: u32 = 4;
const ACTION_SHIFT: u32 = 8;

/// Packs raw tag values into a header word.
///
/// Values wider than their field are masked, never rejected.
#[must_use]
pub const fn encode(source: u8, kind: u8, action: u8) -> u32 {
    (source as u32 & SOURCE_MASK)
        | ((kind as u32 & TYPE_MASK) << TYPE_SHIFT)
        | ((action as u32 & ACTION_MASK) << ACTION_SHIFT)
}

/// Unpacks a header word into raw `(source, type, action)` values.
///
/// Bits above the action field are ignored.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn decode(word: u32) -> (u8, u8, u8) {
    (
        (word & SOURCE_MASK) as u8,
        ((word >> TYPE_SHIFT) & TYPE_MASK) as u8,
        ((word >> ACTION_SHIFT) & ACTION_MASK) as u8,
    )
}

/// Which side of the binding produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Source {
    /// The plugin provider
    Service = 1,
    /// The host that binds to providers
    Consumer = 2,
}

impl Source {
    /// Converts a raw tag value.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(Self::Service),
            2 => Some(Self::Consumer),
            _ => None,
        }
    }
}

/// Whether a message asks for work or answers a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Request
    Request = 1,
    /// Response
    Response = 2,
}

impl MessageType {
    /// Converts a raw tag value.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(Self::Request),
            2 => Some(Self::Response),
            _ => None,
        }
    }
}

/// Operation a message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Action {
    /// Warm up resources for a subtype. No reply.
    Preload = 1,
    /// Spell-check a word. Replied to.
    Spell = 2,
    /// Produce candidates for the current word. Replied to.
    Suggest = 3,
    /// The user committed a candidate. No reply.
    NotifySuggestionAccepted = 4,
    /// The user reverted an auto-committed candidate. No reply.
    NotifySuggestionReverted = 5,
    /// Forget a candidate. Replied to with a boolean.
    RemoveSuggestion = 6,
}

impl Action {
    /// Converts a raw tag value.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(Self::Preload),
            2 => Some(Self::Spell),
            3 => Some(Self::Suggest),
            4 => Some(Self::NotifySuggestionAccepted),
            5 => Some(Self::NotifySuggestionReverted),
            6 => Some(Self::RemoveSuggestion),
            _ => None,
        }
    }

    /// Returns `true` if the provider answers this action.
    #[must_use]
    pub const fn expects_reply(self) -> bool {
        matches!(self, Self::Spell | Self::Suggest | Self::RemoveSuggestion)
    }

    /// Stable lowercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Preload => "preload",
            Self::Spell => "spell",
            Self::Suggest => "suggest",
            Self::NotifySuggestionAccepted => "notify_suggestion_accepted",
            Self::NotifySuggestionReverted => "notify_suggestion_reverted",
            Self::RemoveSuggestion => "remove_suggestion",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of a header word.
///
/// # Examples
///
/// ```
/// use nlp_plugin_core::message::{Action, MessageHeader, MessageType, Source};
///
/// let header = MessageHeader::new(Source::Service, MessageType::Response, Action::Spell);
/// assert_eq!(MessageHeader::from_word(header.to_word()).unwrap(), header);
/// assert!(MessageHeader::from_word(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHeader {
    /// Producer side
    pub source: Source,
    /// Request or response
    pub kind: MessageType,
    /// Operation
    pub action: Action,
}

impl MessageHeader {
    /// Creates a header from typed tags.
    #[must_use]
    pub const fn new(source: Source, kind: MessageType, action: Action) -> Self {
        Self {
            source,
            kind,
            action,
        }
    }

    /// Packs the header into its wire word.
    #[must_use]
    pub const fn to_word(self) -> u32 {
        encode(self.source as u8, self.kind as u8, self.action as u8)
    }

    /// Parses a wire word.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolError`] if any tag is unknown.
    pub fn from_word(word: u32) -> Result<Self> {
        let (source, kind, action) = decode(word);
        let unknown = |tag: &str, value: u8| Error::ProtocolError {
            message: format!("unknown {tag} tag {value} in header {word:#010x}"),
        };
        Ok(Self {
            source: Source::from_bits(source).ok_or_else(|| unknown("source", source))?,
            kind: MessageType::from_bits(kind).ok_or_else(|| unknown("type", kind))?,
            action: Action::from_bits(action).ok_or_else(|| unknown("action", action))?,
        })
    }
}

/// A message exchanged over a binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Packed tags
    pub header: MessageHeader,
    /// Correlation id chosen by the requester and echoed in the reply
    pub id: i32,
    /// JSON payload, if the action carries one
    pub data: Option<String>,
}

impl Message {
    /// Creates a message from its parts.
    #[must_use]
    pub const fn new(header: MessageHeader, id: i32, data: Option<String>) -> Self {
        Self { header, id, data }
    }

    /// Consumer request addressed to a provider.
    #[must_use]
    pub const fn request_to_service(action: Action, id: i32, data: Option<String>) -> Self {
        Self::new(
            MessageHeader::new(Source::Consumer, MessageType::Request, action),
            id,
            data,
        )
    }

    /// Provider reply addressed to a consumer.
    #[must_use]
    pub const fn reply_to_consumer(action: Action, id: i32, data: Option<String>) -> Self {
        Self::new(
            MessageHeader::new(Source::Service, MessageType::Response, action),
            id,
            data,
        )
    }

    /// Provider request addressed to a consumer.
    #[must_use]
    pub const fn request_to_consumer(action: Action, id: i32, data: Option<String>) -> Self {
        Self::new(
            MessageHeader::new(Source::Service, MessageType::Request, action),
            id,
            data,
        )
    }

    /// Consumer reply addressed to a provider.
    #[must_use]
    pub const fn reply_to_service(action: Action, id: i32, data: Option<String>) -> Self {
        Self::new(
            MessageHeader::new(Source::Consumer, MessageType::Response, action),
            id,
            data,
        )
    }

    /// Returns `true` for a provider reply, the only kind a consumer accepts.
    #[must_use]
    pub fn is_service_response(&self) -> bool {
        self.header.source == Source::Service && self.header.kind == MessageType::Response
    }

    /// Returns `true` for a consumer request, the only kind a provider accepts.
    #[must_use]
    pub fn is_consumer_request(&self) -> bool {
        self.header.source == Source::Consumer && self.header.kind == MessageType::Request
    }

    /// Decodes the JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationError`] if the payload is absent or
    /// does not decode as `T`.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self
            .data
            .as_deref()
            .ok_or_else(|| Error::SerializationError {
                message: format!("{} message {} carries no payload", self.header.action, self.id),
                source: None,
            })?;
        Ok(serde_json::from_str(data)?)
    }

    /// Converts the message into its transport form.
    #[must_use]
    pub fn to_frame(&self) -> Frame {
        Frame::build(self.header.to_word(), self.id, self.data.clone())
    }

    /// Parses a transport frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolError`] if the header word carries unknown tags.
    pub fn from_frame(frame: Frame) -> Result<Self> {
        Ok(Self::new(
            MessageHeader::from_word(frame.what)?,
            frame.id,
            frame.data,
        ))
    }
}

/// Transport-native message: header word, correlation id, optional payload.
///
/// # Examples
///
/// ```
/// use nlp_plugin_core::message::Frame;
///
/// let frame = Frame::build(0x0312, 5, None);
/// let line = frame.to_line().unwrap();
/// assert_eq!(Frame::from_line(&line).unwrap(), frame);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Packed header word
    pub what: u32,
    /// Correlation id
    pub id: i32,
    /// JSON payload
    #[serde(default)]
    pub data: Option<String>,
}

impl Frame {
    /// Assembles a frame from its parts.
    #[must_use]
    pub const fn build(what: u32, id: i32, data: Option<String>) -> Self {
        Self { what, id, data }
    }

    /// Serializes the frame as a single JSON line without the terminator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationError`] if encoding fails.
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a frame from one JSON line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationError`] if the line is not a frame.
    pub fn from_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

/// First line a provider process writes after start-up.
///
/// `bound == false` is the process equivalent of a null binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindHandshake {
    /// Whether the provider accepted the consumer
    pub bound: bool,
}

/// Encodes a payload value as a JSON string.
///
/// # Errors
///
/// Returns [`Error::SerializationError`] if encoding fails.
pub fn encode_payload<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}
