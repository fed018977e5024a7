//! Error types for the NLP plugin system.
//!
//! Every crate in the workspace reports failures through [`Error`]. The
//! variants mirror the failure taxonomy a host observes: descriptor problems
//! found while indexing, binding failures, and request-level failures that
//! the remote provider facade turns into neutral fallback values.
//!
//! # Examples
//!
//! ```
//! use nlp_plugin_core::{Error, Result};
//!
//! fn require_id(id: &str) -> Result<()> {
//!     if id.is_empty() {
//!         return Err(Error::InvalidMetadata {
//!             reason: "plugin id cannot be empty".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//!
//! let err = require_id("").unwrap_err();
//! assert!(err.is_metadata_error());
//! ```

use thiserror::Error;

/// Main error type for the NLP plugin system.
#[derive(Error, Debug)]
pub enum Error {
    /// The provider declares no metadata descriptor.
    ///
    /// Recorded by the indexer when a service advertises the plugin
    /// interface but does not attach a descriptor, or the referenced
    /// descriptor cannot be read.
    #[error("No plugin metadata declared by {component}")]
    NoMetadata {
        /// Component that was being indexed
        component: String,
    },

    /// The metadata descriptor exists but cannot be parsed.
    #[error("Invalid plugin metadata: {reason}")]
    InvalidMetadata {
        /// What is wrong with the descriptor
        reason: String,
    },

    /// The provider refused the binding (null binding).
    #[error("Connection refused by {component}")]
    ConnectionRefused {
        /// Component that refused the binding
        component: String,
    },

    /// The provider process or handler died while bound.
    #[error("Connection to {component} died")]
    ConnectionDied {
        /// Component whose binding died
        component: String,
    },

    /// No reply with the awaited correlation id arrived in time.
    #[error("Request {correlation_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// Correlation id of the unanswered request
        correlation_id: i32,
        /// Timeout that elapsed, in milliseconds
        timeout_ms: u64,
    },

    /// A reply arrived but its payload could not be decoded.
    #[error("Malformed reply to request {correlation_id}: {reason}")]
    MalformedReply {
        /// Correlation id of the request the reply answered
        correlation_id: i32,
        /// Decoding failure description
        reason: String,
    },

    /// The binder does not know the requested component.
    #[error("Service not found: {component}")]
    ServiceNotFound {
        /// Component that could not be resolved
        component: String,
    },

    /// A wire frame or header violated the envelope protocol.
    #[error("Protocol error: {message}")]
    ProtocolError {
        /// Description of the violation
        message: String,
    },

    /// Configuration error.
    ///
    /// Raised when host configuration is invalid or cannot be loaded.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Description of the serialization failure
        message: String,
        /// Underlying serde error
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Invalid argument error.
    ///
    /// Raised when CLI arguments or function parameters are invalid.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O failure talking to a plugin process or reading package files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if this error describes a missing or invalid descriptor.
    ///
    /// # Examples
    ///
    /// ```
    /// use nlp_plugin_core::Error;
    ///
    /// let err = Error::NoMetadata {
    ///     component: "org.example/Spell".to_string(),
    /// };
    /// assert!(err.is_metadata_error());
    /// ```
    #[must_use]
    pub const fn is_metadata_error(&self) -> bool {
        matches!(self, Self::NoMetadata { .. } | Self::InvalidMetadata { .. })
    }

    /// Returns `true` if this is a binding-level failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use nlp_plugin_core::Error;
    ///
    /// let err = Error::ConnectionDied {
    ///     component: "org.example/Spell".to_string(),
    /// };
    /// assert!(err.is_connection_error());
    /// ```
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionRefused { .. }
                | Self::ConnectionDied { .. }
                | Self::ServiceNotFound { .. }
        )
    }

    /// Returns `true` if this is a request timeout.
    ///
    /// # Examples
    ///
    /// ```
    /// use nlp_plugin_core::Error;
    ///
    /// let err = Error::RequestTimeout {
    ///     correlation_id: 7,
    ///     timeout_ms: 5000,
    /// };
    /// assert!(err.is_timeout());
    /// ```
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }

    /// Returns `true` if a reply arrived but could not be decoded.
    #[must_use]
    pub const fn is_malformed_reply(&self) -> bool {
        matches!(self, Self::MalformedReply { .. })
    }

    /// Returns `true` if this is a protocol violation.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(self, Self::ProtocolError { .. })
    }

    /// Returns `true` if this is a configuration error.
    ///
    /// # Examples
    ///
    /// ```
    /// use nlp_plugin_core::Error;
    ///
    /// let err = Error::ConfigError {
    ///     message: "replay capacity must be positive".to_string(),
    /// };
    /// assert!(err.is_config_error());
    /// ```
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigError { .. })
    }

    /// Returns `true` if this is a serialization error.
    #[must_use]
    pub const fn is_serialization_error(&self) -> bool {
        matches!(self, Self::SerializationError { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::SerializationError {
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// Result type alias for plugin operations.
///
/// # Examples
///
/// ```
/// use nlp_plugin_core::{Error, Result};
///
/// fn positive(value: i32) -> Result<i32> {
///     if value <= 0 {
///         return Err(Error::InvalidArgument("value must be positive".to_string()));
///     }
///     Ok(value)
/// }
///
/// assert!(positive(5).is_ok());
/// assert!(positive(-1).is_err());
/// ```
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_error_detection() {
        let err = Error::InvalidMetadata {
            reason: "missing id".to_string(),
        };
        assert!(err.is_metadata_error());
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_connection_error_detection() {
        for err in [
            Error::ConnectionRefused {
                component: "a/b".to_string(),
            },
            Error::ConnectionDied {
                component: "a/b".to_string(),
            },
            Error::ServiceNotFound {
                component: "a/b".to_string(),
            },
        ] {
            assert!(err.is_connection_error(), "{err}");
            assert!(!err.is_timeout());
        }
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::RequestTimeout {
            correlation_id: 42,
            timeout_ms: 5000,
        };
        let display = err.to_string();
        assert!(display.contains("42"));
        assert!(display.contains("5000ms"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_malformed_reply_detection() {
        let err = Error::MalformedReply {
            correlation_id: 3,
            reason: "expected object".to_string(),
        };
        assert!(err.is_malformed_reply());
        assert!(!err.is_protocol_error());
    }

    #[test]
    fn test_from_serde_json_error() {
        let source = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err = Error::from(source);
        assert!(err.is_serialization_error());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_from_io_error() {
        let err = Error::from(std::io::Error::other("pipe closed"));
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("pipe closed"));
    }
}
