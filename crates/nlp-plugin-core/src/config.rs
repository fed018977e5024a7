//! Host configuration.
//!
//! [`HostConfig`] controls how a host discovers and talks to plugins. It can
//! be built in code, through [`HostConfig::builder`], or loaded from a TOML
//! file:
//!
//! ```toml
//! request_timeout_ms = 5000
//! replay_capacity = 8
//! registry_dir = "/var/lib/nlp-plugin/packages"
//! rescan_interval_ms = 2000
//! allow_external_plugins = true
//!
//! [consumer]
//! package_name = "org.example.keyboard"
//! version_code = 12
//! version_name = "0.4.0"
//! ```
//!
//! Every key is optional; missing keys keep their defaults.
//!
//! # Examples
//!
//! ```
//! use nlp_plugin_core::HostConfig;
//! use std::time::Duration;
//!
//! let config = HostConfig::from_toml_str("request_timeout_ms = 250").unwrap();
//! assert_eq!(config.request_timeout, Duration::from_millis(250));
//! assert_eq!(config.replay_capacity, 8);
//! ```

use crate::{ConsumerInfo, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default time a facade waits for a reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of staged messages and buffered replies per connection.
pub const DEFAULT_REPLAY_CAPACITY: usize = 8;

/// Default poll interval of the package directory watcher.
pub const DEFAULT_RESCAN_INTERVAL: Duration = Duration::from_secs(2);

/// Host-side configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Identity sent to every provider on bind.
    pub consumer: ConsumerInfo,

    /// How long spell, suggest and remove requests wait for a reply.
    ///
    /// Default: 5 seconds
    pub request_timeout: Duration,

    /// Capacity of the outbound replay buffer and the reply stream.
    ///
    /// When more messages are staged before binding completes, the oldest
    /// are dropped.
    /// Default: 8
    pub replay_capacity: usize,

    /// Directory scanned for installed plugin packages.
    ///
    /// Default: `<data dir>/nlp-plugin/packages`
    pub registry_dir: PathBuf,

    /// How often the package directory is polled for changes.
    ///
    /// Default: 2 seconds
    pub rescan_interval: Duration,

    /// Whether plugins from packages other than the host's own are indexed.
    ///
    /// Default: true
    pub allow_external_plugins: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            consumer: ConsumerInfo::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            replay_capacity: DEFAULT_REPLAY_CAPACITY,
            registry_dir: default_registry_dir(),
            rescan_interval: DEFAULT_RESCAN_INTERVAL,
            allow_external_plugins: true,
        }
    }
}

/// On-disk form; durations are stored in milliseconds.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct HostConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    replay_capacity: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    registry_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rescan_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allow_external_plugins: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    consumer: Option<ConsumerInfo>,
}

impl HostConfig {
    /// Creates a builder starting from the defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use nlp_plugin_core::HostConfig;
    /// use std::time::Duration;
    ///
    /// let config = HostConfig::builder()
    ///     .request_timeout(Duration::from_millis(500))
    ///     .replay_capacity(16)
    ///     .build();
    /// assert_eq!(config.replay_capacity, 16);
    /// ```
    #[must_use]
    pub fn builder() -> HostConfigBuilder {
        HostConfigBuilder::new()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if:
    /// - Request timeout or rescan interval is zero
    /// - Replay capacity is zero
    /// - Registry directory path is empty
    /// - Consumer identity is incomplete
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| {
            Err(Error::ConfigError {
                message: message.to_string(),
            })
        };

        if self.request_timeout.is_zero() {
            return fail("request timeout must be greater than zero");
        }
        if self.rescan_interval.is_zero() {
            return fail("rescan interval must be greater than zero");
        }
        if self.replay_capacity == 0 {
            return fail("replay capacity must be greater than zero");
        }
        if self.registry_dir.as_os_str().is_empty() {
            return fail("registry directory path cannot be empty");
        }
        if self.consumer.package_name.is_empty() {
            return fail("consumer package name cannot be empty");
        }
        if self.consumer.version_code <= 0 {
            return fail("consumer version code must be positive");
        }
        Ok(())
    }

    /// Parses a TOML document, overlaying it on the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the document is malformed, has
    /// unknown keys, or fails [`validate`](Self::validate).
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: HostConfigFile = toml::from_str(source).map_err(|e| Error::ConfigError {
            message: format!("failed to parse configuration: {e}"),
        })?;

        let mut config = Self::default();
        if let Some(ms) = file.request_timeout_ms {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(capacity) = file.replay_capacity {
            config.replay_capacity = capacity;
        }
        if let Some(dir) = file.registry_dir {
            config.registry_dir = dir;
        }
        if let Some(ms) = file.rescan_interval_ms {
            config.rescan_interval = Duration::from_millis(ms);
        }
        if let Some(allow) = file.allow_external_plugins {
            config.allow_external_plugins = allow;
        }
        if let Some(consumer) = file.consumer {
            config.consumer = consumer;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Loads `path` if it exists, else returns the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file fails to load.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if encoding fails.
    pub fn to_toml_string(&self) -> Result<String> {
        let file = HostConfigFile {
            request_timeout_ms: Some(duration_ms(self.request_timeout)),
            replay_capacity: Some(self.replay_capacity),
            registry_dir: Some(self.registry_dir.clone()),
            rescan_interval_ms: Some(duration_ms(self.rescan_interval)),
            allow_external_plugins: Some(self.allow_external_plugins),
            consumer: Some(self.consumer.clone()),
        };
        toml::to_string_pretty(&file).map_err(|e| Error::ConfigError {
            message: format!("failed to encode configuration: {e}"),
        })
    }
}

/// Default location of the host configuration file.
///
/// Returns `<config dir>/nlp-plugin/config.toml`, or `None` when the platform
/// has no configuration directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("nlp-plugin").join("config.toml"))
}

fn default_registry_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("nlp-plugin")
        .join("packages")
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Builder for [`HostConfig`].
#[derive(Debug, Clone)]
pub struct HostConfigBuilder {
    config: HostConfig,
}

impl HostConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: HostConfig::default(),
        }
    }

    /// Sets the consumer identity.
    #[must_use]
    pub fn consumer(mut self, consumer: ConsumerInfo) -> Self {
        self.config.consumer = consumer;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Sets the replay capacity.
    #[must_use]
    pub const fn replay_capacity(mut self, capacity: usize) -> Self {
        self.config.replay_capacity = capacity;
        self
    }

    /// Sets the package registry directory.
    #[must_use]
    pub fn registry_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.registry_dir = dir.into();
        self
    }

    /// Sets the directory rescan interval.
    #[must_use]
    pub const fn rescan_interval(mut self, interval: Duration) -> Self {
        self.config.rescan_interval = interval;
        self
    }

    /// Allows or forbids plugins from foreign packages.
    #[must_use]
    pub const fn allow_external_plugins(mut self, allow: bool) -> Self {
        self.config.allow_external_plugins = allow;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> HostConfig {
        self.config
    }
}

impl Default for HostConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.replay_capacity, 8);
        assert!(config.allow_external_plugins);
        assert!(config.registry_dir.ends_with("nlp-plugin/packages"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = HostConfig::builder().replay_capacity(0).build();
        assert!(config.validate().unwrap_err().is_config_error());

        let config = HostConfig::builder().request_timeout(Duration::ZERO).build();
        assert!(config.validate().is_err());

        let config = HostConfig::builder().rescan_interval(Duration::ZERO).build();
        assert!(config.validate().is_err());

        let config = HostConfig::builder()
            .consumer(ConsumerInfo::new("org.example", 0, "1"))
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_overlays_defaults() {
        let config = HostConfig::from_toml_str(
            r#"
            rescan_interval_ms = 100
            allow_external_plugins = false

            [consumer]
            package_name = "org.example.keyboard"
            version_code = 3
            version_name = "3.0"
            "#,
        )
        .unwrap();

        assert_eq!(config.rescan_interval, Duration::from_millis(100));
        assert!(!config.allow_external_plugins);
        assert_eq!(config.consumer.version_code, 3);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = HostConfig::from_toml_str("request_timeout = 5").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_from_toml_validates() {
        assert!(HostConfig::from_toml_str("replay_capacity = 0").is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = HostConfig::builder()
            .registry_dir("/tmp/nlp-plugin")
            .request_timeout(Duration::from_millis(1500))
            .build();
        let rendered = config.to_toml_string().unwrap();
        assert_eq!(HostConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = HostConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, HostConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "replay_capacity = 3\n").unwrap();
        assert_eq!(HostConfig::load(&path).unwrap().replay_capacity, 3);
    }
}
