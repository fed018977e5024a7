//! Strong domain types shared by hosts and providers.
//!
//! Identifiers use the newtype pattern so a plugin id can never be passed
//! where a component name is expected. Request and result types are the JSON
//! payloads carried inside [`Message`](crate::Message) envelopes.
//!
//! # Examples
//!
//! ```
//! use nlp_plugin_core::{ComponentIdentity, PluginId};
//!
//! let component = ComponentIdentity::new("org.example.spell", "SpellService");
//! assert_eq!(component.to_string(), "org.example.spell/SpellService");
//!
//! let id = PluginId::new("org.example.spell");
//! assert_eq!(id.as_str(), "org.example.spell");
//! ```

use crate::{CONSUMER_PACKAGE_NAME, CONSUMER_VERSION_CODE, CONSUMER_VERSION_NAME, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Plugin identifier declared in a metadata descriptor.
///
/// # Examples
///
/// ```
/// use nlp_plugin_core::PluginId;
///
/// let id = PluginId::new("org.example.latin");
/// assert_eq!(id.to_string(), "org.example.latin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    /// Creates a new plugin identifier.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `PluginId` and returns the inner `String`.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PluginId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PluginId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Package-and-service pair uniquely naming a bindable service.
///
/// The textual form is `package/service`.
///
/// # Examples
///
/// ```
/// use nlp_plugin_core::ComponentIdentity;
///
/// let component: ComponentIdentity = "org.example.spell/SpellService".parse().unwrap();
/// assert_eq!(component.package(), "org.example.spell");
/// assert_eq!(component.service(), "SpellService");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentIdentity {
    package: String,
    service: String,
}

impl ComponentIdentity {
    /// Creates a component identity from its package and service names.
    #[must_use]
    pub fn new(package: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            service: service.into(),
        }
    }

    /// Returns the owning package name.
    #[inline]
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Returns the service name within the package.
    #[inline]
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl fmt::Display for ComponentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.service)
    }
}

impl FromStr for ComponentIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((package, service)) if !package.is_empty() && !service.is_empty() => {
                Ok(Self::new(package, service))
            }
            _ => Err(Error::InvalidArgument(format!(
                "invalid component '{s}' (expected: package/service)"
            ))),
        }
    }
}

/// Key/value extras attached to a bind request.
///
/// Out-of-process transports carry extras as environment variables; see
/// [`BindExtras::env_var_name`] for the key mapping.
///
/// # Examples
///
/// ```
/// use nlp_plugin_core::BindExtras;
///
/// let mut extras = BindExtras::new();
/// extras.insert("nlp.plugin.CONSUMER_VERSION_CODE", "3");
/// assert_eq!(extras.get("nlp.plugin.CONSUMER_VERSION_CODE"), Some("3"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindExtras(BTreeMap<String, String>);

impl BindExtras {
    /// Creates an empty set of extras.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an extra.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns `true` if no extras are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over all extras in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Maps an extras key to the environment variable carrying it.
    ///
    /// # Examples
    ///
    /// ```
    /// use nlp_plugin_core::BindExtras;
    ///
    /// assert_eq!(
    ///     BindExtras::env_var_name("nlp.plugin.CONSUMER_PACKAGE_NAME"),
    ///     "NLP_PLUGIN_CONSUMER_PACKAGE_NAME"
    /// );
    /// ```
    #[must_use]
    pub fn env_var_name(key: &str) -> String {
        key.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect()
    }

    /// Returns the extras as `(variable, value)` pairs for a child process.
    #[must_use]
    pub fn to_env_vars(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (Self::env_var_name(k), v.clone()))
            .collect()
    }

    /// Rebuilds extras for the given keys from environment variables.
    ///
    /// Keys whose variable is absent are skipped.
    #[must_use]
    pub fn from_env_vars<I>(vars: I, keys: &[&str]) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: BTreeMap<String, String> = vars.into_iter().collect();
        let mut extras = Self::new();
        for key in keys {
            if let Some(value) = vars.get(&Self::env_var_name(key)) {
                extras.insert(*key, value.clone());
            }
        }
        extras
    }
}

/// Identity a consumer presents when binding to a provider.
///
/// # Examples
///
/// ```
/// use nlp_plugin_core::ConsumerInfo;
///
/// let consumer = ConsumerInfo::new("org.example.keyboard", 12, "0.4.0");
/// let extras = consumer.to_extras();
/// assert_eq!(ConsumerInfo::from_extras(&extras), Some(consumer));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerInfo {
    /// Consumer package name
    pub package_name: String,
    /// Consumer version code, always positive
    pub version_code: i64,
    /// Human-readable consumer version
    pub version_name: String,
}

impl ConsumerInfo {
    /// Creates consumer information.
    #[must_use]
    pub fn new(
        package_name: impl Into<String>,
        version_code: i64,
        version_name: impl Into<String>,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            version_code,
            version_name: version_name.into(),
        }
    }

    /// Encodes the consumer identity as bind extras.
    #[must_use]
    pub fn to_extras(&self) -> BindExtras {
        let mut extras = BindExtras::new();
        extras.insert(CONSUMER_PACKAGE_NAME, self.package_name.clone());
        extras.insert(CONSUMER_VERSION_CODE, self.version_code.to_string());
        extras.insert(CONSUMER_VERSION_NAME, self.version_name.clone());
        extras
    }

    /// Decodes the consumer identity from bind extras.
    ///
    /// Returns `None` unless the package name is non-empty, the version code
    /// parses to a positive number, and the version name is present.
    #[must_use]
    pub fn from_extras(extras: &BindExtras) -> Option<Self> {
        let package_name = extras.get(CONSUMER_PACKAGE_NAME).filter(|s| !s.is_empty())?;
        let version_code = extras
            .get(CONSUMER_VERSION_CODE)?
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|code| *code > 0)?;
        let version_name = extras.get(CONSUMER_VERSION_NAME)?;
        Some(Self::new(package_name, version_code, version_name))
    }
}

impl Default for ConsumerInfo {
    fn default() -> Self {
        Self::new("nlp.plugin.host", 1, env!("CARGO_PKG_VERSION"))
    }
}

/// Input method subtype a provider should prepare for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtype {
    /// Host-assigned subtype id
    pub id: i64,
    /// Primary locale tag, e.g. `en-US`
    pub primary_locale: String,
    /// Additional locale tags
    #[serde(default)]
    pub secondary_locales: Vec<String>,
}

impl Subtype {
    /// Subtype id used when no real subtype is selected.
    pub const FALLBACK_ID: i64 = -1;

    /// Creates a subtype with a single locale.
    #[must_use]
    pub fn new(id: i64, primary_locale: impl Into<String>) -> Self {
        Self {
            id,
            primary_locale: primary_locale.into(),
            secondary_locales: Vec::new(),
        }
    }

    /// Returns `true` for the placeholder subtype.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        self.id == Self::FALLBACK_ID
    }
}

/// Options attached to spelling and suggestion requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequestFlags {
    /// Upper bound on returned candidates
    pub max_suggestion_count: u16,
    /// Whether possibly offensive words may be returned
    pub allow_possibly_offensive: bool,
    /// Whether the editor is in an incognito session
    pub is_private_session: bool,
}

impl Default for SuggestionRequestFlags {
    fn default() -> Self {
        Self {
            max_suggestion_count: 8,
            allow_possibly_offensive: false,
            is_private_session: false,
        }
    }
}

/// Text surrounding the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorContent {
    /// Word being composed
    pub current_word: String,
    /// Words before the current word, nearest last
    #[serde(default)]
    pub preceding_words: Vec<String>,
    /// Words after the current word
    #[serde(default)]
    pub following_words: Vec<String>,
}

impl EditorContent {
    /// Creates editor content for a lone word.
    #[must_use]
    pub fn word(current_word: impl Into<String>) -> Self {
        Self {
            current_word: current_word.into(),
            ..Self::default()
        }
    }
}

/// Payload of spell and suggest requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    /// Subtype the request is made for
    pub subtype_id: i64,
    /// Word under examination
    pub word: String,
    /// Words before `word`
    #[serde(default)]
    pub preceding_words: Vec<String>,
    /// Words after `word`
    #[serde(default)]
    pub following_words: Vec<String>,
    /// Request options
    #[serde(default)]
    pub flags: SuggestionRequestFlags,
}

impl SuggestionRequest {
    /// Builds a request from editor content.
    #[must_use]
    pub fn from_content(
        subtype_id: i64,
        content: &EditorContent,
        flags: SuggestionRequestFlags,
    ) -> Self {
        Self {
            subtype_id,
            word: content.current_word.clone(),
            preceding_words: content.preceding_words.clone(),
            following_words: content.following_words.clone(),
            flags,
        }
    }

    /// Returns the editor content described by this request.
    #[must_use]
    pub fn content(&self) -> EditorContent {
        EditorContent {
            current_word: self.word.clone(),
            preceding_words: self.preceding_words.clone(),
            following_words: self.following_words.clone(),
        }
    }
}

/// Outcome of a spell check.
///
/// # Examples
///
/// ```
/// use nlp_plugin_core::SpellingResult;
///
/// let result = SpellingResult::typo(vec!["hello".to_string()], true);
/// assert!(result.looks_like_typo);
/// assert!(!SpellingResult::unspecified().has_information());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellingResult {
    /// The word is in the provider's dictionary
    pub is_in_dictionary: bool,
    /// The word looks like a misspelling
    pub looks_like_typo: bool,
    /// The suggestions are confident enough to offer prominently
    pub has_recommended_suggestions: bool,
    /// Replacement suggestions, best first
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl SpellingResult {
    /// Neutral result carrying no information.
    #[must_use]
    pub fn unspecified() -> Self {
        Self::default()
    }

    /// Result for a word found in the dictionary.
    #[must_use]
    pub fn valid_word() -> Self {
        Self {
            is_in_dictionary: true,
            ..Self::default()
        }
    }

    /// Result for a probable misspelling.
    #[must_use]
    pub fn typo(suggestions: Vec<String>, recommended: bool) -> Self {
        Self {
            is_in_dictionary: false,
            looks_like_typo: true,
            has_recommended_suggestions: recommended && !suggestions.is_empty(),
            suggestions,
        }
    }

    /// Returns `false` for the neutral result.
    #[must_use]
    pub fn has_information(&self) -> bool {
        self.is_in_dictionary || self.looks_like_typo || !self.suggestions.is_empty()
    }
}

/// A single completion or correction candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionCandidate {
    /// Text inserted when the candidate is chosen
    pub text: String,
    /// Optional annotation shown next to the text
    #[serde(default)]
    pub secondary_text: Option<String>,
    /// Confidence in `[0.0, 1.0]`
    pub confidence: f64,
    /// The candidate may be committed without explicit selection
    #[serde(default)]
    pub is_eligible_for_auto_commit: bool,
    /// The user may ask the provider to forget this candidate
    #[serde(default)]
    pub is_eligible_for_user_removal: bool,
}

impl SuggestionCandidate {
    /// Creates a plain word candidate.
    #[must_use]
    pub fn word(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            secondary_text: None,
            confidence: confidence.clamp(0.0, 1.0),
            is_eligible_for_auto_commit: false,
            is_eligible_for_user_removal: true,
        }
    }
}

/// Payload of the candidate feedback actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateFeedback {
    /// Subtype the candidate was produced for
    pub subtype_id: i64,
    /// The candidate concerned
    pub candidate: SuggestionCandidate,
}
