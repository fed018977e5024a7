//! Plugin metadata descriptors.
//!
//! A provider ships a TOML descriptor next to its service declaration:
//!
//! ```toml
//! [plugin]
//! id = "org.example.latin"
//! version = "1.2.0"
//! title = "@string/title"
//! short_description = "Spelling and suggestions for Latin scripts"
//! maintainers = "Jane Doe <jane@example.org>"
//! license = "Apache-2.0"
//! settings_activity = "org.example.latin/SettingsActivity"
//!
//! [plugin.spelling]
//!
//! [plugin.suggestion]
//! ```
//!
//! The `[plugin]` table must come first and must carry `id`, `version`, and
//! `title`. `id` and `version` must be literals; every other value may name
//! a resource with an `@` prefix. Each nested table declares a feature.

use crate::resources::ResourceContext;
use nlp_plugin_core::{ComponentIdentity, Error, PluginId, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::{self, Write as _};

/// Capability a plugin declares in its descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Feature {
    /// Implements spell checking
    Spelling,
    /// Implements word suggestions
    Suggestion,
}

impl Feature {
    /// Descriptor table name of the feature.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spelling => "spelling",
            Self::Suggestion => "suggestion",
        }
    }

    fn from_table_name(name: &str) -> Option<Self> {
        match name {
            "spelling" => Some(Self::Spelling),
            "suggestion" => Some(Self::Suggestion),
            _ => None,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor value that is either a literal or a resource reference.
///
/// # Examples
///
/// ```
/// use nlp_plugin_index::{LocalizedValue, MapResources};
///
/// let resources = MapResources::from_iter([("string/title", "Latin")]);
///
/// let title = LocalizedValue::parse("@string/title");
/// assert_eq!(title.get(&resources).as_deref(), Some("Latin"));
///
/// let literal = LocalizedValue::parse("Latin");
/// assert_eq!(literal.get(&resources).as_deref(), Some("Latin"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum LocalizedValue {
    /// Value used as written
    Literal(String),
    /// Resource id resolved on demand
    Resource(String),
}

impl LocalizedValue {
    /// Parses a raw descriptor string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        raw.strip_prefix('@').map_or_else(
            || Self::Literal(raw.to_string()),
            |id| Self::Resource(id.to_string()),
        )
    }

    /// Resolves the value.
    ///
    /// Returns `None` when a referenced resource does not exist.
    #[must_use]
    pub fn get(&self, resources: &dyn ResourceContext) -> Option<String> {
        match self {
            Self::Literal(value) => Some(value.clone()),
            Self::Resource(id) => resources.resolve(id),
        }
    }

    /// Resolves the value, falling back to its raw descriptor form.
    #[must_use]
    pub fn get_or_raw(&self, resources: &dyn ResourceContext) -> String {
        self.get(resources).unwrap_or_else(|| self.to_string())
    }

    /// Returns `true` for a resource reference.
    #[must_use]
    pub const fn is_resource(&self) -> bool {
        matches!(self, Self::Resource(_))
    }
}

impl fmt::Display for LocalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.write_str(value),
            Self::Resource(id) => write!(f, "@{id}"),
        }
    }
}

/// Parsed plugin descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginMetadata {
    id: PluginId,
    version: String,
    title: LocalizedValue,
    short_description: Option<LocalizedValue>,
    long_description: Option<LocalizedValue>,
    maintainers: Option<LocalizedValue>,
    homepage: Option<LocalizedValue>,
    issue_tracker: Option<LocalizedValue>,
    privacy_policy: Option<LocalizedValue>,
    license: Option<LocalizedValue>,
    settings_activity: Option<String>,
    features: BTreeSet<Feature>,
}

const PLUGIN_TABLE: &str = "plugin";

impl PluginMetadata {
    /// Parses the descriptor declared by `component`.
    ///
    /// # Errors
    ///
    /// - [`Error::NoMetadata`] if `descriptor` is `None`
    /// - [`Error::InvalidMetadata`] if the descriptor does not parse, the
    ///   `[plugin]` table is missing or not first, a required field is
    ///   missing, `id` or `version` is a resource reference, or a field has
    ///   the wrong type
    ///
    /// # Examples
    ///
    /// ```
    /// use nlp_plugin_core::ComponentIdentity;
    /// use nlp_plugin_index::{Feature, PluginMetadata};
    ///
    /// let component = ComponentIdentity::new("org.example.latin", "LatinService");
    /// let descriptor = r#"
    ///     [plugin]
    ///     id = "org.example.latin"
    ///     version = "1.0"
    ///     title = "Latin"
    ///
    ///     [plugin.spelling]
    /// "#;
    ///
    /// let metadata = PluginMetadata::parse(&component, Some(descriptor)).unwrap();
    /// assert_eq!(metadata.id().as_str(), "org.example.latin");
    /// assert!(metadata.has_feature(Feature::Spelling));
    /// assert!(!metadata.has_feature(Feature::Suggestion));
    ///
    /// assert!(PluginMetadata::parse(&component, None).is_err());
    /// ```
    pub fn parse(component: &ComponentIdentity, descriptor: Option<&str>) -> Result<Self> {
        let Some(descriptor) = descriptor else {
            return Err(Error::NoMetadata {
                component: component.to_string(),
            });
        };

        let document = descriptor
            .parse::<toml::Table>()
            .map_err(|e| invalid(format!("descriptor is not valid TOML: {e}")))?;

        // Tables keep document order.
        if document.keys().next().map(String::as_str) != Some(PLUGIN_TABLE) {
            return Err(invalid("first descriptor element must be [plugin]"));
        }

        let plugin = document
            .get(PLUGIN_TABLE)
            .and_then(toml::Value::as_table)
            .ok_or_else(|| invalid("missing [plugin] element"))?;

        let id = required_literal(plugin, "id")?;
        if id.is_empty() {
            return Err(invalid("plugin id cannot be empty"));
        }
        let version = required_literal(plugin, "version")?;
        let title = optional_value(plugin, "title")?
            .ok_or_else(|| invalid("missing required field 'title'"))?;

        let mut features = BTreeSet::new();
        for (key, value) in plugin {
            if !value.is_table() {
                continue;
            }
            match Feature::from_table_name(key) {
                Some(feature) => {
                    features.insert(feature);
                }
                None => tracing::debug!(%component, table = %key, "ignoring unknown feature table"),
            }
        }

        Ok(Self {
            id: PluginId::new(id),
            version,
            title,
            short_description: optional_value(plugin, "short_description")?,
            long_description: optional_value(plugin, "long_description")?,
            maintainers: optional_value(plugin, "maintainers")?,
            homepage: optional_value(plugin, "homepage")?,
            issue_tracker: optional_value(plugin, "issue_tracker")?,
            privacy_policy: optional_value(plugin, "privacy_policy")?,
            license: optional_value(plugin, "license")?,
            settings_activity: optional_string(plugin, "settings_activity")?,
            features,
        })
    }

    /// Declared plugin id.
    #[must_use]
    pub const fn id(&self) -> &PluginId {
        &self.id
    }

    /// Declared plugin version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Display title.
    #[must_use]
    pub const fn title(&self) -> &LocalizedValue {
        &self.title
    }

    /// One-line description.
    #[must_use]
    pub const fn short_description(&self) -> Option<&LocalizedValue> {
        self.short_description.as_ref()
    }

    /// Full description.
    #[must_use]
    pub const fn long_description(&self) -> Option<&LocalizedValue> {
        self.long_description.as_ref()
    }

    /// Maintainer list.
    #[must_use]
    pub const fn maintainers(&self) -> Option<&LocalizedValue> {
        self.maintainers.as_ref()
    }

    /// Project homepage.
    #[must_use]
    pub const fn homepage(&self) -> Option<&LocalizedValue> {
        self.homepage.as_ref()
    }

    /// Issue tracker location.
    #[must_use]
    pub const fn issue_tracker(&self) -> Option<&LocalizedValue> {
        self.issue_tracker.as_ref()
    }

    /// Privacy policy location.
    #[must_use]
    pub const fn privacy_policy(&self) -> Option<&LocalizedValue> {
        self.privacy_policy.as_ref()
    }

    /// License expression.
    #[must_use]
    pub const fn license(&self) -> Option<&LocalizedValue> {
        self.license.as_ref()
    }

    /// Component or route of the plugin's settings screen.
    #[must_use]
    pub fn settings_activity(&self) -> Option<&str> {
        self.settings_activity.as_deref()
    }

    /// Declared features.
    #[must_use]
    pub const fn features(&self) -> &BTreeSet<Feature> {
        &self.features
    }

    /// Returns `true` if the plugin declares `feature`.
    #[must_use]
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Multi-line, human-readable summary with resources resolved.
    #[must_use]
    pub fn describe(&self, resources: &dyn ResourceContext) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "id = {}", self.id);
        let _ = writeln!(out, "version = {}", self.version);
        let _ = writeln!(out, "title = {}", self.title.get_or_raw(resources));

        let optional = [
            ("short_description", &self.short_description),
            ("long_description", &self.long_description),
            ("maintainers", &self.maintainers),
            ("homepage", &self.homepage),
            ("issue_tracker", &self.issue_tracker),
            ("privacy_policy", &self.privacy_policy),
            ("license", &self.license),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                let _ = writeln!(out, "{name} = {}", value.get_or_raw(resources));
            }
        }
        if let Some(settings) = &self.settings_activity {
            let _ = writeln!(out, "settings_activity = {settings}");
        }

        let features: Vec<&str> = self.features.iter().copied().map(Feature::as_str).collect();
        let _ = write!(out, "features = [{}]", features.join(", "));
        out
    }
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidMetadata {
        reason: reason.into(),
    }
}

fn optional_string(table: &toml::Table, key: &str) -> Result<Option<String>> {
    match table.get(key) {
        None => Ok(None),
        Some(toml::Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(invalid(format!(
            "field '{key}' must be a string, found {}",
            other.type_str()
        ))),
    }
}

fn optional_value(table: &toml::Table, key: &str) -> Result<Option<LocalizedValue>> {
    Ok(optional_string(table, key)?.map(|raw| LocalizedValue::parse(&raw)))
}

fn required_literal(table: &toml::Table, key: &str) -> Result<String> {
    let raw = optional_string(table, key)?
        .ok_or_else(|| invalid(format!("missing required field '{key}'")))?;
    if raw.starts_with('@') {
        return Err(invalid(format!("field '{key}' must be a literal, found '{raw}'")));
    }
    Ok(raw)
}
