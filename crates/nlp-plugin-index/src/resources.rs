//! Localizable resources a package exposes to its descriptor.
//!
//! Descriptor values prefixed with `@` name a resource instead of holding a
//! literal. Packages ship their resources as TOML where nested tables form
//! the id path: `@string/title` resolves `[string] title = "..."`.

use nlp_plugin_core::{Error, Result};
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;

/// Resolves resource ids to strings.
pub trait ResourceContext: Send + Sync + Debug {
    /// Returns the resource named `id`, without the `@` prefix.
    fn resolve(&self, id: &str) -> Option<String>;
}

/// Context without any resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyResources;

impl ResourceContext for EmptyResources {
    fn resolve(&self, _id: &str) -> Option<String> {
        None
    }
}

/// In-memory resources keyed by full id.
///
/// # Examples
///
/// ```
/// use nlp_plugin_index::{MapResources, ResourceContext};
///
/// let resources = MapResources::from_iter([("string/title", "Latin")]);
/// assert_eq!(resources.resolve("string/title").as_deref(), Some("Latin"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapResources(HashMap<String, String>);

impl MapResources {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a resource.
    pub fn insert(&mut self, id: impl Into<String>, value: impl Into<String>) {
        self.0.insert(id.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapResources {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl ResourceContext for MapResources {
    fn resolve(&self, id: &str) -> Option<String> {
        self.0.get(id).cloned()
    }
}

/// Resources read from a package's `resources.toml`.
///
/// # Examples
///
/// ```
/// use nlp_plugin_index::{ResourceContext, TomlResources};
///
/// let resources = TomlResources::parse("[string]\ntitle = \"Latin\"\n").unwrap();
/// assert_eq!(resources.resolve("string/title").as_deref(), Some("Latin"));
/// assert_eq!(resources.resolve("string/missing"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TomlResources {
    table: toml::Table,
}

impl TomlResources {
    /// Parses a resources document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMetadata`] if the document is not valid TOML.
    pub fn parse(source: &str) -> Result<Self> {
        let table = source.parse::<toml::Table>().map_err(|e| Error::InvalidMetadata {
            reason: format!("invalid resources file: {e}"),
        })?;
        Ok(Self { table })
    }

    /// Reads and parses a resources file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or
    /// [`Error::InvalidMetadata`] if it does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }
}

impl ResourceContext for TomlResources {
    fn resolve(&self, id: &str) -> Option<String> {
        let mut segments = id.split('/');
        let mut value = self.table.get(segments.next()?)?;
        for segment in segments {
            value = value.as_table()?.get(segment)?;
        }
        match value {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Integer(i) => Some(i.to_string()),
            toml::Value::Float(f) => Some(f.to_string()),
            toml::Value::Boolean(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_resources_nested_lookup() {
        let resources = TomlResources::parse(
            r#"
            [string]
            title = "Latin"

            [string.description]
            short = "Spelling for Latin script languages"

            [integer]
            version = 3
            "#,
        )
        .unwrap();

        assert_eq!(resources.resolve("string/title").as_deref(), Some("Latin"));
        assert_eq!(
            resources.resolve("string/description/short").as_deref(),
            Some("Spelling for Latin script languages")
        );
        assert_eq!(resources.resolve("integer/version").as_deref(), Some("3"));
        assert_eq!(resources.resolve("string/description"), None);
        assert_eq!(resources.resolve("string/title/extra"), None);
        assert_eq!(resources.resolve(""), None);
    }

    #[test]
    fn test_toml_resources_rejects_garbage() {
        let err = TomlResources::parse("[string").unwrap_err();
        assert!(err.is_metadata_error());
    }

    #[test]
    fn test_empty_resources() {
        assert_eq!(EmptyResources.resolve("string/title"), None);
    }
}
