//! Output formatters for CLI commands.
//!
//! Every command renders a serializable report through [`format_output`], so
//! JSON, text, and pretty modes always carry the same information.

use crate::cli::OutputFormat;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

/// Format data according to the specified output format.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Examples
///
/// ```
/// use nlp_plugin_cli::OutputFormat;
/// use nlp_plugin_cli::formatters::format_output;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Report {
///     word: String,
///     in_dictionary: bool,
/// }
///
/// let report = Report { word: "hello".into(), in_dictionary: true };
///
/// let json = format_output(&report, OutputFormat::Json)?;
/// assert!(json.contains("\"word\": \"hello\""));
///
/// let text = format_output(&report, OutputFormat::Text)?;
/// assert_eq!(text, "in_dictionary=true\nword=hello");
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::format(data),
        OutputFormat::Text => text::format(data),
        OutputFormat::Pretty => pretty::format(data),
    }
}

/// JSON output formatting.
pub mod json {
    use super::{Result, Serialize};

    /// Format data as JSON with 2-space indentation.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }
}

/// Plain text output formatting.
///
/// One `path=value` line per scalar, keys sorted, nested keys joined by `.`
/// and array elements indexed.
pub mod text {
    use super::{Result, Serialize, Value};

    /// Format data as flattened `path=value` lines.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        let mut lines = Vec::new();
        flatten(&value, "", &mut lines);
        Ok(lines.join("\n"))
    }

    fn flatten(value: &Value, path: &str, lines: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (key, value) in map {
                    let path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    flatten(value, &path, lines);
                }
            }
            Value::Array(items) if !items.is_empty() => {
                for (i, item) in items.iter().enumerate() {
                    flatten(item, &format!("{path}[{i}]"), lines);
                }
            }
            Value::Array(_) => lines.push(format!("{path}=")),
            Value::String(s) => lines.push(format!("{path}={s}")),
            Value::Null => lines.push(format!("{path}=")),
            other => lines.push(format!("{path}={other}")),
        }
    }
}

/// Pretty (human-readable) output formatting.
pub mod pretty {
    use super::{Colorize, Result, Serialize, Value};

    /// Format data as an indented, colored outline.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        let mut out = Vec::new();
        outline(&value, 0, &mut out);
        Ok(out.join("\n"))
    }

    fn outline(value: &Value, indent: usize, out: &mut Vec<String>) {
        let pad = "  ".repeat(indent);
        match value {
            Value::Object(map) => {
                for (key, value) in map {
                    if is_scalar(value) {
                        out.push(format!("{pad}{}: {}", key.blue().bold(), scalar(value)));
                    } else {
                        out.push(format!("{pad}{}:", key.blue().bold()));
                        outline(value, indent + 1, out);
                    }
                }
            }
            Value::Array(items) if items.is_empty() => out.push(format!("{pad}{}", "(none)".dimmed())),
            Value::Array(items) => {
                for item in items {
                    if is_scalar(item) {
                        out.push(format!("{pad}- {}", scalar(item)));
                    } else {
                        out.push(format!("{pad}-"));
                        outline(item, indent + 1, out);
                    }
                }
            }
            other => out.push(format!("{pad}{}", scalar(other))),
        }
    }

    fn is_scalar(value: &Value) -> bool {
        !matches!(value, Value::Object(_) | Value::Array(_))
    }

    fn scalar(value: &Value) -> String {
        match value {
            Value::Null => "-".dimmed().to_string(),
            Value::Bool(true) => "yes".green().to_string(),
            Value::Bool(false) => "no".yellow().to_string(),
            Value::Number(n) => n.to_string().cyan().to_string(),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Candidate {
        text: String,
        confidence: f64,
    }

    #[derive(Serialize)]
    struct Report {
        plugin: String,
        bound: bool,
        candidates: Vec<Candidate>,
        note: Option<String>,
    }

    fn report() -> Report {
        Report {
            plugin: "latin".to_string(),
            bound: true,
            candidates: vec![
                Candidate {
                    text: "hello".to_string(),
                    confidence: 0.5,
                },
                Candidate {
                    text: "help".to_string(),
                    confidence: 0.25,
                },
            ],
            note: None,
        }
    }

    #[test]
    fn test_json_format() {
        let output = json::format(&report()).unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["plugin"], "latin");
        assert_eq!(parsed["candidates"][1]["text"], "help");
    }

    #[test]
    fn test_text_format_flattens_paths() {
        let output = text::format(&report()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "bound=true",
                "candidates[0].confidence=0.5",
                "candidates[0].text=hello",
                "candidates[1].confidence=0.25",
                "candidates[1].text=help",
                "note=",
                "plugin=latin",
            ]
        );
    }

    #[test]
    fn test_text_format_empty_array() {
        #[derive(Serialize)]
        struct Empty {
            suggestions: Vec<String>,
        }
        let output = text::format(&Empty { suggestions: vec![] }).unwrap();
        assert_eq!(output, "suggestions=");
    }

    #[test]
    fn test_pretty_format_contains_values() {
        colored::control::set_override(false);
        let output = pretty::format(&report()).unwrap();
        assert!(output.contains("plugin: latin"));
        assert!(output.contains("bound: yes"));
        assert!(output.contains("  -\n    confidence: 0.5\n    text: hello"));
        assert!(output.contains("note: -"));
    }

    #[test]
    fn test_format_output_dispatches() {
        let data = report();
        assert!(format_output(&data, OutputFormat::Json).unwrap().starts_with('{'));
        assert!(format_output(&data, OutputFormat::Text).unwrap().starts_with("bound=true"));
        assert!(!format_output(&data, OutputFormat::Pretty).unwrap().is_empty());
    }
}
