//! CLI argument definitions and parsing.
//!
//! Defines the command-line interface structure using clap:
//! - [`Cli`] - Main CLI entry point
//! - [`Commands`] - Available subcommands
//! - [`OutputFormat`] and [`ExitCode`] - Shared result conventions

use clap::{Parser, Subcommand, ValueEnum};
use nlp_plugin_core::SuggestionRequestFlags;
use std::fmt;
use std::path::PathBuf;

use crate::actions::ConfigAction;

/// NLP plugin host tool.
///
/// Lists the spelling and suggestion plugins installed in a package
/// directory and talks to them the way an input method would.
#[derive(Parser, Debug)]
#[command(name = "nlp-plugin")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long = "format", global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Package directory to scan instead of the configured one
    #[arg(long, global = true, env = "NLP_PLUGIN_REGISTRY")]
    pub registry: Option<PathBuf>,

    /// Configuration file (default: <config dir>/nlp-plugin/config.toml)
    #[arg(long, global = true, env = "NLP_PLUGIN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every indexed plugin, valid or not.
    ///
    /// # Examples
    ///
    /// ```bash
    /// nlp-plugin list
    /// nlp-plugin --registry ./packages --format json list
    /// ```
    List {
        /// Only show plugins whose descriptor parsed
        #[arg(long)]
        valid_only: bool,
    },

    /// Show the descriptor of one plugin with resources resolved.
    Inspect {
        /// Plugin id declared in the descriptor
        plugin_id: String,
    },

    /// Spell-check a word with a plugin.
    ///
    /// # Examples
    ///
    /// ```bash
    /// nlp-plugin spell org.example.latin helo --before say
    /// ```
    Spell {
        /// Plugin id declared in the descriptor
        plugin_id: String,

        /// Word to check
        word: String,

        /// Word preceding the checked word (repeatable, nearest last)
        #[arg(long = "before", num_args = 1)]
        before: Vec<String>,

        /// Word following the checked word (repeatable)
        #[arg(long = "after", num_args = 1)]
        after: Vec<String>,

        #[command(flatten)]
        request: RequestArgs,
    },

    /// Ask a plugin for candidates completing a word.
    Suggest {
        /// Plugin id declared in the descriptor
        plugin_id: String,

        /// Word being composed
        word: String,

        /// Word preceding the composed word (repeatable, nearest last)
        #[arg(long = "before", num_args = 1)]
        before: Vec<String>,

        #[command(flatten)]
        request: RequestArgs,
    },

    /// Inspect the host configuration.
    Config {
        /// Configuration action
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options shared by `spell` and `suggest`.
#[derive(clap::Args, Debug, Clone)]
pub struct RequestArgs {
    /// Subtype the request applies to
    #[arg(long, default_value_t = 0)]
    pub subtype_id: i64,

    /// Locale preloaded before the request
    #[arg(long, default_value = "en-US")]
    pub locale: String,

    /// Maximum number of candidates
    #[arg(long, default_value_t = 8)]
    pub max_suggestions: u16,
}

impl RequestArgs {
    /// Request flags built from the options.
    #[must_use]
    pub fn flags(&self) -> SuggestionRequestFlags {
        SuggestionRequestFlags {
            max_suggestion_count: self.max_suggestions,
            ..SuggestionRequestFlags::default()
        }
    }
}

/// CLI output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum OutputFormat {
    /// JSON output for machine parsing
    Json,
    /// Plain text output for scripts
    Text,
    /// Colored output for human reading
    #[default]
    Pretty,
}

impl OutputFormat {
    /// Returns the string representation of the format.
    ///
    /// # Examples
    ///
    /// ```
    /// use nlp_plugin_cli::OutputFormat;
    ///
    /// assert_eq!(OutputFormat::Json.as_str(), "json");
    /// assert_eq!(OutputFormat::Pretty.to_string(), "pretty");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
            Self::Pretty => "pretty",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CLI exit code with semantic meaning.
///
/// # Examples
///
/// ```
/// use nlp_plugin_cli::ExitCode;
///
/// assert!(ExitCode::SUCCESS.is_success());
/// assert_eq!(ExitCode::PLUGIN_NOT_FOUND.as_i32(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Successful execution (exit code 0).
    pub const SUCCESS: Self = Self(0);

    /// General error (exit code 1).
    pub const ERROR: Self = Self(1);

    /// No valid plugin has the requested id (exit code 2).
    pub const PLUGIN_NOT_FOUND: Self = Self(2);

    /// The plugin could not be bound (exit code 3).
    pub const BIND_FAILED: Self = Self(3);

    /// Returns the integer value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Returns `true` for [`ExitCode::SUCCESS`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(u8::try_from(code.0).unwrap_or(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parsing_list() {
        let cli = Cli::parse_from(["nlp-plugin", "list"]);
        assert!(matches!(cli.command, Commands::List { valid_only: false }));
        assert_eq!(cli.format, OutputFormat::Pretty);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_parsing_spell_with_context() {
        let cli = Cli::parse_from([
            "nlp-plugin",
            "spell",
            "org.example.latin",
            "helo",
            "--before",
            "say",
            "--before",
            "please",
            "--after",
            "there",
            "--subtype-id",
            "7",
        ]);
        let Commands::Spell {
            plugin_id,
            word,
            before,
            after,
            request,
        } = cli.command
        else {
            panic!("Expected Spell command");
        };
        assert_eq!(plugin_id, "org.example.latin");
        assert_eq!(word, "helo");
        assert_eq!(before, vec!["say", "please"]);
        assert_eq!(after, vec!["there"]);
        assert_eq!(request.subtype_id, 7);
        assert_eq!(request.locale, "en-US");
        assert_eq!(request.max_suggestions, 8);
    }

    #[test]
    fn test_cli_parsing_suggest() {
        let cli = Cli::parse_from(["nlp-plugin", "suggest", "latin", "wor", "--max-suggestions", "3"]);
        if let Commands::Suggest { word, request, .. } = cli.command {
            assert_eq!(word, "wor");
            assert_eq!(request.max_suggestions, 3);
            assert_eq!(request.flags().max_suggestion_count, 3);
        } else {
            panic!("Expected Suggest command");
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "nlp-plugin",
            "--verbose",
            "--format",
            "json",
            "--registry",
            "/tmp/packages",
            "inspect",
            "latin",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.registry, Some(PathBuf::from("/tmp/packages")));
        assert!(matches!(cli.command, Commands::Inspect { .. }));
    }

    #[test]
    fn test_cli_parsing_config_actions() {
        let cli = Cli::parse_from(["nlp-plugin", "config", "path"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Path
            }
        ));
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["nlp-plugin", "--format", "yaml", "list"]).is_err());
    }

    #[test]
    fn test_exit_code_conversion() {
        assert!(ExitCode::SUCCESS.is_success());
        assert!(!ExitCode::BIND_FAILED.is_success());
        assert_eq!(ExitCode::BIND_FAILED.as_i32(), 3);
    }
}
