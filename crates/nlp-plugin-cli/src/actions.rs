//! Action type definitions for CLI commands.

use clap::Subcommand;

/// Configuration actions.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Print the configuration file location
    Path,
}
