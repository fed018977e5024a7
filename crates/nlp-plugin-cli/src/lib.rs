//! `nlp-plugin` command-line tool.
//!
//! Inspects the plugins installed in a package directory and exercises them
//! through the same facade an input method uses:
//! - `list` - Every indexed plugin with its validation state
//! - `inspect` - One plugin's descriptor with resources resolved
//! - `spell` / `suggest` - Start a plugin and send it one request
//! - `config` - Show the effective host configuration

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::missing_errors_doc)]

pub mod actions;
pub mod cli;
pub mod commands;
pub mod formatters;
pub mod runner;

pub use actions::ConfigAction;
pub use cli::{Cli, Commands, ExitCode, OutputFormat, RequestArgs};
