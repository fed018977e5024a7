//! Command implementations for the `nlp-plugin` CLI.
//!
//! Each command indexes the package directory itself, renders a serializable
//! report through the formatters, and returns an exit code.

pub mod common;
pub mod config;
pub mod inspect;
pub mod list;
pub mod spell;
pub mod suggest;
