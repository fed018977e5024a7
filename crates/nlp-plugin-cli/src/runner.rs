//! Command execution and logging initialization.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, ExitCode};
use crate::commands;

/// Initializes logging on stderr.
///
/// `RUST_LOG` is honoured unless `verbose` forces the debug level.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

/// Executes the parsed command line.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the package
/// directory cannot be indexed, or output cannot be rendered.
pub async fn execute(cli: Cli) -> Result<ExitCode> {
    let config = commands::common::load_config(cli.config.as_deref(), cli.registry.as_deref())?;
    let format = cli.format;

    match cli.command {
        Commands::List { valid_only } => commands::list::run(&config, valid_only, format),
        Commands::Inspect { plugin_id } => commands::inspect::run(&config, &plugin_id, format),
        Commands::Spell {
            plugin_id,
            word,
            before,
            after,
            request,
        } => {
            commands::spell::run(&config, &plugin_id, word, &before, &after, &request, format).await
        }
        Commands::Suggest {
            plugin_id,
            word,
            before,
            request,
        } => commands::suggest::run(&config, &plugin_id, word, before, &request, format).await,
        Commands::Config { action } => {
            commands::config::run(action, &config, cli.config.as_deref(), format)
        }
    }
}
