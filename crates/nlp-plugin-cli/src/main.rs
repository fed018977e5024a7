//! `nlp-plugin` binary.

use anyhow::Result;
use clap::Parser;
use nlp_plugin_cli::Cli;
use nlp_plugin_cli::runner::{execute, init_logging};

#[tokio::main]
async fn main() -> Result<std::process::ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let code = execute(cli).await?;
    Ok(code.into())
}
