//! Demo provider executable.
//!
//! Serves a word-list dictionary over stdin/stdout. The host passes its
//! identity in environment variables; the word list comes from the file
//! named by `NLP_PLUGIN_DEMO_WORDS` or a built-in list.
//!
//! # Usage
//!
//! Declare the binary in a package manifest:
//!
//! ```toml
//! [[service]]
//! name = "DemoService"
//! interface = "nlp.plugin.PluginService"
//! exec = "bin/nlp-plugin-demo-provider"
//! ```

use anyhow::{Context, Result};
use nlp_plugin_service::demo::WORDS_ENV;
use nlp_plugin_service::{PluginService, ProviderHandlers, WordListProvider, serve_stdio};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries protocol frames
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,nlp_plugin_service=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .init();

    tracing::info!(
        "Starting nlp-plugin-demo-provider v{}",
        env!("CARGO_PKG_VERSION")
    );

    let provider = WordListProvider::from_env()
        .with_context(|| format!("failed to load the word list named by {WORDS_ENV}"))?;
    let service = PluginService::start(ProviderHandlers::full(Arc::new(provider)));

    serve_stdio(&service).await.context("provider channel failed")?;
    service.shutdown().await;

    tracing::info!("Provider shutdown complete");
    Ok(())
}
