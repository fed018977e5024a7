//! Serves a [`PluginService`] over a line-oriented byte stream.
//!
//! The host starts the provider with the consumer identity in environment
//! variables. The provider answers with one handshake line, then both sides
//! exchange one JSON frame per line until the host closes the stream.

use crate::service::PluginService;
use nlp_plugin_bridge::BindableService;
use nlp_plugin_core::message::{BindHandshake, Frame};
use nlp_plugin_core::{BindExtras, CONSUMER_EXTRAS, Message, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Serves one consumer over `reader` and `writer`.
///
/// Returns when the consumer closes `reader` or the binding is refused.
///
/// # Errors
///
/// Returns an error if the stream cannot be read or written, or if the
/// service stops while the consumer is still sending.
pub async fn serve<R, W>(service: &PluginService, extras: &BindExtras, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (reply_tx, mut replies) = mpsc::unbounded_channel();
    let endpoint = service.on_bind(extras, reply_tx);
    let handshake = BindHandshake {
        bound: endpoint.is_some(),
    };
    write_line(&mut writer, serde_json::to_string(&handshake)?).await?;
    let Some(endpoint) = endpoint else {
        tracing::info!("binding refused, closing");
        return Ok(());
    };

    let mut lines = BufReader::new(reader).lines();
    let outcome = loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match Frame::from_line(&line).and_then(Message::from_frame) {
                    Ok(message) => {
                        if let Err(e) = endpoint.send(message) {
                            break Err(e);
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "skipping malformed frame"),
                },
                Ok(None) => {
                    tracing::info!("consumer closed the stream");
                    break Ok(());
                }
                Err(e) => break Err(e.into()),
            },
            Some(reply) = replies.recv() => {
                write_line(&mut writer, reply.to_frame().to_line()?).await?;
            }
        }
    };

    service.on_unbind();
    outcome
}

/// Serves the consumer connected to this process's stdin and stdout.
///
/// The consumer identity is read from the environment.
///
/// # Errors
///
/// See [`serve`].
pub async fn serve_stdio(service: &PluginService) -> Result<()> {
    let extras = BindExtras::from_env_vars(std::env::vars(), &CONSUMER_EXTRAS);
    serve(service, &extras, tokio::io::stdin(), tokio::io::stdout()).await
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, mut line: String) -> Result<()> {
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
