//! Binder running providers as child processes.
//!
//! The child receives the bind extras as environment variables and talks
//! newline-delimited JSON frames over stdin and stdout. Its first stdout
//! line is a [`BindHandshake`]. Stderr is inherited so provider logs end up
//! next to the host's.

use super::{BindRequest, Binding, ConnectionEvent, EventSender, MessageSender, ServiceBinder, ServiceEndpoint};
use nlp_plugin_core::message::{BindHandshake, Frame};
use nlp_plugin_core::{ComponentIdentity, Error, Message, Result};
use nlp_plugin_index::PluginCatalog;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};

/// Binds to provider executables.
#[derive(Debug, Default)]
pub struct ProcessBinder {
    executables: RwLock<HashMap<ComponentIdentity, PathBuf>>,
}

impl ProcessBinder {
    /// Creates a binder with no known executables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `component` with the program implementing it.
    pub fn register(&self, component: ComponentIdentity, executable: impl Into<PathBuf>) {
        self.executables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(component, executable.into());
    }

    /// Registers the executable of every valid plugin in `catalog`.
    ///
    /// Returns the number of registered components.
    pub fn register_catalog(&self, catalog: &PluginCatalog) -> usize {
        let mut count = 0;
        for plugin in catalog.valid() {
            if let Some(executable) = plugin.executable() {
                self.register(plugin.identity().clone(), executable);
                count += 1;
            }
        }
        count
    }

    /// Executable registered for `component`.
    #[must_use]
    pub fn executable(&self, component: &ComponentIdentity) -> Option<PathBuf> {
        self.executables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(component)
            .cloned()
    }

    fn spawn_child(executable: &Path, request: &BindRequest) -> Result<Child> {
        let child = Command::new(executable)
            .envs(request.extras.to_env_vars())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;
        Ok(child)
    }
}

impl ServiceBinder for ProcessBinder {
    fn bind(&self, request: BindRequest) -> Result<Box<dyn Binding>> {
        let executable = self
            .executable(&request.component)
            .ok_or_else(|| Error::ServiceNotFound {
                component: request.component.to_string(),
            })?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| Error::ProtocolError {
            message: format!("process binding requires a tokio runtime: {e}"),
        })?;

        let mut child = Self::spawn_child(&executable, &request)?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(Error::ProtocolError {
                message: format!("{} started without piped stdio", request.component),
            });
        };
        tracing::info!(
            component = %request.component,
            executable = %executable.display(),
            pid = child.id(),
            "spawned provider process"
        );

        let (cancel_tx, cancel_rx) = oneshot::channel();
        runtime.spawn(drive(
            ChildIo {
                component: request.component,
                child,
                stdin,
                stdout,
            },
            request.events,
            request.reply_to,
            cancel_rx,
        ));

        Ok(Box::new(ProcessBinding {
            cancel: Some(cancel_tx),
        }))
    }
}

struct ChildIo {
    component: ComponentIdentity,
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
}

async fn drive(
    io: ChildIo,
    events: EventSender,
    reply_to: MessageSender,
    mut cancel: oneshot::Receiver<()>,
) {
    let ChildIo {
        component,
        mut child,
        mut stdin,
        stdout,
    } = io;
    let mut lines = BufReader::new(stdout).lines();

    let first = tokio::select! {
        _ = &mut cancel => return,
        line = lines.next_line() => line,
    };
    let bound = match first {
        Ok(Some(line)) => match serde_json::from_str::<BindHandshake>(line.trim()) {
            Ok(handshake) => handshake.bound,
            Err(e) => {
                tracing::warn!(%component, error = %e, "invalid bind handshake");
                false
            }
        },
        Ok(None) => false,
        Err(e) => {
            tracing::warn!(%component, error = %e, "failed to read bind handshake");
            false
        }
    };
    if !bound {
        let _ = events.send(ConnectionEvent::NullBinding);
        return;
    }

    let (tx, mut outbound) = mpsc::unbounded_channel();
    let endpoint = ProcessEndpoint {
        component: component.clone(),
        tx,
    };
    let _ = events.send(ConnectionEvent::Connected(Arc::new(endpoint)));

    let died = loop {
        tokio::select! {
            _ = &mut cancel => break false,
            Some(message) = outbound.recv() => {
                if let Err(e) = write_frame(&mut stdin, &message).await {
                    tracing::warn!(%component, error = %e, "failed to write to provider");
                    break true;
                }
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match Frame::from_line(&line).and_then(Message::from_frame) {
                    Ok(message) => {
                        let _ = reply_to.send(message);
                    }
                    Err(e) => tracing::warn!(%component, error = %e, "skipping malformed frame"),
                },
                Ok(None) => {
                    tracing::info!(%component, "provider closed its output");
                    break true;
                }
                Err(e) => {
                    tracing::warn!(%component, error = %e, "failed to read from provider");
                    break true;
                }
            },
        }
    };

    if died {
        let _ = events.send(ConnectionEvent::BindingDied);
    }
    if let Err(e) = child.kill().await {
        tracing::debug!(%component, error = %e, "provider already exited");
    }
}

async fn write_frame(stdin: &mut ChildStdin, message: &Message) -> Result<()> {
    let mut line = message.to_frame().to_line()?;
    line.push('\n');
    stdin.write_all(line.as_bytes()).await?;
    stdin.flush().await?;
    Ok(())
}

#[derive(Debug)]
struct ProcessEndpoint {
    component: ComponentIdentity,
    tx: mpsc::UnboundedSender<Message>,
}

impl ServiceEndpoint for ProcessEndpoint {
    fn send(&self, message: Message) -> Result<()> {
        self.tx.send(message).map_err(|_| Error::ConnectionDied {
            component: self.component.to_string(),
        })
    }
}

#[derive(Debug)]
struct ProcessBinding {
    cancel: Option<oneshot::Sender<()>>,
}

impl Binding for ProcessBinding {
    fn unbind(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

impl Drop for ProcessBinding {
    fn drop(&mut self) {
        self.unbind();
    }
}
