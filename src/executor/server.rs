//! Queue server for process workers
//!
//! A single actor task owns the queue and the accumulating reporter.
//! Connection handlers never touch either directly: they forward each
//! request to the actor and relay its answer, so requests from all
//! workers are serialized through one channel.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::protocol::{Request, Response};
use super::WorkQueue;
use crate::error::LoupeError;
use crate::models::Reporter;

enum Call {
    Request(Request, oneshot::Sender<Response>),
    Finish(oneshot::Sender<(Reporter, WorkQueue)>),
}

/// A running queue server
pub struct QueueServer {
    path: PathBuf,
    calls: mpsc::Sender<Call>,
    acceptor: JoinHandle<()>,
}

impl QueueServer {
    /// A fresh socket path in the system temp directory
    pub fn socket_path() -> PathBuf {
        std::env::temp_dir().join(format!(
            "loupe-{}-{}.sock",
            std::process::id(),
            rand::random::<u32>()
        ))
    }

    /// Listen on `path` and start serving `queue`
    pub async fn bind(path: PathBuf, queue: WorkQueue) -> Result<Self> {
        let listener = UnixListener::bind(&path)
            .with_context(|| format!("Failed to bind queue server at {}", path.display()))?;
        info!("Queue server listening on {} with {} items", path.display(), queue.len());

        let (calls, rx) = mpsc::channel(64);
        tokio::spawn(serve(queue, rx));
        let acceptor = tokio::spawn(accept(listener, calls.clone()));

        Ok(Self {
            path,
            calls,
            acceptor,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop accepting workers and return the merged reporter together with
    /// the items no worker popped
    pub async fn finish(self) -> Result<(Reporter, WorkQueue)> {
        self.acceptor.abort();

        let (tx, rx) = oneshot::channel();
        self.calls
            .send(Call::Finish(tx))
            .await
            .map_err(|_| LoupeError::Protocol("queue server stopped early".into()))?;
        let (reporter, leftover) = rx
            .await
            .map_err(|_| LoupeError::Protocol("queue server dropped the report".into()))?;

        debug!("Queue server stopped with {} items left", leftover.len());
        Ok((reporter, leftover))
    }
}

impl Drop for QueueServer {
    fn drop(&mut self) {
        self.acceptor.abort();
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", self.path.display(), err);
            }
        }
    }
}

async fn serve(mut queue: WorkQueue, mut calls: mpsc::Receiver<Call>) {
    let mut reporter = Reporter::new();

    while let Some(call) = calls.recv().await {
        match call {
            Call::Request(request, reply) => {
                let response = match request {
                    Request::Pop => Response::Item(queue.pop()),
                    Request::IsEmpty => Response::Empty(queue.is_empty()),
                    Request::Length => Response::Length(queue.len()),
                    Request::AddReporter(partial) => {
                        reporter.merge(partial);
                        Response::Ack
                    }
                };
                let _ = reply.send(response);
            }
            Call::Finish(reply) => {
                let _ = reply.send((std::mem::take(&mut reporter), queue));
                break;
            }
        }
    }
}

async fn accept(listener: UnixListener, calls: mpsc::Sender<Call>) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                debug!("Worker connected");
                let calls = calls.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle(stream, calls).await {
                        warn!("Worker connection failed: {:#}", err);
                    }
                });
            }
            Err(err) => {
                warn!("Failed to accept worker connection: {}", err);
                break;
            }
        }
    }
}

async fn handle(stream: UnixStream, calls: mpsc::Sender<Call>) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    while let Some(line) = lines.next_line().await? {
        let request: Request = serde_json::from_str(&line).context("Malformed request")?;

        let (tx, rx) = oneshot::channel();
        calls
            .send(Call::Request(request, tx))
            .await
            .map_err(|_| LoupeError::Protocol("queue server stopped".into()))?;
        let response = rx
            .await
            .map_err(|_| LoupeError::Protocol("queue server dropped a request".into()))?;

        let mut payload = serde_json::to_vec(&response)?;
        payload.push(b'\n');
        write.write_all(&payload).await?;
    }

    debug!("Worker disconnected");
    Ok(())
}
