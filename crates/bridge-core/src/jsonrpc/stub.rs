//! Scripted stand-in for the SPDK JSON-RPC server.
//!
//! Listens on a Unix socket and answers each accepted connection with the next
//! [`StubReply`] from its script, recording every request it receives. Once the
//! script is exhausted further connections are closed without a reply.
//! Used by the test suites and handy for exercising tooling without a real
//! SPDK target.

use super::protocol::{read_message, JsonRpcRequest};
use crate::config::BackendConfig;
use crate::{BridgeError, Result};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

/// How the stub answers one connection.
#[derive(Debug, Clone)]
pub enum StubReply {
    /// Bytes written verbatim, whatever the request id was.
    Raw(String),
    /// Successful reply echoing the request id.
    Result(Value),
    /// Error reply echoing the request id.
    Error { code: i64, message: String },
    /// Close the connection without writing anything.
    Close,
    /// Keep the connection open and never answer.
    Silent,
}

impl StubReply {
    pub fn raw(text: impl Into<String>) -> Self {
        StubReply::Raw(text.into())
    }

    pub fn result(value: Value) -> Self {
        StubReply::Result(value)
    }

    pub fn error(code: i64, message: impl Into<String>) -> Self {
        StubReply::Error {
            code,
            message: message.into(),
        }
    }
}

/// Handle to a running stub backend. Dropping it stops the listener.
pub struct StubBackend {
    path: PathBuf,
    script: Arc<Mutex<VecDeque<StubReply>>>,
    requests: Arc<Mutex<Vec<JsonRpcRequest>>>,
    shutdown_tx: watch::Sender<bool>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl StubBackend {
    /// Bind `path` and start answering with `replies` in order.
    pub async fn start(path: impl Into<PathBuf>, replies: Vec<StubReply>) -> Result<Self> {
        let path = path.into();
        let listener = UnixListener::bind(&path).map_err(|e| BridgeError::io_with_path(e, &path))?;

        debug!("Stub backend listening on {}", path.display());

        let script = Arc::new(Mutex::new(VecDeque::from(replies)));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let conn_shutdown_rx = shutdown_tx.subscribe();

        let task_handle = tokio::spawn(Self::accept_loop(
            listener,
            script.clone(),
            requests.clone(),
            shutdown_rx,
            conn_shutdown_rx,
        ));

        Ok(Self {
            path,
            script,
            requests,
            shutdown_tx,
            task_handle: Some(task_handle),
        })
    }

    /// Address string suitable for [`crate::JsonRpcClient::new`].
    pub fn address(&self) -> String {
        self.path.display().to_string()
    }

    /// Requests received so far, in arrival order.
    pub async fn requests(&self) -> Vec<JsonRpcRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of scripted replies not yet consumed.
    pub async fn remaining(&self) -> usize {
        self.script.lock().await.len()
    }

    /// Stop accepting connections and release silent ones.
    pub fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }

    async fn accept_loop(
        listener: UnixListener,
        script: Arc<Mutex<VecDeque<StubReply>>>,
        requests: Arc<Mutex<Vec<JsonRpcRequest>>>,
        mut shutdown_rx: watch::Receiver<bool>,
        conn_shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    debug!("Stub backend shutting down");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            // Replies are bound in accept order.
                            let reply = script.lock().await.pop_front().unwrap_or(StubReply::Close);
                            let requests = requests.clone();
                            let shutdown = conn_shutdown_rx.clone();
                            tokio::spawn(async move {
                                if let Err(e) = Self::handle_connection(stream, reply, requests, shutdown).await {
                                    debug!("Stub connection ended: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            warn!("Stub backend accept error: {}", e);
                        }
                    }
                }
            }
        }
    }

    async fn handle_connection(
        mut stream: UnixStream,
        reply: StubReply,
        requests: Arc<Mutex<Vec<JsonRpcRequest>>>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let request: JsonRpcRequest =
            match read_message(&mut stream, BackendConfig::MAX_RESPONSE_SIZE).await {
                Ok(request) => request,
                Err(e) => {
                    debug!("Stub backend could not read request: {}", e);
                    return Ok(());
                }
            };
        let id = request.id;
        requests.lock().await.push(request);

        let body = match reply {
            StubReply::Raw(text) => text.into_bytes(),
            StubReply::Result(result) => {
                serde_json::to_vec(&json!({"jsonrpc": "2.0", "id": id, "result": result}))?
            }
            StubReply::Error { code, message } => serde_json::to_vec(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": code, "message": message}
            }))?,
            StubReply::Close => return Ok(()),
            StubReply::Silent => {
                let _ = shutdown_rx.changed().await;
                return Ok(());
            }
        };

        stream.write_all(&body).await?;
        stream.shutdown().await
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
        let _ = std::fs::remove_file(&self.path);
    }
}
