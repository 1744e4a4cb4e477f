//! JSON-RPC client for the SPDK daemon.
//!
//! Wraps a [`Transport`] with request-id correlation and error mapping. Each
//! [`JsonRpcClient::call`] is a single synchronous round trip from the
//! caller's point of view: no retries, no caching.
//!
//! # Thread Safety
//!
//! The request-id counter is atomic and the transport opens a fresh connection
//! per call, so one client can be shared across tasks behind an `Arc`.

use super::protocol::{read_message, JsonRpcRequest, JsonRpcResponse, ReadError};
use super::transport::{BackendAddress, SocketTransport, Transport};
use crate::cancel::CancellationToken;
use crate::config::BackendConfig;
use crate::{BridgeError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Client issuing JSON-RPC calls against one backend.
pub struct JsonRpcClient {
    transport: Arc<dyn Transport>,
    last_id: AtomicU64,
    timeout: Duration,
    max_response_size: usize,
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("last_id", &self.last_id.load(Ordering::Relaxed))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl JsonRpcClient {
    /// Create a client for a Unix socket path or `host:port` address.
    pub fn new(address: &str) -> Self {
        Self::with_transport(Arc::new(SocketTransport::new(BackendAddress::parse(
            address,
        ))))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            last_id: AtomicU64::new(0),
            timeout: BackendConfig::DEFAULT_CALL_TIMEOUT,
            max_response_size: BackendConfig::MAX_RESPONSE_SIZE,
        }
    }

    /// Bound every round trip by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cap the size of a single reply.
    pub fn with_max_response_size(mut self, limit: usize) -> Self {
        self.max_response_size = limit;
        self
    }

    /// Call `method` and decode its `result` as `R`.
    ///
    /// Pass `&()` for methods that take no parameters.
    pub async fn call<P, R>(&self, method: &str, params: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call_cancellable(method, params, &CancellationToken::new())
            .await
    }

    /// Like [`Self::call`], aborting the connection as soon as `cancel` fires.
    pub async fn call_cancellable<P, R>(
        &self,
        method: &str,
        params: &P,
        cancel: &CancellationToken,
    ) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;

        let params = serde_json::to_value(params).map_err(|e| BridgeError::Encode {
            method: method.to_string(),
            message: e.to_string(),
            source: Some(e),
        })?;
        let request = JsonRpcRequest::new(method, params, id);
        let payload = serde_json::to_vec(&request).map_err(|e| BridgeError::Encode {
            method: method.to_string(),
            message: e.to_string(),
            source: Some(e),
        })?;

        debug!("Backend call {} (id {})", method, id);

        let response = tokio::select! {
            outcome = tokio::time::timeout(self.timeout, self.exchange(method, &payload)) => {
                outcome.map_err(|_| BridgeError::Timeout {
                    method: method.to_string(),
                    timeout: self.timeout,
                })??
            }
            _ = cancel.cancelled() => {
                return Err(BridgeError::Cancelled { method: method.to_string() });
            }
        };

        if response.id != Some(id) {
            warn!(
                "Backend reply to {} carried id {:?}, expected {}",
                method, response.id, id
            );
            return Err(BridgeError::protocol(method, "json response ID mismatch"));
        }

        if let Some(err) = response.failure() {
            return Err(BridgeError::Backend {
                method: method.to_string(),
                code: err.code,
                message: err.message.clone(),
            });
        }

        serde_json::from_value(response.result)
            .map_err(|e| BridgeError::protocol(method, e.to_string()))
    }

    async fn exchange(&self, method: &str, payload: &[u8]) -> Result<JsonRpcResponse> {
        let mut stream = self
            .transport
            .send(payload)
            .await
            .map_err(|e| BridgeError::transport(method, e))?;

        read_message(&mut stream, self.max_response_size)
            .await
            .map_err(|e| match e {
                ReadError::Io(io) => BridgeError::transport(method, io),
                other => BridgeError::protocol(method, other.to_string()),
            })
    }
}
