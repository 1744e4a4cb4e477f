//! The bridge facade: shared state plus the handler sets built on it.

use crate::cancel::CancellationToken;
use crate::config::BridgeConfig;
use crate::frontend::FrontendService;
use crate::inventory::Inventory;
use crate::jsonrpc::{JsonRpcClient, Transport};
use crate::middleend::MiddleendService;
use crate::models::FabricsEndpoint;
use crate::pagination::Paginator;
use crate::spdk::{method, GetVersionResult};
use crate::{BridgeError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

/// State shared by every handler set.
#[derive(Debug)]
pub struct BridgeState {
    pub(crate) client: JsonRpcClient,
    pub(crate) inventory: Mutex<Inventory>,
    pub(crate) paginator: Paginator,
    pub(crate) config: BridgeConfig,
    pub(crate) cancel: CancellationToken,
}

impl BridgeState {
    /// Issue one backend call, aborted when the bridge shuts down.
    pub(crate) async fn call<P, R>(&self, method: &str, params: &P) -> Result<R>
    where
        P: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        if self.cancel.is_cancelled() {
            return Err(BridgeError::Cancelled {
                method: method.to_string(),
            });
        }
        self.client
            .call_cancellable(method, params, &self.cancel)
            .await
    }
}

/// Entry point of the storage API.
///
/// Cheap to clone; clones share the same backend client and inventory.
///
/// # Example
///
/// ```rust,ignore
/// use spdk_bridge::{Bridge, NvmeSubsystemService};
///
/// let bridge = Bridge::builder()
///     .backend_address("/var/tmp/spdk.sock")
///     .build()?;
/// let subsystems = bridge.nvme().list_nvme_subsystems(Default::default()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Bridge {
    state: Arc<BridgeState>,
    frontend: FrontendService,
    middleend: MiddleendService,
}

impl Bridge {
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Subsystem, controller and namespace operations.
    pub fn nvme(&self) -> &FrontendService {
        &self.frontend
    }

    /// Encrypted-volume operations.
    pub fn encryption(&self) -> &MiddleendService {
        &self.middleend
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.state.config
    }

    /// Ask the backend for its version; doubles as a liveness probe.
    pub async fn backend_version(&self) -> Result<GetVersionResult> {
        self.state.call(method::SPDK_GET_VERSION, &()).await
    }

    /// Abort every in-flight backend call. Later calls fail immediately.
    pub fn shutdown(&self) {
        info!("Bridge shutting down");
        self.state.cancel.cancel();
    }
}

/// Builder for [`Bridge`].
pub struct BridgeBuilder {
    config: BridgeConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for BridgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeBuilder {
    pub fn new() -> Self {
        Self {
            config: BridgeConfig::default(),
            transport: None,
        }
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Unix socket path or `host:port` of the SPDK JSON-RPC server.
    ///
    /// Default: `/var/tmp/spdk.sock`
    pub fn backend_address(mut self, address: impl Into<String>) -> Self {
        self.config.backend_address = address.into();
        self
    }

    /// Upper bound for a single backend round trip.
    ///
    /// Default: 30 seconds
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    /// Listen address for NVMe/TCP controllers created without a fabrics id.
    pub fn tcp_listen(mut self, address: impl Into<String>) -> Self {
        self.config.tcp_listen = address.into();
        self
    }

    /// Directory under which vfio-user controller sockets are created.
    pub fn vfio_ctrlr_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.vfio_ctrlr_dir = dir.into();
        self
    }

    /// Destroy the crypto key again when creating the crypto device fails.
    ///
    /// Default: `false`
    pub fn rollback_partial_create(mut self, enable: bool) -> Self {
        self.config.rollback_partial_create = enable;
        self
    }

    /// Largest backend reply accepted before the call fails.
    ///
    /// Default: 16 MiB
    pub fn max_response_size(mut self, bytes: usize) -> Self {
        self.config.max_response_size = bytes;
        self
    }

    /// Use a custom transport instead of a socket to `backend_address`.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Bridge> {
        if self.config.call_timeout.is_zero() {
            return Err(BridgeError::Config {
                message: "call timeout must be greater than zero".to_string(),
            });
        }
        if self.config.max_response_size == 0 {
            return Err(BridgeError::Config {
                message: "max response size must be greater than zero".to_string(),
            });
        }
        FabricsEndpoint::parse(&self.config.tcp_listen)?;

        let client = match self.transport {
            Some(transport) => JsonRpcClient::with_transport(transport),
            None => JsonRpcClient::new(&self.config.backend_address),
        }
        .with_timeout(self.config.call_timeout)
        .with_max_response_size(self.config.max_response_size);

        info!(
            "Bridge configured for backend {} (timeout {:?})",
            self.config.backend_address, self.config.call_timeout
        );

        let state = Arc::new(BridgeState {
            client,
            inventory: Mutex::new(Inventory::new()),
            paginator: Paginator::new(),
            config: self.config,
            cancel: CancellationToken::new(),
        });

        Ok(Bridge {
            frontend: FrontendService::new(state.clone()),
            middleend: MiddleendService::new(state.clone()),
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Code;
    use crate::jsonrpc::{StubBackend, StubReply};

    #[test]
    fn test_builder_rejects_zero_timeout() {
        let err = Bridge::builder()
            .call_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(err.code(), Code::Internal);
    }

    #[test]
    fn test_builder_rejects_bad_listen_address() {
        assert!(Bridge::builder().tcp_listen("nowhere").build().is_err());
    }

    #[tokio::test]
    async fn test_oversized_reply_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let stub = StubBackend::start(
            dir.path().join("spdk.sock"),
            vec![StubReply::result(serde_json::json!({"version": "SPDK v23.01"}))],
        )
        .await
        .unwrap();
        let bridge = Bridge::builder()
            .backend_address(stub.address())
            .max_response_size(16)
            .build()
            .unwrap();

        let err = bridge.backend_version().await.unwrap_err();
        assert_eq!(err.code(), Code::Unknown);
        assert_eq!(
            err.to_string(),
            "spdk_get_version: response exceeds maximum size of 16 bytes"
        );
    }

    #[test]
    fn test_builder_rejects_zero_response_size() {
        assert!(Bridge::builder().max_response_size(0).build().is_err());
    }

    #[test]
    fn test_builder_applies_settings() {
        let bridge = Bridge::builder()
            .backend_address("10.0.0.1:5260")
            .rollback_partial_create(true)
            .build()
            .unwrap();
        assert_eq!(bridge.config().backend_address, "10.0.0.1:5260");
        assert!(bridge.config().rollback_partial_create);
    }
}
