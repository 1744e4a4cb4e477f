//! Centralized configuration for the SPDK bridge.
//!
//! Constants live in unit structs grouped by concern. Runtime settings that an
//! operator can override are collected in [`BridgeConfig`], normally assembled
//! through [`crate::BridgeBuilder`].

use std::path::PathBuf;
use std::time::Duration;

/// Backend (SPDK daemon) connection settings.
pub struct BackendConfig;

impl BackendConfig {
    pub const DEFAULT_SOCKET_PATH: &'static str = "/var/tmp/spdk.sock";
    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
    pub const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024; // 16MB
    pub const READ_CHUNK_SIZE: usize = 8192;
    pub const JSONRPC_VERSION: &'static str = "2.0";
}

/// List pagination limits.
pub struct PaginationConfig;

impl PaginationConfig {
    pub const DEFAULT_PAGE_SIZE: usize = 50;
    pub const MAX_PAGE_SIZE: usize = 250;
}

/// Defaults for the network-facing server and exported NVMe endpoints.
pub struct ServerConfig;

impl ServerConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 9009;
    pub const DEFAULT_TCP_LISTEN: &'static str = "127.0.0.1:4420";
    pub const DEFAULT_VFIO_CTRLR_DIR: &'static str = "/var/tmp";
}

/// Runtime configuration of a bridge instance.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Unix socket path or `host:port` of the SPDK JSON-RPC server.
    pub backend_address: String,
    /// Upper bound for one backend round trip.
    pub call_timeout: Duration,
    /// Listen address used for NVMe/TCP controllers without explicit fabrics ids.
    pub tcp_listen: String,
    /// Directory holding per-controller vfio-user sockets.
    pub vfio_ctrlr_dir: PathBuf,
    /// Destroy an already-created crypto key when the device step fails.
    pub rollback_partial_create: bool,
    /// Largest backend reply accepted, in bytes.
    pub max_response_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            backend_address: BackendConfig::DEFAULT_SOCKET_PATH.to_string(),
            call_timeout: BackendConfig::DEFAULT_CALL_TIMEOUT,
            tcp_listen: ServerConfig::DEFAULT_TCP_LISTEN.to_string(),
            vfio_ctrlr_dir: PathBuf::from(ServerConfig::DEFAULT_VFIO_CTRLR_DIR),
            rollback_partial_create: false,
            max_response_size: BackendConfig::MAX_RESPONSE_SIZE,
        }
    }
}
