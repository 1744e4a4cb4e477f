//! SPDK bridge - storage-control API on top of the SPDK JSON-RPC interface.
//!
//! This crate turns typed subsystem, controller, namespace and encrypted-volume
//! operations into JSON-RPC calls against a local SPDK daemon, and keeps an
//! in-memory record of the resources it created. It carries no network-facing
//! server of its own; see the `spdk-bridge-rpc` crate for that.
//!
//! # Example
//!
//! ```rust,ignore
//! use spdk_bridge::models::{CreateNvmeSubsystemRequest, NvmeSubsystem};
//! use spdk_bridge::{Bridge, NvmeSubsystemService};
//!
//! #[tokio::main]
//! async fn main() -> spdk_bridge::Result<()> {
//!     let bridge = Bridge::builder()
//!         .backend_address("/var/tmp/spdk.sock")
//!         .build()?;
//!
//!     let mut subsystem = NvmeSubsystem::default();
//!     subsystem.spec.nqn = "nqn.2022-09.io.spdk:opi3".into();
//!     let created = bridge
//!         .nvme()
//!         .create_nvme_subsystem(CreateNvmeSubsystemRequest {
//!             nvme_subsystem_id: "subsystem-test".into(),
//!             nvme_subsystem: Some(subsystem),
//!         })
//!         .await?;
//!     println!("{} runs {}", created.name, created.status.firmware_revision);
//!
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod cancel;
pub mod config;
pub mod error;
pub mod fieldmask;
pub mod frontend;
pub mod inventory;
pub mod jsonrpc;
pub mod middleend;
pub mod models;
pub mod naming;
pub mod pagination;
pub mod services;
pub mod spdk;

// Re-export commonly used types
pub use bridge::{Bridge, BridgeBuilder};
pub use cancel::CancellationToken;
pub use config::BridgeConfig;
pub use error::{BridgeError, Code, Result};
pub use fieldmask::FieldMask;
pub use frontend::FrontendService;
pub use jsonrpc::{JsonRpcClient, StubBackend, StubReply};
pub use middleend::MiddleendService;
pub use pagination::Paginator;
pub use services::{
    EncryptedVolumeService, NvmeControllerService, NvmeNamespaceService, NvmeSubsystemService,
};
