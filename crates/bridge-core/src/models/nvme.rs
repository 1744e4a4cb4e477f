//! NVMe subsystem, controller and namespace resources.

use crate::fieldmask::FieldMask;
use crate::models::VolumeStats;
use crate::{BridgeError, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Subsystem
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeSubsystem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub spec: NvmeSubsystemSpec,
    #[serde(default)]
    pub status: NvmeSubsystemStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeSubsystemSpec {
    #[serde(default)]
    pub nqn: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub model_number: String,
    /// Zero lets the target pick its default.
    #[serde(default)]
    pub max_namespaces: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeSubsystemStatus {
    #[serde(default)]
    pub firmware_revision: String,
}

impl NvmeSubsystem {
    /// Fields an update mask may name.
    pub const UPDATABLE_FIELDS: &'static [&'static str] = &[
        "spec",
        "spec.serial_number",
        "spec.model_number",
        "spec.max_namespaces",
    ];
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateNvmeSubsystemRequest {
    #[serde(default)]
    pub nvme_subsystem_id: String,
    #[serde(default)]
    pub nvme_subsystem: Option<NvmeSubsystem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNvmeSubsystemRequest {
    #[serde(default)]
    pub nvme_subsystem: Option<NvmeSubsystem>,
    #[serde(default)]
    pub update_mask: FieldMask,
    #[serde(default)]
    pub allow_missing: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListNvmeSubsystemsRequest {
    #[serde(default)]
    pub page_size: i32,
    #[serde(default)]
    pub page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListNvmeSubsystemsResponse {
    pub nvme_subsystems: Vec<NvmeSubsystem>,
    pub next_page_token: String,
}

// ============================================================================
// Controller
// ============================================================================

/// How a controller is exposed to hosts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NvmeTransportType {
    #[default]
    Tcp,
    VfioUser,
}

impl NvmeTransportType {
    /// Transport name understood by the SPDK target.
    pub fn as_spdk(&self) -> &'static str {
        match self {
            NvmeTransportType::Tcp => "TCP",
            NvmeTransportType::VfioUser => "VFIOUSER",
        }
    }
}

/// NVMe-oF endpoint of a TCP controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricsEndpoint {
    pub traddr: String,
    pub trsvcid: String,
    #[serde(default = "default_adrfam")]
    pub adrfam: String,
}

fn default_adrfam() -> String {
    "ipv4".to_string()
}

impl FabricsEndpoint {
    /// Parse `host:port`; bracketed hosts are IPv6. An IPv6 host must be
    /// bracketed, since its colons are otherwise ambiguous with the port.
    pub fn parse(address: &str) -> Result<Self> {
        let invalid = || BridgeError::Config {
            message: format!("listen address must be host:port (got: '{}')", address),
        };
        let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() || port.parse::<u16>().is_err() {
            return Err(invalid());
        }
        let (traddr, adrfam) = match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            Some(v6) => (v6.to_string(), "ipv6".to_string()),
            None if host.contains(':') => return Err(invalid()),
            None => (host.to_string(), default_adrfam()),
        };
        Ok(Self {
            traddr,
            trsvcid: port.to_string(),
            adrfam,
        })
    }
}

/// PCIe function a vfio-user controller is presented as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PciEndpoint {
    #[serde(default)]
    pub port_id: u32,
    #[serde(default)]
    pub physical_function: u32,
    #[serde(default)]
    pub virtual_function: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeControllerSpec {
    #[serde(default)]
    pub nvme_controller_id: i32,
    #[serde(default)]
    pub trtype: NvmeTransportType,
    #[serde(default)]
    pub fabrics_id: Option<FabricsEndpoint>,
    #[serde(default)]
    pub pcie_id: Option<PciEndpoint>,
    #[serde(default)]
    pub max_nsq: u32,
    #[serde(default)]
    pub max_ncq: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeControllerStatus {
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeController {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub spec: NvmeControllerSpec,
    #[serde(default)]
    pub status: NvmeControllerStatus,
}

impl NvmeController {
    /// Queue limits only; the listener itself cannot move without a re-create.
    pub const UPDATABLE_FIELDS: &'static [&'static str] =
        &["spec.max_nsq", "spec.max_ncq", "spec.nvme_controller_id"];
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateNvmeControllerRequest {
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub nvme_controller_id: String,
    #[serde(default)]
    pub nvme_controller: Option<NvmeController>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNvmeControllerRequest {
    #[serde(default)]
    pub nvme_controller: Option<NvmeController>,
    #[serde(default)]
    pub update_mask: FieldMask,
    #[serde(default)]
    pub allow_missing: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListNvmeControllersRequest {
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub page_size: i32,
    #[serde(default)]
    pub page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListNvmeControllersResponse {
    pub nvme_controllers: Vec<NvmeController>,
    pub next_page_token: String,
}

// ============================================================================
// Namespace
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PciState {
    #[default]
    Unspecified,
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PciOperState {
    #[default]
    Unspecified,
    Online,
    Offline,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeNamespaceSpec {
    /// Namespace id seen by hosts; zero lets the target choose.
    #[serde(default)]
    pub host_nsid: i32,
    #[serde(default)]
    pub volume_name_ref: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub nguid: Option<String>,
    #[serde(default)]
    pub eui64: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeNamespaceStatus {
    #[serde(default)]
    pub pci_state: PciState,
    #[serde(default)]
    pub pci_oper_state: PciOperState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeNamespace {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub spec: NvmeNamespaceSpec,
    #[serde(default)]
    pub status: NvmeNamespaceStatus,
}

impl NvmeNamespace {
    /// Identifiers only; the backing volume and nsid are fixed at creation.
    pub const UPDATABLE_FIELDS: &'static [&'static str] =
        &["spec.uuid", "spec.nguid", "spec.eui64"];
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateNvmeNamespaceRequest {
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub nvme_namespace_id: String,
    #[serde(default)]
    pub nvme_namespace: Option<NvmeNamespace>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNvmeNamespaceRequest {
    #[serde(default)]
    pub nvme_namespace: Option<NvmeNamespace>,
    #[serde(default)]
    pub update_mask: FieldMask,
    #[serde(default)]
    pub allow_missing: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListNvmeNamespacesRequest {
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub page_size: i32,
    #[serde(default)]
    pub page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListNvmeNamespacesResponse {
    pub nvme_namespaces: Vec<NvmeNamespace>,
    pub next_page_token: String,
}

// ============================================================================
// Shared request shapes
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub allow_missing: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub stats: VolumeStats,
}
