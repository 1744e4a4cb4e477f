//! Parameter and result shapes of the SPDK JSON-RPC methods the bridge uses.
//!
//! Field names follow the SPDK wire format exactly; optional fields are
//! skipped when unset so the target applies its own defaults.

use serde::{Deserialize, Serialize};

/// Backend method names.
pub mod method {
    pub const SPDK_GET_VERSION: &str = "spdk_get_version";
    pub const NVMF_CREATE_SUBSYSTEM: &str = "nvmf_create_subsystem";
    pub const NVMF_DELETE_SUBSYSTEM: &str = "nvmf_delete_subsystem";
    pub const NVMF_SUBSYSTEM_ADD_LISTENER: &str = "nvmf_subsystem_add_listener";
    pub const NVMF_SUBSYSTEM_REMOVE_LISTENER: &str = "nvmf_subsystem_remove_listener";
    pub const NVMF_SUBSYSTEM_ADD_NS: &str = "nvmf_subsystem_add_ns";
    pub const NVMF_SUBSYSTEM_REMOVE_NS: &str = "nvmf_subsystem_remove_ns";
    pub const ACCEL_CRYPTO_KEY_CREATE: &str = "accel_crypto_key_create";
    pub const ACCEL_CRYPTO_KEY_DESTROY: &str = "accel_crypto_key_destroy";
    pub const BDEV_CRYPTO_CREATE: &str = "bdev_crypto_create";
    pub const BDEV_CRYPTO_DELETE: &str = "bdev_crypto_delete";
    pub const BDEV_GET_IOSTAT: &str = "bdev_get_iostat";
}

/// Result of `spdk_get_version`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetVersionResult {
    pub version: String,
    #[serde(default)]
    pub fields: VersionFields,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionFields {
    #[serde(default)]
    pub major: i32,
    #[serde(default)]
    pub minor: i32,
    #[serde(default)]
    pub patch: i32,
    #[serde(default)]
    pub suffix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NvmfCreateSubsystemParams {
    pub nqn: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub serial_number: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub model_number: String,
    pub allow_any_host: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_namespaces: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NvmfDeleteSubsystemParams {
    pub nqn: String,
}

/// NVMe-oF listener address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenAddress {
    pub trtype: String,
    pub traddr: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trsvcid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub adrfam: Option<String>,
}

/// Params of `nvmf_subsystem_add_listener` and `nvmf_subsystem_remove_listener`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NvmfSubsystemListenerParams {
    pub nqn: String,
    pub listen_address: ListenAddress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NvmfNamespaceParams {
    pub nsid: i32,
    pub bdev_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub nguid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub eui64: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NvmfSubsystemAddNsParams {
    pub nqn: String,
    pub namespace: NvmfNamespaceParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NvmfSubsystemRemoveNsParams {
    pub nqn: String,
    pub nsid: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccelCryptoKeyCreateParams {
    pub cipher: String,
    pub name: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub key2: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccelCryptoKeyDestroyParams {
    pub key_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BdevCryptoCreateParams {
    pub base_bdev_name: String,
    pub name: String,
    pub key_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BdevCryptoDeleteParams {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BdevGetIostatParams {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
}

/// Result of `bdev_get_iostat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BdevGetIostatResult {
    #[serde(default)]
    pub tick_rate: u64,
    #[serde(default)]
    pub ticks: u64,
    #[serde(default)]
    pub bdevs: Vec<BdevIostat>,
}

/// Per-bdev counters. Targets differ in which counters they report, so every
/// counter is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BdevIostat {
    pub name: String,
    #[serde(default)]
    pub bytes_read: Option<u64>,
    #[serde(default)]
    pub num_read_ops: Option<u64>,
    #[serde(default)]
    pub bytes_written: Option<u64>,
    #[serde(default)]
    pub num_write_ops: Option<u64>,
    #[serde(default)]
    pub bytes_unmapped: Option<u64>,
    #[serde(default)]
    pub num_unmap_ops: Option<u64>,
    #[serde(default)]
    pub read_latency_ticks: Option<u64>,
    #[serde(default)]
    pub write_latency_ticks: Option<u64>,
    #[serde(default)]
    pub unmap_latency_ticks: Option<u64>,
}
