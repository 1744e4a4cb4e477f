//! Typed resources, requests and responses of the storage API.

pub mod encryption;
pub mod nvme;
pub mod stats;

pub use encryption::{
    CreateEncryptedVolumeRequest, EncryptedVolume, EncryptionType, KeyMaterial,
    ListEncryptedVolumesRequest, ListEncryptedVolumesResponse, UpdateEncryptedVolumeRequest,
};
pub use nvme::{
    CreateNvmeControllerRequest, CreateNvmeNamespaceRequest, CreateNvmeSubsystemRequest,
    DeleteRequest, FabricsEndpoint, GetRequest, ListNvmeControllersRequest,
    ListNvmeControllersResponse, ListNvmeNamespacesRequest, ListNvmeNamespacesResponse,
    ListNvmeSubsystemsRequest, ListNvmeSubsystemsResponse, NvmeController, NvmeControllerSpec,
    NvmeControllerStatus, NvmeNamespace, NvmeNamespaceSpec, NvmeNamespaceStatus, NvmeSubsystem,
    NvmeSubsystemSpec, NvmeSubsystemStatus, NvmeTransportType, PciEndpoint, PciOperState,
    PciState, StatsRequest, StatsResponse, UpdateNvmeControllerRequest,
    UpdateNvmeNamespaceRequest, UpdateNvmeSubsystemRequest,
};
pub use stats::{VolumeStats, NOT_REPORTED};
