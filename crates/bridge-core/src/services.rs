//! Capability sets of the storage API, one trait per resource kind.
//!
//! Handler modules implement the traits they own; the network-facing server
//! only ever talks to these traits.

use crate::models::{
    CreateEncryptedVolumeRequest, CreateNvmeControllerRequest, CreateNvmeNamespaceRequest,
    CreateNvmeSubsystemRequest, DeleteRequest, EncryptedVolume, GetRequest,
    ListEncryptedVolumesRequest, ListEncryptedVolumesResponse, ListNvmeControllersRequest,
    ListNvmeControllersResponse, ListNvmeNamespacesRequest, ListNvmeNamespacesResponse,
    ListNvmeSubsystemsRequest, ListNvmeSubsystemsResponse, NvmeController, NvmeNamespace,
    NvmeSubsystem, StatsRequest, StatsResponse, UpdateEncryptedVolumeRequest,
    UpdateNvmeControllerRequest, UpdateNvmeNamespaceRequest, UpdateNvmeSubsystemRequest,
};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait NvmeSubsystemService: Send + Sync {
    async fn create_nvme_subsystem(&self, req: CreateNvmeSubsystemRequest) -> Result<NvmeSubsystem>;
    async fn delete_nvme_subsystem(&self, req: DeleteRequest) -> Result<()>;
    async fn update_nvme_subsystem(&self, req: UpdateNvmeSubsystemRequest) -> Result<NvmeSubsystem>;
    async fn list_nvme_subsystems(
        &self,
        req: ListNvmeSubsystemsRequest,
    ) -> Result<ListNvmeSubsystemsResponse>;
    async fn get_nvme_subsystem(&self, req: GetRequest) -> Result<NvmeSubsystem>;
    async fn stats_nvme_subsystem(&self, req: StatsRequest) -> Result<StatsResponse>;
}

#[async_trait]
pub trait NvmeControllerService: Send + Sync {
    async fn create_nvme_controller(&self, req: CreateNvmeControllerRequest)
        -> Result<NvmeController>;
    async fn delete_nvme_controller(&self, req: DeleteRequest) -> Result<()>;
    async fn update_nvme_controller(&self, req: UpdateNvmeControllerRequest)
        -> Result<NvmeController>;
    async fn list_nvme_controllers(
        &self,
        req: ListNvmeControllersRequest,
    ) -> Result<ListNvmeControllersResponse>;
    async fn get_nvme_controller(&self, req: GetRequest) -> Result<NvmeController>;
    async fn stats_nvme_controller(&self, req: StatsRequest) -> Result<StatsResponse>;
}

#[async_trait]
pub trait NvmeNamespaceService: Send + Sync {
    async fn create_nvme_namespace(&self, req: CreateNvmeNamespaceRequest) -> Result<NvmeNamespace>;
    async fn delete_nvme_namespace(&self, req: DeleteRequest) -> Result<()>;
    async fn update_nvme_namespace(&self, req: UpdateNvmeNamespaceRequest) -> Result<NvmeNamespace>;
    async fn list_nvme_namespaces(
        &self,
        req: ListNvmeNamespacesRequest,
    ) -> Result<ListNvmeNamespacesResponse>;
    async fn get_nvme_namespace(&self, req: GetRequest) -> Result<NvmeNamespace>;
    async fn stats_nvme_namespace(&self, req: StatsRequest) -> Result<StatsResponse>;
}

#[async_trait]
pub trait EncryptedVolumeService: Send + Sync {
    async fn create_encrypted_volume(
        &self,
        req: CreateEncryptedVolumeRequest,
    ) -> Result<EncryptedVolume>;
    async fn delete_encrypted_volume(&self, req: DeleteRequest) -> Result<()>;
    async fn update_encrypted_volume(
        &self,
        req: UpdateEncryptedVolumeRequest,
    ) -> Result<EncryptedVolume>;
    async fn list_encrypted_volumes(
        &self,
        req: ListEncryptedVolumesRequest,
    ) -> Result<ListEncryptedVolumesResponse>;
    async fn get_encrypted_volume(&self, req: GetRequest) -> Result<EncryptedVolume>;
    async fn stats_encrypted_volume(&self, req: StatsRequest) -> Result<StatsResponse>;
}
