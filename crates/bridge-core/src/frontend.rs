//! NVMe frontend: subsystems, the controllers exposing them, and their
//! namespaces.
//!
//! Every mutation holds the inventory lock across its backend calls, so the
//! parent check of a child creation and the child-count check of a parent
//! deletion cannot interleave.

use crate::bridge::BridgeState;
use crate::fieldmask::FieldMask;
use crate::inventory;
use crate::models::{
    CreateNvmeControllerRequest, CreateNvmeNamespaceRequest, CreateNvmeSubsystemRequest,
    DeleteRequest, FabricsEndpoint, GetRequest, ListNvmeControllersRequest,
    ListNvmeControllersResponse, ListNvmeNamespacesRequest, ListNvmeNamespacesResponse,
    ListNvmeSubsystemsRequest, ListNvmeSubsystemsResponse, NvmeController, NvmeControllerSpec,
    NvmeControllerStatus, NvmeNamespace, NvmeNamespaceStatus, NvmeSubsystem, NvmeSubsystemStatus,
    NvmeTransportType, PciOperState, PciState, StatsRequest, StatsResponse,
    UpdateNvmeControllerRequest, UpdateNvmeNamespaceRequest, UpdateNvmeSubsystemRequest,
    VolumeStats,
};
use crate::naming;
use crate::services::{NvmeControllerService, NvmeNamespaceService, NvmeSubsystemService};
use crate::spdk::{self, method};
use crate::{BridgeError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Handlers for the NVMe resource kinds.
#[derive(Debug, Clone)]
pub struct FrontendService {
    state: Arc<BridgeState>,
}

impl FrontendService {
    pub(crate) fn new(state: Arc<BridgeState>) -> Self {
        Self { state }
    }

    /// Sum the counters of every volume exported by `subsystem`.
    async fn subsystem_stats(&self, subsystem: &str) -> Result<VolumeStats> {
        let volumes: HashSet<String> = {
            let inventory = self.state.inventory.lock().await;
            inventory.subsystem(subsystem)?;
            inventory
                .namespaces_of(subsystem)
                .into_iter()
                .map(|ns| ns.spec.volume_name_ref)
                .collect()
        };

        let mut total = VolumeStats::unreported();
        if volumes.is_empty() {
            return Ok(total);
        }

        let iostat: spdk::BdevGetIostatResult = self
            .state
            .call(method::BDEV_GET_IOSTAT, &spdk::BdevGetIostatParams::default())
            .await?;
        for bdev in iostat.bdevs.iter().filter(|b| volumes.contains(&b.name)) {
            total.accumulate(&VolumeStats::from_iostat(bdev));
        }
        Ok(total)
    }

    fn vfio_dir(&self, controller_id: &str) -> PathBuf {
        self.state.config.vfio_ctrlr_dir.join(controller_id)
    }

    /// Remove a controller's vfio-user directory along with the socket files
    /// the target left in it.
    async fn remove_vfio_dir(&self, controller_id: &str) {
        let dir = self.vfio_dir(controller_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => debug!("Removed {}", dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", dir.display(), e),
        }
    }

    async fn add_listener(&self, params: &spdk::NvmfSubsystemListenerParams, name: &str) -> Result<()> {
        let created: bool = self
            .state
            .call(method::NVMF_SUBSYSTEM_ADD_LISTENER, params)
            .await?;
        if !created {
            return Err(BridgeError::invalid_argument(format!(
                "Could not create CTRL: {}",
                name
            )));
        }
        Ok(())
    }

    fn listen_address(
        &self,
        controller_id: &str,
        spec: &NvmeControllerSpec,
    ) -> Result<spdk::ListenAddress> {
        match spec.trtype {
            NvmeTransportType::Tcp => {
                let endpoint = match &spec.fabrics_id {
                    Some(endpoint) => endpoint.clone(),
                    None => FabricsEndpoint::parse(&self.state.config.tcp_listen)?,
                };
                Ok(spdk::ListenAddress {
                    trtype: spec.trtype.as_spdk().to_string(),
                    traddr: endpoint.traddr,
                    trsvcid: Some(endpoint.trsvcid),
                    adrfam: Some(endpoint.adrfam),
                })
            }
            NvmeTransportType::VfioUser => Ok(spdk::ListenAddress {
                trtype: spec.trtype.as_spdk().to_string(),
                traddr: self.vfio_dir(controller_id).display().to_string(),
                trsvcid: None,
                adrfam: None,
            }),
        }
    }
}

fn merge_subsystem(current: &NvmeSubsystem, update: &NvmeSubsystem, mask: &FieldMask) -> NvmeSubsystem {
    let mut merged = current.clone();
    if mask.covers("spec.serial_number") {
        merged.spec.serial_number = update.spec.serial_number.clone();
    }
    if mask.covers("spec.model_number") {
        merged.spec.model_number = update.spec.model_number.clone();
    }
    if mask.covers("spec.max_namespaces") {
        merged.spec.max_namespaces = update.spec.max_namespaces;
    }
    merged
}

fn merge_controller(
    current: &NvmeController,
    update: &NvmeController,
    mask: &FieldMask,
) -> NvmeController {
    let mut merged = current.clone();
    if mask.covers("spec.nvme_controller_id") {
        merged.spec.nvme_controller_id = update.spec.nvme_controller_id;
    }
    if mask.covers("spec.max_nsq") {
        merged.spec.max_nsq = update.spec.max_nsq;
    }
    if mask.covers("spec.max_ncq") {
        merged.spec.max_ncq = update.spec.max_ncq;
    }
    merged
}

fn merge_namespace(current: &NvmeNamespace, update: &NvmeNamespace, mask: &FieldMask) -> NvmeNamespace {
    let mut merged = current.clone();
    if mask.covers("spec.uuid") {
        merged.spec.uuid = update.spec.uuid.clone();
    }
    if mask.covers("spec.nguid") {
        merged.spec.nguid = update.spec.nguid.clone();
    }
    if mask.covers("spec.eui64") {
        merged.spec.eui64 = update.spec.eui64.clone();
    }
    merged
}

/// Split a child name into its parent and id for create-on-update.
fn split_child(name: &str) -> Result<(String, String)> {
    let parent = naming::parent_name(name).ok_or_else(|| {
        BridgeError::invalid_argument(format!("resource name '{}' has no parent", name))
    })?;
    Ok((parent.to_string(), naming::resource_id(name).to_string()))
}

// ============================================================================
// Subsystems
// ============================================================================

#[async_trait]
impl NvmeSubsystemService for FrontendService {
    async fn create_nvme_subsystem(&self, req: CreateNvmeSubsystemRequest) -> Result<NvmeSubsystem> {
        let mut subsystem = req
            .nvme_subsystem
            .ok_or_else(|| BridgeError::missing_field("nvme_subsystem"))?;
        if subsystem.spec.nqn.is_empty() {
            return Err(BridgeError::missing_field("nvme_subsystem.spec.nqn"));
        }
        let id = naming::resolve_id(&req.nvme_subsystem_id)?;
        let name = naming::subsystem_name(&id);

        let mut inventory = self.state.inventory.lock().await;
        if let Some(existing) = inventory.subsystems.get(&name) {
            warn!("Subsystem {} already exists, returning existing record", name);
            return Ok(existing.clone());
        }

        let params = spdk::NvmfCreateSubsystemParams {
            nqn: subsystem.spec.nqn.clone(),
            serial_number: subsystem.spec.serial_number.clone(),
            model_number: subsystem.spec.model_number.clone(),
            allow_any_host: true,
            max_namespaces: Some(subsystem.spec.max_namespaces).filter(|n| *n > 0),
        };
        let created: bool = self
            .state
            .call(method::NVMF_CREATE_SUBSYSTEM, &params)
            .await?;
        if !created {
            return Err(BridgeError::invalid_argument(format!(
                "Could not create NQN: {}",
                params.nqn
            )));
        }

        let version: spdk::GetVersionResult =
            self.state.call(method::SPDK_GET_VERSION, &()).await?;

        subsystem.name = name.clone();
        subsystem.status = NvmeSubsystemStatus {
            firmware_revision: version.version,
        };
        inventory.subsystems.insert(name.clone(), subsystem.clone());
        info!("Created subsystem {} ({})", name, subsystem.spec.nqn);
        Ok(subsystem)
    }

    async fn delete_nvme_subsystem(&self, req: DeleteRequest) -> Result<()> {
        naming::validate_name_in(&req.name, naming::SUBSYSTEMS)?;

        let mut inventory = self.state.inventory.lock().await;
        let Some(subsystem) = inventory.subsystems.get(&req.name).cloned() else {
            if req.allow_missing {
                debug!("Subsystem {} already absent", req.name);
                return Ok(());
            }
            return Err(BridgeError::not_found(&req.name));
        };

        let children = inventory.child_count(&req.name);
        if children > 0 {
            return Err(BridgeError::FailedPrecondition {
                message: format!(
                    "cannot delete {}: {} controllers or namespaces still attached",
                    req.name, children
                ),
            });
        }

        let params = spdk::NvmfDeleteSubsystemParams {
            nqn: subsystem.spec.nqn.clone(),
        };
        let deleted: bool = self
            .state
            .call(method::NVMF_DELETE_SUBSYSTEM, &params)
            .await?;
        if !deleted {
            return Err(BridgeError::invalid_argument(format!(
                "Could not delete NQN: {}",
                params.nqn
            )));
        }

        inventory.subsystems.remove(&req.name);
        info!("Deleted subsystem {}", req.name);
        Ok(())
    }

    async fn update_nvme_subsystem(&self, req: UpdateNvmeSubsystemRequest) -> Result<NvmeSubsystem> {
        let update = req
            .nvme_subsystem
            .ok_or_else(|| BridgeError::missing_field("nvme_subsystem"))?;
        naming::validate_name_in(&update.name, naming::SUBSYSTEMS)?;
        req.update_mask.validate(NvmeSubsystem::UPDATABLE_FIELDS)?;

        let mut inventory = self.state.inventory.lock().await;
        let Some(current) = inventory.subsystems.get(&update.name).cloned() else {
            if !req.allow_missing {
                return Err(BridgeError::not_found(&update.name));
            }
            drop(inventory);
            info!("Subsystem {} missing, creating it", update.name);
            let id = naming::resource_id(&update.name).to_string();
            return self
                .create_nvme_subsystem(CreateNvmeSubsystemRequest {
                    nvme_subsystem_id: id,
                    nvme_subsystem: Some(update),
                })
                .await;
        };

        let merged = merge_subsystem(&current, &update, &req.update_mask);
        inventory.subsystems.insert(merged.name.clone(), merged.clone());
        debug!("Updated subsystem {}", merged.name);
        Ok(merged)
    }

    async fn list_nvme_subsystems(
        &self,
        req: ListNvmeSubsystemsRequest,
    ) -> Result<ListNvmeSubsystemsResponse> {
        let window = self.state.paginator.page(req.page_size, &req.page_token).await?;
        let items = inventory::sorted(&self.state.inventory.lock().await.subsystems);
        let (nvme_subsystems, next_page_token) =
            self.state.paginator.limit_to_page(window, &items).await;
        Ok(ListNvmeSubsystemsResponse {
            nvme_subsystems,
            next_page_token,
        })
    }

    async fn get_nvme_subsystem(&self, req: GetRequest) -> Result<NvmeSubsystem> {
        naming::validate_name_in(&req.name, naming::SUBSYSTEMS)?;
        let inventory = self.state.inventory.lock().await;
        inventory.subsystem(&req.name).cloned()
    }

    async fn stats_nvme_subsystem(&self, req: StatsRequest) -> Result<StatsResponse> {
        naming::validate_name_in(&req.name, naming::SUBSYSTEMS)?;
        let stats = self.subsystem_stats(&req.name).await?;
        Ok(StatsResponse { stats })
    }
}

// ============================================================================
// Controllers
// ============================================================================

#[async_trait]
impl NvmeControllerService for FrontendService {
    async fn create_nvme_controller(
        &self,
        req: CreateNvmeControllerRequest,
    ) -> Result<NvmeController> {
        if req.parent.is_empty() {
            return Err(BridgeError::missing_field("parent"));
        }
        naming::validate_name_in(&req.parent, naming::SUBSYSTEMS)?;
        let mut controller = req
            .nvme_controller
            .ok_or_else(|| BridgeError::missing_field("nvme_controller"))?;
        let id = naming::resolve_id(&req.nvme_controller_id)?;
        let name = naming::controller_name(&req.parent, &id);

        let mut inventory = self.state.inventory.lock().await;
        let nqn = inventory.subsystem(&req.parent)?.spec.nqn.clone();
        if let Some(existing) = inventory.controllers.get(&name) {
            warn!("Controller {} already exists, returning existing record", name);
            return Ok(existing.clone());
        }

        match controller.spec.trtype {
            NvmeTransportType::Tcp => {
                if controller.spec.fabrics_id.is_none() {
                    controller.spec.fabrics_id =
                        Some(FabricsEndpoint::parse(&self.state.config.tcp_listen)?);
                }
            }
            NvmeTransportType::VfioUser => {
                let dir = self.vfio_dir(&id);
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| BridgeError::io_with_path(e, &dir))?;
            }
        }

        let params = spdk::NvmfSubsystemListenerParams {
            nqn,
            listen_address: self.listen_address(&id, &controller.spec)?,
        };
        if let Err(err) = self.add_listener(&params, &name).await {
            if controller.spec.trtype == NvmeTransportType::VfioUser {
                self.remove_vfio_dir(&id).await;
            }
            return Err(err);
        }

        controller.name = name.clone();
        controller.status = NvmeControllerStatus { active: true };
        inventory.controllers.insert(name.clone(), controller.clone());
        info!(
            "Created controller {} listening on {}",
            name, params.listen_address.traddr
        );
        Ok(controller)
    }

    async fn delete_nvme_controller(&self, req: DeleteRequest) -> Result<()> {
        naming::validate_name_in(&req.name, naming::CONTROLLERS)?;

        let mut inventory = self.state.inventory.lock().await;
        let Some(controller) = inventory.controllers.get(&req.name).cloned() else {
            if req.allow_missing {
                debug!("Controller {} already absent", req.name);
                return Ok(());
            }
            return Err(BridgeError::not_found(&req.name));
        };
        let (parent, id) = split_child(&req.name)?;
        let nqn = inventory.subsystem(&parent)?.spec.nqn.clone();

        let params = spdk::NvmfSubsystemListenerParams {
            nqn,
            listen_address: self.listen_address(&id, &controller.spec)?,
        };
        let deleted: bool = self
            .state
            .call(method::NVMF_SUBSYSTEM_REMOVE_LISTENER, &params)
            .await?;
        if !deleted {
            return Err(BridgeError::invalid_argument(format!(
                "Could not delete CTRL: {}",
                req.name
            )));
        }

        inventory.controllers.remove(&req.name);
        if controller.spec.trtype == NvmeTransportType::VfioUser {
            self.remove_vfio_dir(&id).await;
        }
        info!("Deleted controller {}", req.name);
        Ok(())
    }

    async fn update_nvme_controller(
        &self,
        req: UpdateNvmeControllerRequest,
    ) -> Result<NvmeController> {
        let update = req
            .nvme_controller
            .ok_or_else(|| BridgeError::missing_field("nvme_controller"))?;
        naming::validate_name_in(&update.name, naming::CONTROLLERS)?;
        req.update_mask.validate(NvmeController::UPDATABLE_FIELDS)?;

        let mut inventory = self.state.inventory.lock().await;
        let Some(current) = inventory.controllers.get(&update.name).cloned() else {
            if !req.allow_missing {
                return Err(BridgeError::not_found(&update.name));
            }
            drop(inventory);
            info!("Controller {} missing, creating it", update.name);
            let (parent, id) = split_child(&update.name)?;
            return self
                .create_nvme_controller(CreateNvmeControllerRequest {
                    parent,
                    nvme_controller_id: id,
                    nvme_controller: Some(update),
                })
                .await;
        };

        let merged = merge_controller(&current, &update, &req.update_mask);
        inventory.controllers.insert(merged.name.clone(), merged.clone());
        debug!("Updated controller {}", merged.name);
        Ok(merged)
    }

    async fn list_nvme_controllers(
        &self,
        req: ListNvmeControllersRequest,
    ) -> Result<ListNvmeControllersResponse> {
        if req.parent.is_empty() {
            return Err(BridgeError::missing_field("parent"));
        }
        naming::validate_name_in(&req.parent, naming::SUBSYSTEMS)?;
        let window = self.state.paginator.page(req.page_size, &req.page_token).await?;
        let items = {
            let inventory = self.state.inventory.lock().await;
            inventory.subsystem(&req.parent)?;
            inventory.controllers_of(&req.parent)
        };
        let (nvme_controllers, next_page_token) =
            self.state.paginator.limit_to_page(window, &items).await;
        Ok(ListNvmeControllersResponse {
            nvme_controllers,
            next_page_token,
        })
    }

    async fn get_nvme_controller(&self, req: GetRequest) -> Result<NvmeController> {
        naming::validate_name_in(&req.name, naming::CONTROLLERS)?;
        let inventory = self.state.inventory.lock().await;
        inventory.controller(&req.name).cloned()
    }

    async fn stats_nvme_controller(&self, req: StatsRequest) -> Result<StatsResponse> {
        naming::validate_name_in(&req.name, naming::CONTROLLERS)?;
        let parent = {
            let inventory = self.state.inventory.lock().await;
            inventory.controller(&req.name)?;
            split_child(&req.name)?.0
        };
        let stats = self.subsystem_stats(&parent).await?;
        Ok(StatsResponse { stats })
    }
}

// ============================================================================
// Namespaces
// ============================================================================

#[async_trait]
impl NvmeNamespaceService for FrontendService {
    async fn create_nvme_namespace(&self, req: CreateNvmeNamespaceRequest) -> Result<NvmeNamespace> {
        if req.parent.is_empty() {
            return Err(BridgeError::missing_field("parent"));
        }
        naming::validate_name_in(&req.parent, naming::SUBSYSTEMS)?;
        let mut namespace = req
            .nvme_namespace
            .ok_or_else(|| BridgeError::missing_field("nvme_namespace"))?;
        if namespace.spec.volume_name_ref.is_empty() {
            return Err(BridgeError::missing_field(
                "nvme_namespace.spec.volume_name_ref",
            ));
        }
        if namespace.spec.host_nsid < 0 {
            return Err(BridgeError::invalid_argument(format!(
                "host_nsid must not be negative (got: {})",
                namespace.spec.host_nsid
            )));
        }
        let id = naming::resolve_id(&req.nvme_namespace_id)?;
        let name = naming::namespace_name(&req.parent, &id);

        let mut inventory = self.state.inventory.lock().await;
        let nqn = inventory.subsystem(&req.parent)?.spec.nqn.clone();
        if let Some(existing) = inventory.namespaces.get(&name) {
            warn!("Namespace {} already exists, returning existing record", name);
            return Ok(existing.clone());
        }

        let params = spdk::NvmfSubsystemAddNsParams {
            nqn,
            namespace: spdk::NvmfNamespaceParams {
                nsid: namespace.spec.host_nsid,
                bdev_name: namespace.spec.volume_name_ref.clone(),
                uuid: namespace.spec.uuid.clone(),
                nguid: namespace.spec.nguid.clone(),
                eui64: namespace.spec.eui64.clone(),
            },
        };
        let nsid: i32 = self
            .state
            .call(method::NVMF_SUBSYSTEM_ADD_NS, &params)
            .await?;
        if nsid <= 0 {
            return Err(BridgeError::invalid_argument(format!(
                "Could not create NS: {}",
                name
            )));
        }

        namespace.name = name.clone();
        namespace.spec.host_nsid = nsid;
        namespace.status = NvmeNamespaceStatus {
            pci_state: PciState::Enabled,
            pci_oper_state: PciOperState::Online,
        };
        inventory.namespaces.insert(name.clone(), namespace.clone());
        info!(
            "Created namespace {} (nsid {}) on {}",
            name, nsid, namespace.spec.volume_name_ref
        );
        Ok(namespace)
    }

    async fn delete_nvme_namespace(&self, req: DeleteRequest) -> Result<()> {
        naming::validate_name_in(&req.name, naming::NAMESPACES)?;

        let mut inventory = self.state.inventory.lock().await;
        let Some(namespace) = inventory.namespaces.get(&req.name).cloned() else {
            if req.allow_missing {
                debug!("Namespace {} already absent", req.name);
                return Ok(());
            }
            return Err(BridgeError::not_found(&req.name));
        };
        let (parent, _) = split_child(&req.name)?;
        let nqn = inventory.subsystem(&parent)?.spec.nqn.clone();

        let params = spdk::NvmfSubsystemRemoveNsParams {
            nqn,
            nsid: namespace.spec.host_nsid,
        };
        let deleted: bool = self
            .state
            .call(method::NVMF_SUBSYSTEM_REMOVE_NS, &params)
            .await?;
        if !deleted {
            return Err(BridgeError::invalid_argument(format!(
                "Could not delete NS: {}",
                req.name
            )));
        }

        inventory.namespaces.remove(&req.name);
        info!("Deleted namespace {}", req.name);
        Ok(())
    }

    async fn update_nvme_namespace(&self, req: UpdateNvmeNamespaceRequest) -> Result<NvmeNamespace> {
        let update = req
            .nvme_namespace
            .ok_or_else(|| BridgeError::missing_field("nvme_namespace"))?;
        naming::validate_name_in(&update.name, naming::NAMESPACES)?;
        req.update_mask.validate(NvmeNamespace::UPDATABLE_FIELDS)?;

        let mut inventory = self.state.inventory.lock().await;
        let Some(current) = inventory.namespaces.get(&update.name).cloned() else {
            if !req.allow_missing {
                return Err(BridgeError::not_found(&update.name));
            }
            drop(inventory);
            info!("Namespace {} missing, creating it", update.name);
            let (parent, id) = split_child(&update.name)?;
            return self
                .create_nvme_namespace(CreateNvmeNamespaceRequest {
                    parent,
                    nvme_namespace_id: id,
                    nvme_namespace: Some(update),
                })
                .await;
        };

        let merged = merge_namespace(&current, &update, &req.update_mask);
        inventory.namespaces.insert(merged.name.clone(), merged.clone());
        debug!("Updated namespace {}", merged.name);
        Ok(merged)
    }

    async fn list_nvme_namespaces(
        &self,
        req: ListNvmeNamespacesRequest,
    ) -> Result<ListNvmeNamespacesResponse> {
        if req.parent.is_empty() {
            return Err(BridgeError::missing_field("parent"));
        }
        naming::validate_name_in(&req.parent, naming::SUBSYSTEMS)?;
        let window = self.state.paginator.page(req.page_size, &req.page_token).await?;
        let items = {
            let inventory = self.state.inventory.lock().await;
            inventory.subsystem(&req.parent)?;
            inventory.namespaces_of(&req.parent)
        };
        let (nvme_namespaces, next_page_token) =
            self.state.paginator.limit_to_page(window, &items).await;
        Ok(ListNvmeNamespacesResponse {
            nvme_namespaces,
            next_page_token,
        })
    }

    async fn get_nvme_namespace(&self, req: GetRequest) -> Result<NvmeNamespace> {
        naming::validate_name_in(&req.name, naming::NAMESPACES)?;
        let inventory = self.state.inventory.lock().await;
        inventory.namespace(&req.name).cloned()
    }

    async fn stats_nvme_namespace(&self, req: StatsRequest) -> Result<StatsResponse> {
        naming::validate_name_in(&req.name, naming::NAMESPACES)?;
        let volume = {
            let inventory = self.state.inventory.lock().await;
            inventory.namespace(&req.name)?.spec.volume_name_ref.clone()
        };

        let params = spdk::BdevGetIostatParams {
            name: Some(volume.clone()),
        };
        let iostat: spdk::BdevGetIostatResult =
            self.state.call(method::BDEV_GET_IOSTAT, &params).await?;
        let stats = iostat
            .bdevs
            .iter()
            .find(|b| b.name == volume)
            .map(VolumeStats::from_iostat)
            .unwrap_or_default();
        Ok(StatsResponse { stats })
    }
}
