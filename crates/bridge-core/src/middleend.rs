//! Middle-end: encrypted volumes.
//!
//! An encrypted volume is two backend objects, an accel crypto key and a
//! crypto bdev stacked on the base volume. Creation makes the key first and
//! the device second; deletion tears them down in reverse order. A failed
//! device step leaves the key behind unless rollback is enabled in
//! [`crate::config::BridgeConfig`].

use crate::bridge::BridgeState;
use crate::fieldmask::FieldMask;
use crate::inventory;
use crate::models::{
    CreateEncryptedVolumeRequest, DeleteRequest, EncryptedVolume, GetRequest,
    ListEncryptedVolumesRequest, ListEncryptedVolumesResponse, StatsRequest, StatsResponse,
    UpdateEncryptedVolumeRequest, VolumeStats,
};
use crate::naming;
use crate::services::EncryptedVolumeService;
use crate::spdk::{self, method};
use crate::{BridgeError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Name of the accel key backing the crypto bdev `bdev`.
pub fn key_name(bdev: &str) -> String {
    format!("{}-key", bdev)
}

/// Handlers for encrypted volumes.
#[derive(Debug, Clone)]
pub struct MiddleendService {
    state: Arc<BridgeState>,
}

impl MiddleendService {
    pub(crate) fn new(state: Arc<BridgeState>) -> Self {
        Self { state }
    }

    /// Create key then device for the crypto bdev `bdev`.
    async fn realize(&self, bdev: &str, volume: &EncryptedVolume) -> Result<()> {
        let key_name = key_name(bdev);
        let (key, key2) = volume.key.xts_halves();
        let params = spdk::AccelCryptoKeyCreateParams {
            cipher: volume.cipher.as_spdk().to_string(),
            name: key_name.clone(),
            key,
            key2: Some(key2),
        };
        let created: bool = self
            .state
            .call(method::ACCEL_CRYPTO_KEY_CREATE, &params)
            .await?;
        if !created {
            return Err(BridgeError::invalid_argument(format!(
                "Could not create Crypto Key: {}",
                key_name
            )));
        }

        if let Err(err) = self.create_device(bdev, &key_name, volume).await {
            if self.state.config.rollback_partial_create {
                warn!("Crypto device {} failed, destroying key {}", bdev, key_name);
                if let Err(cleanup) = self.destroy_key(&key_name).await {
                    error!("Rollback of key {} failed: {}", key_name, cleanup);
                }
            } else {
                warn!(
                    "Crypto device {} failed, key {} left in place",
                    bdev, key_name
                );
            }
            return Err(err);
        }
        Ok(())
    }

    async fn create_device(&self, bdev: &str, key_name: &str, volume: &EncryptedVolume) -> Result<()> {
        let params = spdk::BdevCryptoCreateParams {
            base_bdev_name: volume.volume_name_ref.clone(),
            name: bdev.to_string(),
            key_name: key_name.to_string(),
        };
        let device: String = self.state.call(method::BDEV_CRYPTO_CREATE, &params).await?;
        if device.is_empty() {
            return Err(BridgeError::invalid_argument(format!(
                "Could not create Crypto Dev: {}",
                bdev
            )));
        }
        Ok(())
    }

    async fn destroy_key(&self, key_name: &str) -> Result<()> {
        let params = spdk::AccelCryptoKeyDestroyParams {
            key_name: key_name.to_string(),
        };
        let destroyed: bool = self
            .state
            .call(method::ACCEL_CRYPTO_KEY_DESTROY, &params)
            .await?;
        if !destroyed {
            return Err(BridgeError::invalid_argument(format!(
                "Could not destroy Crypto Key: {}",
                key_name
            )));
        }
        Ok(())
    }

    /// Delete device then key for the crypto bdev `bdev`.
    async fn teardown(&self, bdev: &str) -> Result<()> {
        let params = spdk::BdevCryptoDeleteParams {
            name: bdev.to_string(),
        };
        let deleted: bool = self
            .state
            .call(method::BDEV_CRYPTO_DELETE, &params)
            .await?;
        if !deleted {
            return Err(BridgeError::invalid_argument(format!(
                "Could not delete Crypto Dev: {}",
                bdev
            )));
        }
        self.destroy_key(&key_name(bdev)).await
    }
}

fn merge_volume(current: &EncryptedVolume, update: &EncryptedVolume, mask: &FieldMask) -> EncryptedVolume {
    let mut merged = current.clone();
    if mask.covers("volume_name_ref") {
        merged.volume_name_ref = update.volume_name_ref.clone();
    }
    if mask.covers("key") {
        merged.key = update.key.clone();
    }
    if mask.covers("cipher") {
        merged.cipher = update.cipher;
    }
    merged
}

fn validate_volume(volume: &EncryptedVolume) -> Result<()> {
    if volume.volume_name_ref.is_empty() {
        return Err(BridgeError::missing_field("encrypted_volume.volume_name_ref"));
    }
    volume.validate_key()
}

#[async_trait]
impl EncryptedVolumeService for MiddleendService {
    async fn create_encrypted_volume(
        &self,
        req: CreateEncryptedVolumeRequest,
    ) -> Result<EncryptedVolume> {
        let mut volume = req
            .encrypted_volume
            .ok_or_else(|| BridgeError::missing_field("encrypted_volume"))?;
        validate_volume(&volume)?;
        let id = naming::resolve_id(&req.encrypted_volume_id)?;
        let name = naming::volume_name(&id);

        let mut inventory = self.state.inventory.lock().await;
        if let Some(existing) = inventory.volumes.get(&name) {
            warn!("Encrypted volume {} already exists, returning existing record", name);
            return Ok(existing.clone());
        }

        self.realize(&id, &volume).await?;

        volume.name = name.clone();
        inventory.volumes.insert(name.clone(), volume.clone());
        info!(
            "Created encrypted volume {} over {}",
            name, volume.volume_name_ref
        );
        Ok(volume)
    }

    async fn delete_encrypted_volume(&self, req: DeleteRequest) -> Result<()> {
        naming::validate_name_in(&req.name, naming::VOLUMES)?;

        let mut inventory = self.state.inventory.lock().await;
        if !inventory.volumes.contains_key(&req.name) {
            if req.allow_missing {
                debug!("Encrypted volume {} already absent", req.name);
                return Ok(());
            }
            return Err(BridgeError::not_found(&req.name));
        }

        self.teardown(naming::resource_id(&req.name)).await?;

        inventory.volumes.remove(&req.name);
        info!("Deleted encrypted volume {}", req.name);
        Ok(())
    }

    async fn update_encrypted_volume(
        &self,
        req: UpdateEncryptedVolumeRequest,
    ) -> Result<EncryptedVolume> {
        let update = req
            .encrypted_volume
            .ok_or_else(|| BridgeError::missing_field("encrypted_volume"))?;
        naming::validate_name_in(&update.name, naming::VOLUMES)?;
        req.update_mask.validate(EncryptedVolume::UPDATABLE_FIELDS)?;

        let mut inventory = self.state.inventory.lock().await;
        let Some(current) = inventory.volumes.get(&update.name).cloned() else {
            if !req.allow_missing {
                return Err(BridgeError::not_found(&update.name));
            }
            drop(inventory);
            info!("Encrypted volume {} missing, creating it", update.name);
            let id = naming::resource_id(&update.name).to_string();
            return self
                .create_encrypted_volume(CreateEncryptedVolumeRequest {
                    encrypted_volume_id: id,
                    encrypted_volume: Some(update),
                })
                .await;
        };

        let merged = merge_volume(&current, &update, &req.update_mask);
        validate_volume(&merged)?;

        // The backend cannot rekey in place.
        let bdev = naming::resource_id(&merged.name).to_string();
        self.teardown(&bdev).await?;
        inventory.volumes.remove(&merged.name);
        self.realize(&bdev, &merged).await?;

        inventory.volumes.insert(merged.name.clone(), merged.clone());
        info!("Updated encrypted volume {}", merged.name);
        Ok(merged)
    }

    async fn list_encrypted_volumes(
        &self,
        req: ListEncryptedVolumesRequest,
    ) -> Result<ListEncryptedVolumesResponse> {
        let window = self.state.paginator.page(req.page_size, &req.page_token).await?;
        let items = inventory::sorted(&self.state.inventory.lock().await.volumes);
        let (encrypted_volumes, next_page_token) =
            self.state.paginator.limit_to_page(window, &items).await;
        Ok(ListEncryptedVolumesResponse {
            encrypted_volumes,
            next_page_token,
        })
    }

    async fn get_encrypted_volume(&self, req: GetRequest) -> Result<EncryptedVolume> {
        naming::validate_name_in(&req.name, naming::VOLUMES)?;
        let inventory = self.state.inventory.lock().await;
        inventory.volume(&req.name).cloned()
    }

    async fn stats_encrypted_volume(&self, req: StatsRequest) -> Result<StatsResponse> {
        naming::validate_name_in(&req.name, naming::VOLUMES)?;
        {
            let inventory = self.state.inventory.lock().await;
            inventory.volume(&req.name)?;
        }

        let bdev = naming::resource_id(&req.name);
        let params = spdk::BdevGetIostatParams {
            name: Some(bdev.to_string()),
        };
        let iostat: spdk::BdevGetIostatResult =
            self.state.call(method::BDEV_GET_IOSTAT, &params).await?;
        let stats = iostat
            .bdevs
            .iter()
            .find(|b| b.name == bdev)
            .map(VolumeStats::from_iostat)
            .unwrap_or_default();
        Ok(StatsResponse { stats })
    }
}
