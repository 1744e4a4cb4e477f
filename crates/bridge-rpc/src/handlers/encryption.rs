//! Encrypted-volume handlers.

use super::{parse_params, to_result};
use crate::server::AppState;
use serde_json::{json, Value};
use spdk_bridge::{EncryptedVolumeService, Result};

pub async fn create_encrypted_volume(state: &AppState, params: &Value) -> Result<Value> {
    let volume = state
        .bridge
        .encryption()
        .create_encrypted_volume(parse_params(params)?)
        .await?;
    to_result(&volume)
}

pub async fn delete_encrypted_volume(state: &AppState, params: &Value) -> Result<Value> {
    state
        .bridge
        .encryption()
        .delete_encrypted_volume(parse_params(params)?)
        .await?;
    Ok(json!({}))
}

pub async fn update_encrypted_volume(state: &AppState, params: &Value) -> Result<Value> {
    let volume = state
        .bridge
        .encryption()
        .update_encrypted_volume(parse_params(params)?)
        .await?;
    to_result(&volume)
}

pub async fn list_encrypted_volumes(state: &AppState, params: &Value) -> Result<Value> {
    let response = state
        .bridge
        .encryption()
        .list_encrypted_volumes(parse_params(params)?)
        .await?;
    to_result(&response)
}

pub async fn get_encrypted_volume(state: &AppState, params: &Value) -> Result<Value> {
    let volume = state
        .bridge
        .encryption()
        .get_encrypted_volume(parse_params(params)?)
        .await?;
    to_result(&volume)
}

pub async fn stats_encrypted_volume(state: &AppState, params: &Value) -> Result<Value> {
    let response = state
        .bridge
        .encryption()
        .stats_encrypted_volume(parse_params(params)?)
        .await?;
    to_result(&response)
}
