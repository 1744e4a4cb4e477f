//! NVMe subsystem, controller and namespace handlers.

use super::{parse_params, to_result};
use crate::server::AppState;
use serde_json::{json, Value};
use spdk_bridge::{NvmeControllerService, NvmeNamespaceService, NvmeSubsystemService, Result};

// Subsystems

pub async fn create_nvme_subsystem(state: &AppState, params: &Value) -> Result<Value> {
    let subsystem = state
        .bridge
        .nvme()
        .create_nvme_subsystem(parse_params(params)?)
        .await?;
    to_result(&subsystem)
}

pub async fn delete_nvme_subsystem(state: &AppState, params: &Value) -> Result<Value> {
    state
        .bridge
        .nvme()
        .delete_nvme_subsystem(parse_params(params)?)
        .await?;
    Ok(json!({}))
}

pub async fn update_nvme_subsystem(state: &AppState, params: &Value) -> Result<Value> {
    let subsystem = state
        .bridge
        .nvme()
        .update_nvme_subsystem(parse_params(params)?)
        .await?;
    to_result(&subsystem)
}

pub async fn list_nvme_subsystems(state: &AppState, params: &Value) -> Result<Value> {
    let response = state
        .bridge
        .nvme()
        .list_nvme_subsystems(parse_params(params)?)
        .await?;
    to_result(&response)
}

pub async fn get_nvme_subsystem(state: &AppState, params: &Value) -> Result<Value> {
    let subsystem = state
        .bridge
        .nvme()
        .get_nvme_subsystem(parse_params(params)?)
        .await?;
    to_result(&subsystem)
}

pub async fn stats_nvme_subsystem(state: &AppState, params: &Value) -> Result<Value> {
    let response = state
        .bridge
        .nvme()
        .stats_nvme_subsystem(parse_params(params)?)
        .await?;
    to_result(&response)
}

// Controllers

pub async fn create_nvme_controller(state: &AppState, params: &Value) -> Result<Value> {
    let controller = state
        .bridge
        .nvme()
        .create_nvme_controller(parse_params(params)?)
        .await?;
    to_result(&controller)
}

pub async fn delete_nvme_controller(state: &AppState, params: &Value) -> Result<Value> {
    state
        .bridge
        .nvme()
        .delete_nvme_controller(parse_params(params)?)
        .await?;
    Ok(json!({}))
}

pub async fn update_nvme_controller(state: &AppState, params: &Value) -> Result<Value> {
    let controller = state
        .bridge
        .nvme()
        .update_nvme_controller(parse_params(params)?)
        .await?;
    to_result(&controller)
}

pub async fn list_nvme_controllers(state: &AppState, params: &Value) -> Result<Value> {
    let response = state
        .bridge
        .nvme()
        .list_nvme_controllers(parse_params(params)?)
        .await?;
    to_result(&response)
}

pub async fn get_nvme_controller(state: &AppState, params: &Value) -> Result<Value> {
    let controller = state
        .bridge
        .nvme()
        .get_nvme_controller(parse_params(params)?)
        .await?;
    to_result(&controller)
}

pub async fn stats_nvme_controller(state: &AppState, params: &Value) -> Result<Value> {
    let response = state
        .bridge
        .nvme()
        .stats_nvme_controller(parse_params(params)?)
        .await?;
    to_result(&response)
}

// Namespaces

pub async fn create_nvme_namespace(state: &AppState, params: &Value) -> Result<Value> {
    let namespace = state
        .bridge
        .nvme()
        .create_nvme_namespace(parse_params(params)?)
        .await?;
    to_result(&namespace)
}

pub async fn delete_nvme_namespace(state: &AppState, params: &Value) -> Result<Value> {
    state
        .bridge
        .nvme()
        .delete_nvme_namespace(parse_params(params)?)
        .await?;
    Ok(json!({}))
}

pub async fn update_nvme_namespace(state: &AppState, params: &Value) -> Result<Value> {
    let namespace = state
        .bridge
        .nvme()
        .update_nvme_namespace(parse_params(params)?)
        .await?;
    to_result(&namespace)
}

pub async fn list_nvme_namespaces(state: &AppState, params: &Value) -> Result<Value> {
    let response = state
        .bridge
        .nvme()
        .list_nvme_namespaces(parse_params(params)?)
        .await?;
    to_result(&response)
}

pub async fn get_nvme_namespace(state: &AppState, params: &Value) -> Result<Value> {
    let namespace = state
        .bridge
        .nvme()
        .get_nvme_namespace(parse_params(params)?)
        .await?;
    to_result(&namespace)
}

pub async fn stats_nvme_namespace(state: &AppState, params: &Value) -> Result<Value> {
    let response = state
        .bridge
        .nvme()
        .stats_nvme_namespace(parse_params(params)?)
        .await?;
    to_result(&response)
}
