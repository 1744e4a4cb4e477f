//! JSON-RPC request handlers, split by domain.

mod encryption;
mod nvme;

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use spdk_bridge::{BridgeError, Result};
use std::sync::Arc;
use tracing::{debug, error, warn};

// ============================================================================
// JSON-RPC types
// ============================================================================

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Error response carrying the status class in `data.status`.
    pub fn failure(id: Option<Value>, err: &BridgeError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code: err.to_rpc_error_code(),
                message: err.to_string(),
                data: Some(json!({ "status": err.code().as_str() })),
            }),
            id,
        }
    }
}

// ============================================================================
// Parameter helpers
// ============================================================================

/// Decode the typed request of an operation from its params.
pub(crate) fn parse_params<T: DeserializeOwned>(params: &Value) -> Result<T> {
    T::deserialize(params).map_err(|e| BridgeError::invalid_argument(format!("invalid params: {}", e)))
}

pub(crate) fn to_result<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| BridgeError::Other(e.to_string()))
}

// ============================================================================
// Endpoints
// ============================================================================

/// Health check endpoint. Reports the SPDK version, or 503 if the daemon
/// does not answer.
pub async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.bridge.backend_version().await {
        Ok(version) => (
            StatusCode::OK,
            Json(json!({"status": "ok", "version": version.version})),
        ),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unavailable", "error": e.to_string()})),
            )
        }
    }
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let method = &request.method;
    let params = request.params.unwrap_or(Value::Object(Default::default()));
    let id = request.id.clone();

    debug!("RPC call: {}", method);

    match dispatch_method(&state, method, &params).await {
        Ok(value) => (StatusCode::OK, Json(JsonRpcResponse::success(id, value))),
        Err(e) => {
            error!("RPC error for {}: {}", method, e);
            (StatusCode::OK, Json(JsonRpcResponse::failure(id, &e)))
        }
    }
}

async fn dispatch_method(state: &AppState, method: &str, params: &Value) -> Result<Value> {
    match method {
        // NVMe subsystems
        "CreateNvmeSubsystem" => nvme::create_nvme_subsystem(state, params).await,
        "DeleteNvmeSubsystem" => nvme::delete_nvme_subsystem(state, params).await,
        "UpdateNvmeSubsystem" => nvme::update_nvme_subsystem(state, params).await,
        "ListNvmeSubsystems" => nvme::list_nvme_subsystems(state, params).await,
        "GetNvmeSubsystem" => nvme::get_nvme_subsystem(state, params).await,
        "StatsNvmeSubsystem" => nvme::stats_nvme_subsystem(state, params).await,

        // NVMe controllers
        "CreateNvmeController" => nvme::create_nvme_controller(state, params).await,
        "DeleteNvmeController" => nvme::delete_nvme_controller(state, params).await,
        "UpdateNvmeController" => nvme::update_nvme_controller(state, params).await,
        "ListNvmeControllers" => nvme::list_nvme_controllers(state, params).await,
        "GetNvmeController" => nvme::get_nvme_controller(state, params).await,
        "StatsNvmeController" => nvme::stats_nvme_controller(state, params).await,

        // NVMe namespaces
        "CreateNvmeNamespace" => nvme::create_nvme_namespace(state, params).await,
        "DeleteNvmeNamespace" => nvme::delete_nvme_namespace(state, params).await,
        "UpdateNvmeNamespace" => nvme::update_nvme_namespace(state, params).await,
        "ListNvmeNamespaces" => nvme::list_nvme_namespaces(state, params).await,
        "GetNvmeNamespace" => nvme::get_nvme_namespace(state, params).await,
        "StatsNvmeNamespace" => nvme::stats_nvme_namespace(state, params).await,

        // Encrypted volumes
        "CreateEncryptedVolume" => encryption::create_encrypted_volume(state, params).await,
        "DeleteEncryptedVolume" => encryption::delete_encrypted_volume(state, params).await,
        "UpdateEncryptedVolume" => encryption::update_encrypted_volume(state, params).await,
        "ListEncryptedVolumes" => encryption::list_encrypted_volumes(state, params).await,
        "GetEncryptedVolume" => encryption::get_encrypted_volume(state, params).await,
        "StatsEncryptedVolume" => encryption::stats_encrypted_volume(state, params).await,

        _ => Err(BridgeError::Unimplemented(format!(
            "Method not found: {}",
            method
        ))),
    }
}
