//! Resource identities and names.
//!
//! Every resource is keyed by a hierarchical name such as
//! `nvmeSubsystems/subsystem-test/nvmeNamespaces/namespace-test`. The final
//! segment is the resource id: either supplied by the caller (and then
//! restricted to lowercase letters, digits and hyphens) or generated.

use crate::{BridgeError, Result};
use regex::Regex;
use std::sync::LazyLock;

pub const SUBSYSTEMS: &str = "nvmeSubsystems";
pub const CONTROLLERS: &str = "nvmeControllers";
pub const NAMESPACES: &str = "nvmeNamespaces";
pub const VOLUMES: &str = "volumes";

static USER_SETTABLE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?$").unwrap());

static NAME_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._~-]+$").unwrap());

/// Check a caller-supplied resource id.
pub fn validate_user_settable_id(id: &str) -> Result<()> {
    if USER_SETTABLE_ID.is_match(id) {
        Ok(())
    } else {
        Err(BridgeError::invalid_argument(format!(
            "user-settable ID must only contain lowercase, numbers and hyphens (got: '{}')",
            id
        )))
    }
}

/// Return the caller's id after validation, or a fresh system-generated one.
pub fn resolve_id(requested: &str) -> Result<String> {
    if requested.is_empty() {
        return Ok(uuid::Uuid::new_v4().to_string());
    }
    validate_user_settable_id(requested)?;
    Ok(requested.to_string())
}

/// Check the syntax of a full resource name.
pub fn validate_resource_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BridgeError::missing_field("name"));
    }
    let segments: Vec<&str> = name.split('/').collect();
    if segments.len() % 2 != 0 {
        return Err(BridgeError::invalid_argument(format!(
            "resource name '{}' must alternate collection and id segments",
            name
        )));
    }
    for (index, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            return Err(BridgeError::invalid_argument(format!(
                "resource name '{}': segment {} is empty",
                name, index
            )));
        }
        if !NAME_SEGMENT.is_match(segment) {
            return Err(BridgeError::invalid_argument(format!(
                "resource name '{}': segment {} ('{}') contains invalid characters",
                name, index, segment
            )));
        }
    }
    Ok(())
}

/// Check that `name` is well formed and a member of `collection`.
pub fn validate_name_in(name: &str, collection: &str) -> Result<()> {
    validate_resource_name(name)?;
    let mut segments = name.rsplit('/').skip(1);
    if segments.next() != Some(collection) {
        return Err(BridgeError::invalid_argument(format!(
            "resource name '{}' is not in collection {}",
            name, collection
        )));
    }
    Ok(())
}

pub fn subsystem_name(id: &str) -> String {
    format!("{}/{}", SUBSYSTEMS, id)
}

pub fn controller_name(subsystem: &str, id: &str) -> String {
    format!("{}/{}/{}", subsystem, CONTROLLERS, id)
}

pub fn namespace_name(subsystem: &str, id: &str) -> String {
    format!("{}/{}/{}", subsystem, NAMESPACES, id)
}

pub fn volume_name(id: &str) -> String {
    format!("{}/{}", VOLUMES, id)
}

/// Final segment of a resource name.
pub fn resource_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Name of the owning resource, for names nested below another resource.
pub fn parent_name(name: &str) -> Option<&str> {
    let (rest, _id) = name.rsplit_once('/')?;
    let (parent, _collection) = rest.rsplit_once('/')?;
    Some(parent)
}
