//! In-memory record of the resources this bridge has created.
//!
//! The backend does not report back the API-level view of what it holds, so
//! the bridge keeps its own authoritative collections keyed by full resource
//! name. Entries are never evicted; they leave only through Delete.
//!
//! # Thread Safety
//!
//! [`Inventory`] itself is plain data. The bridge guards it with a single
//! `tokio::sync::Mutex` and keeps the guard across the backend calls of a
//! mutation, so a child creation cannot race the deletion of its parent.

use crate::models::{EncryptedVolume, NvmeController, NvmeNamespace, NvmeSubsystem};
use crate::naming;
use crate::{BridgeError, Result};
use std::collections::HashMap;

/// Anything stored in the inventory.
pub trait Record: Clone {
    fn name(&self) -> &str;
}

impl Record for NvmeSubsystem {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Record for NvmeController {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Record for NvmeNamespace {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Record for EncryptedVolume {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Default)]
pub struct Inventory {
    pub subsystems: HashMap<String, NvmeSubsystem>,
    pub controllers: HashMap<String, NvmeController>,
    pub namespaces: HashMap<String, NvmeNamespace>,
    pub volumes: HashMap<String, EncryptedVolume>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a subsystem, failing with not-found.
    pub fn subsystem(&self, name: &str) -> Result<&NvmeSubsystem> {
        lookup(&self.subsystems, name)
    }

    pub fn controller(&self, name: &str) -> Result<&NvmeController> {
        lookup(&self.controllers, name)
    }

    pub fn namespace(&self, name: &str) -> Result<&NvmeNamespace> {
        lookup(&self.namespaces, name)
    }

    pub fn volume(&self, name: &str) -> Result<&EncryptedVolume> {
        lookup(&self.volumes, name)
    }

    /// Number of controllers and namespaces owned by `parent`.
    pub fn child_count(&self, parent: &str) -> usize {
        let owned = |name: &String| naming::parent_name(name) == Some(parent);
        self.controllers.keys().filter(|n| owned(n)).count()
            + self.namespaces.keys().filter(|n| owned(n)).count()
    }

    /// Namespaces of `subsystem`, sorted by name.
    pub fn namespaces_of(&self, subsystem: &str) -> Vec<NvmeNamespace> {
        children(&self.namespaces, subsystem)
    }

    pub fn controllers_of(&self, subsystem: &str) -> Vec<NvmeController> {
        children(&self.controllers, subsystem)
    }
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, name: &str) -> Result<&'a T> {
    map.get(name).ok_or_else(|| BridgeError::not_found(name))
}

/// Every record of a collection, sorted by name.
pub fn sorted<T: Record>(map: &HashMap<String, T>) -> Vec<T> {
    let mut items: Vec<T> = map.values().cloned().collect();
    items.sort_by(|a, b| a.name().cmp(b.name()));
    items
}

/// Records directly owned by `parent`, sorted by name.
pub fn children<T: Record>(map: &HashMap<String, T>, parent: &str) -> Vec<T> {
    let mut items: Vec<T> = map
        .values()
        .filter(|r| naming::parent_name(r.name()) == Some(parent))
        .cloned()
        .collect();
    items.sort_by(|a, b| a.name().cmp(b.name()));
    items
}
