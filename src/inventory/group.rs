//! Group and work group records for the conductor inventory.

use serde::{Deserialize, Serialize};

/// A group of hosts
///
/// `hosts` holds positions in the owning [`Inventory`](super::Inventory)'s
/// flat host list rather than the hosts themselves; resolve them with
/// [`Inventory::group_hosts`](super::Inventory::group_hosts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group name, unique within an inventory
    pub name: String,

    /// Parent group name ("" for a root group)
    pub parent_id: String,

    /// Indices into the inventory's host list, in document order
    #[serde(skip)]
    pub(crate) hosts: Vec<usize>,
}

impl Group {
    /// Create a new group without hosts
    pub fn new(name: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_id: parent_id.into(),
            hosts: Vec::new(),
        }
    }

    /// Whether this group sits at the top of the hierarchy
    pub fn is_root(&self) -> bool {
        self.parent_id.is_empty()
    }

    /// Number of hosts referenced by this group
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub(crate) fn add_host(&mut self, index: usize) {
        if !self.hosts.contains(&index) {
            self.hosts.push(index);
        }
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} hosts", self.name, self.hosts.len())?;
        if !self.parent_id.is_empty() {
            write!(f, ", parent {}", self.parent_id)?;
        }
        write!(f, ")")
    }
}

/// A work group (project) known to the inventory service
///
/// The service document carries no work group data, so inventories never
/// contain any. Requested work group names only scope the remote query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkGroup {
    /// Work group name
    pub name: String,
}

impl WorkGroup {
    /// Create a new work group record
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
