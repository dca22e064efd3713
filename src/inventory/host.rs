//! Host and datacenter records for the conductor inventory.
//!
//! Hosts are produced by the parser only and never mutated afterwards. A
//! new parse builds new records.

use serde::{Deserialize, Serialize};

/// A host discovered in the inventory document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Host {
    /// Fully qualified domain name, the host's identity
    pub fqdn: String,

    /// Name of the group that first listed this host
    pub group_id: String,

    /// Datacenter name ("" when the service did not report one)
    pub datacenter_id: String,
}

impl Host {
    /// Create a new host record
    pub fn new(
        fqdn: impl Into<String>,
        group_id: impl Into<String>,
        datacenter_id: impl Into<String>,
    ) -> Self {
        Self {
            fqdn: fqdn.into(),
            group_id: group_id.into(),
            datacenter_id: datacenter_id.into(),
        }
    }

    /// Whether the service reported a datacenter for this host
    pub fn has_datacenter(&self) -> bool {
        !self.datacenter_id.is_empty()
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fqdn)
    }
}

/// A datacenter, deduplicated by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Datacenter {
    /// Datacenter name; "" stands for "unspecified"
    pub name: String,
}

impl Datacenter {
    /// Create a new datacenter record
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl std::fmt::Display for Datacenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "(unspecified)")
        } else {
            write!(f, "{}", self.name)
        }
    }
}
