//! Inventory topology for conductor-inventory.
//!
//! This module provides:
//! - The host, group, datacenter and work group records
//! - Parsing of the conductor dynamic inventory document
//! - The local cache file store
//! - The remote fetcher for the inventory service
//! - The loader that ties them together with a local fallback

pub mod cache;
pub mod fetch;
pub mod group;
pub mod host;
pub mod loader;
pub mod parser;

pub use cache::CacheStore;
pub use fetch::{Fetch, RemoteFetcher};
pub use group::{Group, WorkGroup};
pub use host::{Datacenter, Host};
pub use loader::{LoadSource, Loader, LoaderState};
pub use parser::{InventoryParser, MalformedEntryPolicy};

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;

/// An immutable snapshot of the inventory topology
///
/// Each successful parse produces a new snapshot; the loader swaps it in as
/// a whole so readers never see a mix of two parses.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    /// All hosts, in the order they were first listed
    hosts: Vec<Host>,

    /// All groups, in document order
    groups: Vec<Group>,

    /// Distinct datacenters, in first-occurrence order
    datacenters: Vec<Datacenter>,

    /// Always empty, see [`WorkGroup`]
    work_groups: Vec<WorkGroup>,

    /// Child group name to parent group name
    parents: IndexMap<String, String>,

    host_index: HashMap<String, usize>,
    group_index: HashMap<String, usize>,
}

impl Inventory {
    /// Create an empty inventory
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        hosts: Vec<Host>,
        groups: Vec<Group>,
        datacenters: Vec<Datacenter>,
        parents: IndexMap<String, String>,
    ) -> Self {
        let host_index = hosts
            .iter()
            .enumerate()
            .map(|(i, h)| (h.fqdn.clone(), i))
            .collect();
        let group_index = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.name.clone(), i))
            .collect();

        Self {
            hosts,
            groups,
            datacenters,
            work_groups: Vec::new(),
            parents,
            host_index,
            group_index,
        }
    }

    /// All hosts
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// All groups
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// All datacenters
    pub fn datacenters(&self) -> &[Datacenter] {
        &self.datacenters
    }

    /// All work groups
    pub fn work_groups(&self) -> &[WorkGroup] {
        &self.work_groups
    }

    /// The resolved child to parent mapping
    pub fn parents(&self) -> &IndexMap<String, String> {
        &self.parents
    }

    /// Get a host by its FQDN
    pub fn get_host(&self, fqdn: &str) -> Option<&Host> {
        self.host_index.get(fqdn).map(|&i| &self.hosts[i])
    }

    /// Get a group by name
    pub fn get_group(&self, name: &str) -> Option<&Group> {
        self.group_index.get(name).map(|&i| &self.groups[i])
    }

    /// Parent of a group, if one was declared
    pub fn parent_of(&self, group: &str) -> Option<&str> {
        self.parents.get(group).map(String::as_str)
    }

    /// Hosts referenced by a group, in the order the group listed them
    pub fn group_hosts<'a>(&'a self, group: &'a Group) -> impl Iterator<Item = &'a Host> + 'a {
        group.hosts.iter().filter_map(move |&i| self.hosts.get(i))
    }

    /// Hosts located in a datacenter
    pub fn hosts_in_datacenter<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Host> + 'a {
        self.hosts.iter().filter(move |h| h.datacenter_id == name)
    }

    /// Get the number of hosts
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Get the number of groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Whether the inventory holds no hosts and no groups
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.groups.is_empty()
    }
}

/// Read and refresh API the cluster-execution tool programs against
pub trait InventoryBackend: Send + Sync {
    /// Load the inventory, trusting a fresh local cache
    fn load(&self) -> Result<LoadSource>;

    /// Refresh the inventory from the service, falling back to the cache
    fn reload(&self) -> Result<LoadSource>;

    /// The currently published snapshot
    fn snapshot(&self) -> Arc<Inventory>;

    /// Current hosts
    fn hosts(&self) -> Vec<Host> {
        self.snapshot().hosts().to_vec()
    }

    /// Current groups
    fn groups(&self) -> Vec<Group> {
        self.snapshot().groups().to_vec()
    }

    /// Current datacenters
    fn datacenters(&self) -> Vec<Datacenter> {
        self.snapshot().datacenters().to_vec()
    }

    /// Current work groups
    fn work_groups(&self) -> Vec<WorkGroup> {
        self.snapshot().work_groups().to_vec()
    }
}

impl std::fmt::Display for Inventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Inventory:")?;
        writeln!(f, "  Hosts: {}", self.hosts.len())?;
        writeln!(f, "  Groups: {}", self.groups.len())?;
        write!(f, "  Datacenters: {}", self.datacenters.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Inventory {
        let hosts = vec![
            Host::new("a.x", "g1", "dc1"),
            Host::new("b.x", "g2", ""),
        ];
        let mut g1 = Group::new("g1", "");
        g1.add_host(0);
        let mut g2 = Group::new("g2", "g1");
        g2.add_host(1);
        g2.add_host(0);
        let mut parents = IndexMap::new();
        parents.insert("g2".to_string(), "g1".to_string());

        Inventory::from_parts(
            hosts,
            vec![g1, g2],
            vec![Datacenter::new("dc1"), Datacenter::new("")],
            parents,
        )
    }

    #[test]
    fn test_empty_inventory() {
        let inv = Inventory::new();
        assert!(inv.is_empty());
        assert_eq!(inv.host_count(), 0);
        assert!(inv.work_groups().is_empty());
    }

    #[test]
    fn test_lookups() {
        let inv = sample();
        assert_eq!(inv.get_host("b.x").unwrap().group_id, "g2");
        assert!(inv.get_host("c.x").is_none());
        assert_eq!(inv.get_group("g2").unwrap().parent_id, "g1");
        assert_eq!(inv.parent_of("g2"), Some("g1"));
        assert_eq!(inv.parent_of("g1"), None);
    }

    #[test]
    fn test_group_hosts_follow_group_order() {
        let inv = sample();
        let g2 = inv.get_group("g2").unwrap();
        let names: Vec<&str> = inv.group_hosts(g2).map(|h| h.fqdn.as_str()).collect();
        assert_eq!(names, vec!["b.x", "a.x"]);
    }

    #[test]
    fn test_hosts_in_datacenter() {
        let inv = sample();
        let unspecified: Vec<_> = inv.hosts_in_datacenter("").collect();
        assert_eq!(unspecified.len(), 1);
        assert_eq!(unspecified[0].fqdn, "b.x");
    }
}
