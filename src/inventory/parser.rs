//! Parser for the conductor dynamic inventory document.
//!
//! The service answers with an Ansible-style dynamic inventory:
//!
//! ```json
//! {
//!   "_meta": { "hostvars": { "web1.example.net": { "dc": "dc1" } } },
//!   "frontend": { "children": ["web"] },
//!   "web": { "hosts": ["web1.example.net"] }
//! }
//! ```
//!
//! Parent relationships are resolved in a first pass over every group, so
//! the result never depends on the order in which groups are visited. Group
//! records are built in a second pass from the completed mapping.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use super::{Datacenter, Group, Host, Inventory};
use crate::error::{Error, Result};

/// Reserved top-level key holding per-host attributes
pub const META_KEY: &str = "_meta";

/// Key of the host attribute table inside [`META_KEY`]
pub const HOSTVARS_KEY: &str = "hostvars";

/// Host attribute naming the datacenter
pub const DATACENTER_ATTR: &str = "dc";

/// What to do with entries that do not match the document schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedEntryPolicy {
    /// Drop the offending entry and keep parsing
    #[default]
    Skip,
    /// Fail the whole parse
    Reject,
}

impl std::fmt::Display for MalformedEntryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MalformedEntryPolicy::Skip => write!(f, "skip"),
            MalformedEntryPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Key of a group's host list
const HOSTS_KEY: &str = "hosts";

/// Key of a group's child group list
const CHILDREN_KEY: &str = "children";

/// Group descriptor: `{"hosts": [...], "children": [...]}`
///
/// List items stay untyped so a single bad item can be dropped without
/// losing the rest of the group.
#[derive(Debug, Clone, Copy)]
struct GroupDescriptor<'a> {
    hosts: &'a [Value],
    children: &'a [Value],
}

/// Converts raw inventory documents into [`Inventory`] snapshots
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryParser {
    policy: MalformedEntryPolicy,
}

impl InventoryParser {
    /// Create a parser with the given malformed-entry policy
    pub fn new(policy: MalformedEntryPolicy) -> Self {
        Self { policy }
    }

    /// The malformed-entry policy in effect
    pub fn policy(&self) -> MalformedEntryPolicy {
        self.policy
    }

    /// Parse a raw document into a new inventory snapshot
    pub fn parse(&self, data: &[u8]) -> Result<Inventory> {
        let document: IndexMap<String, Value> = serde_json::from_slice(data)?;

        let meta = document
            .get(META_KEY)
            .and_then(Value::as_object)
            .ok_or_else(|| Error::format("missing _meta section"))?;
        let hostvars = meta
            .get(HOSTVARS_KEY)
            .and_then(Value::as_object)
            .ok_or_else(|| Error::format("missing hostvars section"))?;

        // First pass: decode descriptors and resolve every parent edge.
        let mut descriptors: Vec<(&str, GroupDescriptor<'_>)> = Vec::with_capacity(document.len());
        let mut parents: IndexMap<String, String> = IndexMap::new();

        for (name, value) in &document {
            if name == META_KEY {
                continue;
            }

            let Some(descriptor) = self.descriptor(name, value)? else {
                continue;
            };

            for child in descriptor.children {
                let Some(child) = child.as_str() else {
                    self.malformed(format!("group '{}' lists a non-string child: {}", name, child))?;
                    continue;
                };
                if !parents.contains_key(child) {
                    parents.insert(child.to_string(), name.clone());
                }
            }

            descriptors.push((name.as_str(), descriptor));
        }

        // Second pass: groups, hosts and datacenters from the completed map.
        let mut hosts: Vec<Host> = Vec::new();
        let mut host_positions: IndexMap<String, usize> = IndexMap::new();
        let mut groups: Vec<Group> = Vec::with_capacity(descriptors.len());
        let mut datacenters: IndexSet<String> = IndexSet::new();

        for (name, descriptor) in descriptors {
            let parent = parents.get(name).cloned().unwrap_or_default();
            let mut group = Group::new(name, parent);

            for entry in descriptor.hosts {
                let Some(fqdn) = entry.as_str() else {
                    self.malformed(format!("group '{}' lists a non-string host: {}", name, entry))?;
                    continue;
                };

                if let Some(&index) = host_positions.get(fqdn) {
                    group.add_host(index);
                    continue;
                }

                let Some(attributes) = hostvars.get(fqdn) else {
                    trace!(host = fqdn, group = name, "host has no hostvars entry, skipping");
                    continue;
                };
                let Some(dc) = self.datacenter(fqdn, attributes)? else {
                    continue;
                };

                let index = hosts.len();
                datacenters.insert(dc.clone());
                hosts.push(Host::new(fqdn, name, dc));
                host_positions.insert(fqdn.to_string(), index);
                group.add_host(index);
            }

            groups.push(group);
        }

        debug!(
            hosts = hosts.len(),
            groups = groups.len(),
            datacenters = datacenters.len(),
            "parsed inventory document"
        );

        Ok(Inventory::from_parts(
            hosts,
            groups,
            datacenters.into_iter().map(Datacenter::new).collect(),
            parents,
        ))
    }

    /// Decode a group descriptor, `None` when the group must be dropped
    ///
    /// Only a value that is not an object drops the group; a list field of
    /// the wrong type is treated as empty.
    fn descriptor<'a>(
        &self,
        name: &str,
        value: &'a Value,
    ) -> Result<Option<GroupDescriptor<'a>>> {
        let Some(fields) = value.as_object() else {
            self.malformed(format!("group '{}' is not an object: {}", name, value))?;
            return Ok(None);
        };

        Ok(Some(GroupDescriptor {
            hosts: self.list(name, HOSTS_KEY, fields.get(HOSTS_KEY))?,
            children: self.list(name, CHILDREN_KEY, fields.get(CHILDREN_KEY))?,
        }))
    }

    fn list<'a>(&self, group: &str, key: &str, value: Option<&'a Value>) -> Result<&'a [Value]> {
        match value {
            None | Some(Value::Null) => Ok(Default::default()),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(other) => {
                self.malformed(format!(
                    "group '{}' has a non-list '{}': {}",
                    group, key, other
                ))?;
                Ok(Default::default())
            }
        }
    }

    /// Datacenter of a host, `None` when the host entry must be dropped
    fn datacenter(&self, fqdn: &str, attributes: &Value) -> Result<Option<String>> {
        let Some(attributes) = attributes.as_object() else {
            self.malformed(format!("hostvars for '{}' are not an object: {}", fqdn, attributes))?;
            return Ok(None);
        };

        match attributes.get(DATACENTER_ATTR) {
            None | Some(Value::Null) => Ok(Some(String::new())),
            Some(Value::String(dc)) => Ok(Some(dc.clone())),
            Some(other) => {
                self.malformed(format!(
                    "hostvars for '{}' have a non-string {}: {}",
                    fqdn, DATACENTER_ATTR, other
                ))?;
                Ok(Some(String::new()))
            }
        }
    }

    fn malformed(&self, message: String) -> Result<()> {
        match self.policy {
            MalformedEntryPolicy::Skip => {
                debug!("skipping malformed inventory entry: {}", message);
                Ok(())
            }
            MalformedEntryPolicy::Reject => Err(Error::Format(message)),
        }
    }
}
