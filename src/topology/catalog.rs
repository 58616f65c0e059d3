//! Topology catalog
//!
//! A read-only snapshot of the blade classes, node classes and networks
//! supplied by the cluster description. Components never mutate a snapshot
//! in place: write-back operations such as [`Topology::with_node_names`]
//! return a fresh snapshot, so there is nothing to invalidate or refetch.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;

// ============================================================================
// SBIO: Pure data structures
// ============================================================================

/// A blade instance: `(blade class, zero-based index)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BladeRef {
    pub blade_class: String,
    pub instance: usize,
}

impl BladeRef {
    pub fn new(blade_class: impl Into<String>, instance: usize) -> Self {
        Self {
            blade_class: blade_class.into(),
            instance,
        }
    }
}

impl fmt::Display for BladeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.blade_class, self.instance)
    }
}

/// A node instance: `(node class, zero-based index)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub node_class: String,
    pub instance: usize,
}

impl NodeRef {
    pub fn new(node_class: impl Into<String>, instance: usize) -> Self {
        Self {
            node_class: node_class.into(),
            instance,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.node_class, self.instance)
    }
}

/// A class of virtual blades
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BladeClass {
    pub name: String,

    /// Number of instances of this class
    #[serde(default)]
    pub count: usize,

    /// Base used to build per-instance hostnames (defaults to the class name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname_base: Option<String>,
}

impl BladeClass {
    pub fn new(name: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            count,
            hostname_base: None,
        }
    }

    /// Hostname used to reach a blade instance, e.g. `compute-001`
    pub fn hostname(&self, instance: usize) -> String {
        let base = self.hostname_base.as_deref().unwrap_or(&self.name);
        format!("{}-{:03}", base, instance + 1)
    }
}

/// Where the instances of a node class live
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HostBladeInfo {
    pub blade_class: String,

    /// Nodes of this class hosted per blade instance
    pub instance_capacity: usize,
}

/// A node class's presence on one network
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NodeInterface {
    pub network: String,

    /// IPv4 address per node instance; `None` (or a short list) means unassigned
    #[serde(default)]
    pub addresses: Vec<Option<Ipv4Addr>>,
}

/// A class of virtual nodes
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NodeClass {
    pub name: String,

    /// Number of instances of this class
    #[serde(default)]
    pub count: usize,

    pub host_blade: HostBladeInfo,

    /// Role in the target system, `role[:subrole]`. Classes without a role
    /// (installer nodes and the like) never receive an xname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname_base: Option<String>,

    /// Explicit canonical names by instance; unset entries fall back to
    /// `<hostname_base>-<NNN>`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_names: Vec<Option<String>>,

    #[serde(default)]
    pub interfaces: Vec<NodeInterface>,
}

impl NodeClass {
    pub fn new(
        name: impl Into<String>,
        count: usize,
        blade_class: impl Into<String>,
        instance_capacity: usize,
    ) -> Self {
        Self {
            name: name.into(),
            count,
            host_blade: HostBladeInfo {
                blade_class: blade_class.into(),
                instance_capacity,
            },
            node_role: None,
            hostname_base: None,
            node_names: Vec::new(),
            interfaces: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.node_role = Some(role.into());
        self
    }

    pub fn with_interface(mut self, network: impl Into<String>, addresses: Vec<Option<Ipv4Addr>>) -> Self {
        self.interfaces.push(NodeInterface {
            network: network.into(),
            addresses,
        });
        self
    }

    /// True when the class carries a non-empty role
    pub fn has_role(&self) -> bool {
        self.node_role.as_deref().is_some_and(|r| !r.is_empty())
    }

    /// The part of the role before any `:subrole` suffix
    pub fn primary_role(&self) -> Option<&str> {
        self.node_role
            .as_deref()
            .and_then(|r| r.split(':').next())
            .filter(|r| !r.is_empty())
    }

    /// Canonical name of a node instance
    pub fn node_name(&self, instance: usize) -> String {
        match self.node_names.get(instance) {
            Some(Some(name)) => name.clone(),
            _ => {
                let base = self.hostname_base.as_deref().unwrap_or(&self.name);
                format!("{}-{:03}", base, instance + 1)
            }
        }
    }

    /// Hostname of a node instance on a given network
    pub fn hostname(&self, instance: usize, network: &str) -> String {
        format!("{}-{}", self.node_name(instance), network)
    }

    /// Names of every network this class has an interface on
    pub fn network_names(&self) -> Vec<&str> {
        self.interfaces.iter().map(|i| i.network.as_str()).collect()
    }

    /// IPv4 address of a node instance on a network, if one is assigned
    pub fn ipv4_addr(&self, instance: usize, network: &str) -> Option<Ipv4Addr> {
        self.interfaces
            .iter()
            .find(|i| i.network == network)
            .and_then(|i| i.addresses.get(instance).copied().flatten())
    }
}

/// A logical network
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Network {
    pub name: String,

    pub ipv4_cidr: Ipv4Net,

    /// Semantic role, e.g. `HMN`, unique across networks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_role: Option<String>,
}

impl Network {
    pub fn new(name: impl Into<String>, ipv4_cidr: Ipv4Net) -> Self {
        Self {
            name: name.into(),
            ipv4_cidr,
            network_role: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.network_role = Some(role.into());
        self
    }
}

/// One DNS or NTP server record from the site configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ServerRecord {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Site-wide settings supplied by the provider
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub system_name: String,
    #[serde(default)]
    pub dns_servers: Vec<ServerRecord>,
    #[serde(default)]
    pub ntp_servers: Vec<ServerRecord>,
}

impl SiteConfig {
    /// Address of the first DNS server, or an empty string
    pub fn first_dns_address(&self) -> String {
        self.dns_servers
            .first()
            .and_then(|s| s.address.clone())
            .unwrap_or_default()
    }

    /// Each NTP server's hostname, falling back to its address when the
    /// hostname is absent or blank
    pub fn ntp_server_names(&self) -> Vec<String> {
        self.ntp_servers
            .iter()
            .filter_map(|s| {
                s.hostname
                    .clone()
                    .filter(|h| !h.is_empty())
                    .or_else(|| s.address.clone().filter(|a| !a.is_empty()))
            })
            .collect()
    }
}

/// Snapshot of the cluster topology
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Topology {
    #[serde(default)]
    pub blade_classes: Vec<BladeClass>,
    #[serde(default)]
    pub node_classes: Vec<NodeClass>,
    #[serde(default)]
    pub networks: Vec<Network>,
}

/// The complete cluster description document
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ClusterDescription {
    #[serde(default)]
    pub topology: Topology,
    #[serde(default)]
    pub site: SiteConfig,
}

// ============================================================================
// SBIO: Pure lookups
// ============================================================================

impl Topology {
    pub fn blade_class(&self, name: &str) -> Option<&BladeClass> {
        self.blade_classes.iter().find(|b| b.name == name)
    }

    pub fn node_class(&self, name: &str) -> Option<&NodeClass> {
        self.node_classes.iter().find(|n| n.name == name)
    }

    pub fn network(&self, name: &str) -> Option<&Network> {
        self.networks.iter().find(|n| n.name == name)
    }

    /// Instance count of a blade class, `None` when the class is unknown
    pub fn blade_count(&self, name: &str) -> Option<usize> {
        self.blade_class(name).map(|b| b.count)
    }

    pub fn blade_class_names(&self) -> Vec<String> {
        self.blade_classes.iter().map(|b| b.name.clone()).collect()
    }

    /// Check that every node class references a known blade class and has a
    /// usable capacity
    pub fn check_references(&self) -> Result<(), ResolutionError> {
        for node_class in &self.node_classes {
            if self.blade_class(&node_class.host_blade.blade_class).is_none() {
                return Err(ResolutionError::UnknownHostBlade {
                    node_class: node_class.name.clone(),
                    blade_class: node_class.host_blade.blade_class.clone(),
                });
            }
            if node_class.host_blade.instance_capacity == 0 {
                return Err(ResolutionError::ZeroCapacity(node_class.name.clone()));
            }
        }
        Ok(())
    }

    /// Return a new snapshot in which the given node instances carry the
    /// given canonical names
    pub fn with_node_names<I>(&self, names: I) -> Result<Topology, ResolutionError>
    where
        I: IntoIterator<Item = (NodeRef, String)>,
    {
        let mut updated = self.clone();
        let mut by_class: BTreeMap<String, Vec<(usize, String)>> = BTreeMap::new();
        for (node, name) in names {
            by_class
                .entry(node.node_class)
                .or_default()
                .push((node.instance, name));
        }

        for (class_name, entries) in by_class {
            let node_class = updated
                .node_classes
                .iter_mut()
                .find(|n| n.name == class_name)
                .ok_or_else(|| ResolutionError::UnknownNodeClass(class_name.clone()))?;
            for (instance, name) in entries {
                if instance >= node_class.count {
                    return Err(ResolutionError::UnknownNodeInstance(
                        class_name.clone(),
                        instance,
                    ));
                }
                if node_class.node_names.len() < node_class.count {
                    node_class.node_names.resize(node_class.count, None);
                }
                node_class.node_names[instance] = Some(name);
            }
        }

        Ok(updated)
    }
}
