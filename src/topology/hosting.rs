//! Host-to-blade resolution
//!
//! Works out which node instances live on which blade instance from the
//! class-level hosting metadata (`host_blade.blade_class` and
//! `instance_capacity`).

use std::collections::BTreeMap;

use crate::error::ResolutionError;

use super::catalog::Topology;

/// Blade class → node classes it hosts, in node-class declaration order.
///
/// Built once per resolution pass and not modified afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostingMap {
    hosted: BTreeMap<String, Vec<String>>,
}

impl HostingMap {
    pub fn build(topology: &Topology) -> Self {
        let mut hosted: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for node_class in &topology.node_classes {
            hosted
                .entry(node_class.host_blade.blade_class.clone())
                .or_default()
                .push(node_class.name.clone());
        }
        Self { hosted }
    }

    /// Node classes hosted by a blade class (empty if it hosts none)
    pub fn node_classes(&self, blade_class: &str) -> &[String] {
        self.hosted
            .get(blade_class)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// The node instances of one class living on a particular blade instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedNodes {
    pub node_class: String,
    pub instances: Vec<usize>,
}

/// Node instances hosted by `blade_instance` of `blade_class`.
///
/// Only classes with a non-empty `node_role` are returned; role-less classes
/// are infrastructure outside the target system. Each class contributes the
/// range `[blade_instance * capacity, (blade_instance + 1) * capacity)`,
/// clipped to the class's instance count.
pub fn hosted_nodes(
    topology: &Topology,
    hosting: &HostingMap,
    blade_class: &str,
    blade_instance: usize,
) -> Result<Vec<HostedNodes>, ResolutionError> {
    let mut result = Vec::new();
    for class_name in hosting.node_classes(blade_class) {
        let node_class = topology
            .node_class(class_name)
            .ok_or_else(|| ResolutionError::UnknownNodeClass(class_name.clone()))?;
        if !node_class.has_role() {
            continue;
        }
        let capacity = node_class.host_blade.instance_capacity;
        if capacity == 0 {
            return Err(ResolutionError::ZeroCapacity(class_name.clone()));
        }
        let overflow = || ResolutionError::CapacityOverflow(class_name.clone(), blade_instance);
        let start = blade_instance.checked_mul(capacity).ok_or_else(overflow)?;
        let end = start.checked_add(capacity).ok_or_else(overflow)?.min(node_class.count);
        let instances: Vec<usize> = (start..end).collect();
        if !instances.is_empty() {
            result.push(HostedNodes {
                node_class: class_name.clone(),
                instances,
            });
        }
    }
    Ok(result)
}
