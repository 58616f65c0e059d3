//! Physical-style identifiers (xnames) and address assignment
//!
//! A blade xname is `x<cabinet>c<chassis>s<slot>b0`; a node xname appends
//! `n<local index>`. Numbers are rendered in plain decimal.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use tracing::debug;

use crate::error::{ConfigurationError, ResolutionError, Result};

use super::catalog::{BladeRef, NodeRef, Topology};
use super::geometry::Geometry;
use super::hosting::{hosted_nodes, HostingMap};
use super::slots::first_slot;

/// A blade or node xname
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Xname {
    pub cabinet: u32,
    pub chassis: u32,
    pub slot: usize,
    pub node: Option<usize>,
}

impl Xname {
    pub fn blade(cabinet: u32, chassis: u32, slot: usize) -> Self {
        Self {
            cabinet,
            chassis,
            slot,
            node: None,
        }
    }

    /// The xname of the node at `local_index` on this blade
    pub fn node(&self, local_index: usize) -> Self {
        Self {
            node: Some(local_index),
            ..*self
        }
    }

    pub fn is_node(&self) -> bool {
        self.node.is_some()
    }
}

impl fmt::Display for Xname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}c{}s{}b0", self.cabinet, self.chassis, self.slot)?;
        if let Some(node) = self.node {
            write!(f, "n{}", node)?;
        }
        Ok(())
    }
}

/// The xnames produced for every blade and node instance in the geometry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XnameAssignment {
    pub blades: BTreeMap<BladeRef, Xname>,
    pub nodes: BTreeMap<NodeRef, Xname>,
}

impl XnameAssignment {
    /// `(node, xname string)` pairs, ready to become canonical node names
    pub fn node_names(&self) -> Vec<(NodeRef, String)> {
        self.nodes
            .iter()
            .map(|(node, xname)| (node.clone(), xname.to_string()))
            .collect()
    }

    /// Node xname → node instance
    pub fn node_xname_map(&self) -> BTreeMap<String, NodeRef> {
        self.nodes
            .iter()
            .map(|(node, xname)| (xname.to_string(), node.clone()))
            .collect()
    }

    /// Blade xname → blade instance
    pub fn blade_xname_map(&self) -> BTreeMap<String, BladeRef> {
        self.blades
            .iter()
            .map(|(blade, xname)| (xname.to_string(), blade.clone()))
            .collect()
    }
}

/// Assign xnames to every blade instance named by the geometry and to every
/// role-bearing node instance those blades host.
///
/// Walks cabinets → chassis → blade classes → blade instances → hosted node
/// classes → node instances. Within a blade, node local indices count up
/// across hosted classes in declaration order, so a single hosted class gets
/// exactly `instance mod capacity`.
pub fn assign_addresses(geometry: &Geometry, topology: &Topology) -> Result<XnameAssignment> {
    topology.check_references()?;
    let hosting = HostingMap::build(topology);

    let mut assignment = XnameAssignment::default();
    let mut placed_classes: HashSet<&str> = HashSet::new();
    let mut used: HashSet<Xname> = HashSet::new();

    for cabinet in &geometry.cabinets {
        for chassis in &cabinet.chassis {
            for blade_class in &chassis.blade_classes {
                let blade_count = topology
                    .blade_count(blade_class)
                    .ok_or_else(|| ConfigurationError::UnknownBladeClass(blade_class.clone()))?;
                if !placed_classes.insert(blade_class.as_str()) {
                    return Err(ConfigurationError::DuplicateBladeClass(blade_class.clone()).into());
                }
                let base_slot = first_slot(topology, &chassis.blade_classes, blade_class)?;

                for blade_instance in 0..blade_count {
                    let blade_xname = Xname::blade(cabinet.id, chassis.id, base_slot + blade_instance);
                    if !used.insert(blade_xname) {
                        return Err(ResolutionError::DuplicateXname(blade_xname.to_string()).into());
                    }
                    debug!(
                        "blade {}[{}] -> {}",
                        blade_class, blade_instance, blade_xname
                    );
                    assignment
                        .blades
                        .insert(BladeRef::new(blade_class.clone(), blade_instance), blade_xname);

                    let mut local_index = 0;
                    for hosted in hosted_nodes(topology, &hosting, blade_class, blade_instance)? {
                        for node_instance in hosted.instances {
                            let node_xname = blade_xname.node(local_index);
                            if !used.insert(node_xname) {
                                return Err(
                                    ResolutionError::DuplicateXname(node_xname.to_string()).into()
                                );
                            }
                            assignment
                                .nodes
                                .insert(NodeRef::new(hosted.node_class.clone(), node_instance), node_xname);
                            local_index += 1;
                        }
                    }
                }
            }
        }
    }

    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::topology::catalog::{BladeClass, NodeClass};
    use crate::topology::geometry::{Cabinet, Chassis};

    fn geometry(layout: Vec<(u32, Vec<(u32, Vec<&str>)>)>) -> Geometry {
        Geometry {
            cabinets: layout
                .into_iter()
                .map(|(id, chassis)| Cabinet {
                    id,
                    chassis: chassis
                        .into_iter()
                        .map(|(id, classes)| Chassis {
                            id,
                            blade_classes: classes.into_iter().map(String::from).collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    fn scenario() -> (Geometry, Topology) {
        let topology = Topology {
            blade_classes: vec![BladeClass::new("mgmt", 1), BladeClass::new("compute", 2)],
            node_classes: vec![
                NodeClass::new("pit_node", 1, "mgmt", 1),
                NodeClass::new("worker", 4, "compute", 2).with_role("worker"),
            ],
            networks: vec![],
        };
        (geometry(vec![(3000, vec![(0, vec!["mgmt", "compute"])])]), topology)
    }

    #[test]
    fn test_xname_format() {
        let blade = Xname::blade(3000, 0, 12);
        assert_eq!(blade.to_string(), "x3000c0s12b0");
        assert_eq!(blade.node(3).to_string(), "x3000c0s12b0n3");
        assert!(!blade.is_node());
        assert!(blade.node(0).is_node());
    }

    #[test]
    fn test_end_to_end_scenario() {
        let (geometry, topology) = scenario();
        let assignment = assign_addresses(&geometry, &topology).unwrap();

        let blades: Vec<(String, String)> = assignment
            .blades
            .iter()
            .map(|(b, x)| (b.to_string(), x.to_string()))
            .collect();
        assert_eq!(
            blades,
            vec![
                ("compute[0]".to_string(), "x3000c0s1b0".to_string()),
                ("compute[1]".to_string(), "x3000c0s2b0".to_string()),
                ("mgmt[0]".to_string(), "x3000c0s0b0".to_string()),
            ]
        );

        let nodes: Vec<String> = (0..4)
            .map(|i| assignment.nodes[&NodeRef::new("worker", i)].to_string())
            .collect();
        assert_eq!(
            nodes,
            vec!["x3000c0s1b0n0", "x3000c0s1b0n1", "x3000c0s2b0n0", "x3000c0s2b0n1"]
        );
        // The role-less installer node gets nothing
        assert!(!assignment.nodes.contains_key(&NodeRef::new("pit_node", 0)));
    }

    #[test]
    fn test_slots_increase_in_declaration_order() {
        let topology = Topology {
            blade_classes: vec![
                BladeClass::new("a", 2),
                BladeClass::new("b", 3),
                BladeClass::new("c", 1),
            ],
            ..Default::default()
        };
        let geometry = geometry(vec![(1000, vec![(2, vec!["c", "a", "b"])])]);
        let assignment = assign_addresses(&geometry, &topology).unwrap();

        let mut ordered: Vec<(usize, &str)> = assignment
            .blades
            .iter()
            .map(|(b, x)| (x.slot, b.blade_class.as_str()))
            .collect();
        ordered.sort();
        let classes: Vec<&str> = ordered.iter().map(|(_, c)| *c).collect();
        assert_eq!(classes, vec!["c", "a", "a", "b", "b", "b"]);
        let slots: Vec<usize> = ordered.iter().map(|(s, _)| *s).collect();
        assert_eq!(slots, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_identifiers_unique_across_chassis_and_classes() {
        let topology = Topology {
            blade_classes: vec![BladeClass::new("mgmt", 2), BladeClass::new("compute", 3)],
            node_classes: vec![
                NodeClass::new("master", 2, "mgmt", 1).with_role("Management:Master"),
                NodeClass::new("storage", 2, "mgmt", 1).with_role("Management:Storage"),
                NodeClass::new("worker", 6, "compute", 2).with_role("Management:Worker"),
            ],
            networks: vec![],
        };
        let geometry = geometry(vec![
            (3000, vec![(0, vec!["mgmt"])]),
            (3001, vec![(0, vec!["compute"])]),
        ]);
        let assignment = assign_addresses(&geometry, &topology).unwrap();

        let all: Vec<String> = assignment
            .blades
            .values()
            .chain(assignment.nodes.values())
            .map(|x| x.to_string())
            .collect();
        let unique: HashSet<&String> = all.iter().collect();
        assert_eq!(all.len(), unique.len());
        assert_eq!(assignment.nodes.len(), 10);

        // Two classes sharing a blade continue the local index
        assert_eq!(assignment.nodes[&NodeRef::new("master", 1)].to_string(), "x3000c0s1b0n0");
        assert_eq!(assignment.nodes[&NodeRef::new("storage", 1)].to_string(), "x3000c0s1b0n1");
    }

    #[test]
    fn test_unknown_geometry_class() {
        let (_, topology) = scenario();
        let geometry = geometry(vec![(3000, vec![(0, vec!["mgmt", "gpu"])])]);
        let result = assign_addresses(&geometry, &topology);
        assert!(matches!(
            result,
            Err(Error::Configuration(ConfigurationError::UnknownBladeClass(name))) if name == "gpu"
        ));
    }

    #[test]
    fn test_class_in_two_chassis_rejected() {
        let (_, topology) = scenario();
        let geometry = geometry(vec![(3000, vec![(0, vec!["compute"]), (1, vec!["compute"])])]);
        let result = assign_addresses(&geometry, &topology);
        assert!(matches!(
            result,
            Err(Error::Configuration(ConfigurationError::DuplicateBladeClass(_)))
        ));
    }

    #[test]
    fn test_maps_and_names() {
        let (geometry, topology) = scenario();
        let assignment = assign_addresses(&geometry, &topology).unwrap();

        let node_map = assignment.node_xname_map();
        assert_eq!(node_map["x3000c0s2b0n1"], NodeRef::new("worker", 3));
        let blade_map = assignment.blade_xname_map();
        assert_eq!(blade_map["x3000c0s0b0"], BladeRef::new("mgmt", 0));

        let renamed = topology.with_node_names(assignment.node_names()).unwrap();
        assert_eq!(renamed.node_class("worker").unwrap().node_name(2), "x3000c0s2b0n0");
    }
}
