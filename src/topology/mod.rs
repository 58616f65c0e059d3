pub mod catalog;
pub mod geometry;
pub mod hosting;
pub mod networks;
pub mod slots;
pub mod xname;

pub use catalog::{
    BladeClass, BladeRef, ClusterDescription, HostBladeInfo, Network, NodeClass, NodeInterface,
    NodeRef, ServerRecord, SiteConfig, Topology,
};
pub use geometry::{Cabinet, Chassis, Geometry};
pub use hosting::{hosted_nodes, HostedNodes, HostingMap};
pub use networks::NetworkRoles;
pub use slots::first_slot;
pub use xname::{assign_addresses, Xname, XnameAssignment};
