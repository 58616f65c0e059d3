//! Configuration consolidation
//!
//! Joins the application section, the topology snapshot, site settings and
//! resolved credentials into the single document shipped to every target.

pub mod seed;
pub mod system_config;

pub use seed::{render_hosts_block, write_seed_files, CabinetsSeed, CsvSeed, SeedFiles};
pub use system_config::{
    csm_version, make_system_config, SystemConfigSources, REQUIRED_NETWORK_ROLES,
};

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::application::{ApplicationConfig, BmcConfig};
use crate::config::credentials::BmcCredentials;
use crate::config::version::SemanticVersion;
use crate::error::Result;
use crate::topology::{
    assign_addresses, BladeRef, Geometry, NetworkRoles, NodeRef, SiteConfig, Topology,
};

/// Primary node role whose members act as NTP peers
pub const MANAGEMENT_ROLE: &str = "Management";

/// The consolidated application document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedConfig {
    #[serde(flatten)]
    pub application: ApplicationConfig,

    /// Parsed form of `csm.version`
    pub csm_version: SemanticVersion,

    /// Hostname (per network) → IPv4 address
    pub host_ipv4_map: BTreeMap<String, Ipv4Addr>,

    /// Node xname → node instance
    pub xname_map: BTreeMap<String, NodeRef>,

    /// Blade xname → blade instance
    pub blade_xname_map: BTreeMap<String, BladeRef>,
}

/// Result of one consolidation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Consolidation {
    pub config: ConsolidatedConfig,

    /// Topology snapshot with xnames written back as node names
    pub topology: Topology,

    pub geometry: Geometry,

    pub seed_files: SeedFiles,
}

// ============================================================================
// SBIO: Pure functions (no I/O)
// ============================================================================

/// Hostname → address for every assigned address of every node on every
/// network it is attached to
pub fn host_ipv4_map(topology: &Topology) -> BTreeMap<String, Ipv4Addr> {
    let mut hosts = BTreeMap::new();
    for node_class in &topology.node_classes {
        for network in node_class.network_names() {
            for instance in 0..node_class.count {
                if let Some(addr) = node_class.ipv4_addr(instance, network) {
                    hosts.insert(node_class.hostname(instance, network), addr);
                }
            }
        }
    }
    hosts
}

/// Canonical names of every node whose primary role is `Management`, in
/// node class then instance order
pub fn management_hostnames(topology: &Topology) -> Vec<String> {
    topology
        .node_classes
        .iter()
        .filter(|n| n.primary_role() == Some(MANAGEMENT_ROLE))
        .flat_map(|n| (0..n.count).map(move |i| n.node_name(i)))
        .collect()
}

/// Consolidate the application configuration against a topology snapshot.
///
/// Pure with respect to its inputs: running it again with the same
/// credentials yields the same result.
pub fn consolidate(
    app: &ApplicationConfig,
    topology: &Topology,
    site: &SiteConfig,
    credentials: &BmcCredentials,
) -> Result<Consolidation> {
    app.bmc_config()?;
    let geometry = Geometry::from_river(&app.geometry.cabinets.river)?;
    let assignment = assign_addresses(&geometry, topology)?;
    info!(
        "assigned {} blade and {} node xnames",
        assignment.blades.len(),
        assignment.nodes.len()
    );
    let topology = topology.with_node_names(assignment.node_names())?;

    let host_ipv4_map = host_ipv4_map(&topology);
    let roles = NetworkRoles::build(&topology.networks)?;
    let system_config = make_system_config(
        app,
        SystemConfigSources {
            roles: &roles,
            site,
            credentials,
            ntp_peers: management_hostnames(&topology),
        },
    )?;
    let csm_version = csm_version(app)?;

    let mut application = app.clone();
    application.bmc = Some(BmcConfig {
        bmc_user: Some(credentials.bmc_user.clone()),
        bmc_passwd: Some(credentials.bmc_passwd.clone()),
    });
    application.seed_files.system_config = Some(system_config.clone());

    let seed_files = SeedFiles::build(system_config, &geometry);
    info!("consolidated configuration for {} hosts", host_ipv4_map.len());

    Ok(Consolidation {
        config: ConsolidatedConfig {
            application,
            csm_version,
            host_ipv4_map,
            xname_map: assignment.node_xname_map(),
            blade_xname_map: assignment.blade_xname_map(),
        },
        topology,
        geometry,
        seed_files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::application::SystemConfig;
    use crate::error::{ConfigurationError, Error};
    use crate::topology::{BladeClass, Network, NodeClass};
    use std::collections::BTreeMap;

    fn topology() -> Topology {
        let mut networks: Vec<Network> = REQUIRED_NETWORK_ROLES
            .iter()
            .enumerate()
            .map(|(i, role)| {
                Network::new(
                    role.to_lowercase(),
                    format!("10.{}.0.0/16", 100 + i).parse().unwrap(),
                )
                .with_role(*role)
            })
            .collect();
        networks.push(Network::new("provisioning", "192.168.0.0/24".parse().unwrap()));

        Topology {
            blade_classes: vec![BladeClass::new("mgmt", 1), BladeClass::new("compute", 2)],
            node_classes: vec![
                NodeClass::new("pit_node", 1, "mgmt", 1)
                    .with_interface("provisioning", vec![Some(Ipv4Addr::new(192, 168, 0, 2))]),
                NodeClass::new("master", 1, "mgmt", 1).with_role("Management:Master"),
                NodeClass::new("worker", 4, "compute", 2)
                    .with_role("Management:Worker")
                    .with_interface(
                        "hmn",
                        vec![
                            Some(Ipv4Addr::new(10, 103, 1, 1)),
                            Some(Ipv4Addr::new(10, 103, 1, 2)),
                            None,
                            Some(Ipv4Addr::new(10, 103, 1, 4)),
                        ],
                    ),
            ],
            networks,
        }
    }

    fn app() -> ApplicationConfig {
        let mut app = ApplicationConfig {
            bmc: Some(BmcConfig::default()),
            ..Default::default()
        };
        let mut layout = BTreeMap::new();
        layout.insert(
            "0".to_string(),
            vec!["mgmt".to_string(), "compute".to_string()],
        );
        let mut cabinets = BTreeMap::new();
        cabinets.insert("3000".to_string(), layout);
        app.geometry.cabinets.river.blade_classes = Some(cabinets);
        app.csm.version = Some("1.6.0".to_string());
        app.seed_files.system_config = Some(SystemConfig {
            can_gateway: Some("10.100.0.1".to_string()),
            cmn_gateway: Some("10.102.0.1".to_string()),
            ..Default::default()
        });
        app
    }

    fn credentials() -> BmcCredentials {
        BmcCredentials::resolve(&BmcConfig::default(), Some("seed"))
    }

    #[test]
    fn test_consolidate_end_to_end() {
        let result = consolidate(&app(), &topology(), &SiteConfig::default(), &credentials()).unwrap();

        let xnames: Vec<&String> = result.config.xname_map.keys().collect();
        assert_eq!(
            xnames,
            vec![
                "x3000c0s0b0n0",
                "x3000c0s1b0n0",
                "x3000c0s1b0n1",
                "x3000c0s2b0n0",
                "x3000c0s2b0n1"
            ]
        );
        assert_eq!(
            result.config.xname_map["x3000c0s2b0n1"],
            NodeRef::new("worker", 3)
        );
        assert_eq!(result.config.blade_xname_map.len(), 3);

        // Hosts use the refreshed names; unassigned addresses are skipped
        let hosts: Vec<&String> = result.config.host_ipv4_map.keys().collect();
        assert_eq!(
            hosts,
            vec![
                "pit_node-001-provisioning",
                "x3000c0s1b0n0-hmn",
                "x3000c0s1b0n1-hmn",
                "x3000c0s2b0n1-hmn"
            ]
        );

        let system_config = result.config.application.seed_files.system_config.as_ref().unwrap();
        assert_eq!(
            system_config.ntp_peers,
            vec![
                "x3000c0s0b0n0",
                "x3000c0s1b0n0",
                "x3000c0s1b0n1",
                "x3000c0s2b0n0",
                "x3000c0s2b0n1"
            ]
        );
        assert_eq!(system_config.hmn_cidr.as_deref(), Some("10.103.0.0/16"));
        assert_eq!(&result.seed_files.system_config, system_config);
        assert_eq!(result.config.csm_version.to_string(), "1.6.0");
        assert_eq!(result.config.csm_version.major_minor(), "1.6");
        assert_eq!(result.config.application.bmc.as_ref().and_then(|b| b.bmc_user.as_deref()), Some("root"));
    }

    #[test]
    fn test_consolidate_is_idempotent_with_same_credentials() {
        let creds = credentials();
        let first = consolidate(&app(), &topology(), &SiteConfig::default(), &creds).unwrap();
        let second = consolidate(&app(), &topology(), &SiteConfig::default(), &creds).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_consolidate_unknown_blade_class() {
        let mut app = app();
        let layout = app.geometry.cabinets.river.blade_classes.as_mut().unwrap();
        layout.get_mut("3000").unwrap().get_mut("0").unwrap().push("gpu".to_string());
        let err = consolidate(&app, &topology(), &SiteConfig::default(), &credentials()).unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::UnknownBladeClass(ref c)) if c == "gpu"
        ));
    }

    #[test]
    fn test_consolidate_requires_bmc_section() {
        let mut app = app();
        app.bmc = None;
        let err = consolidate(&app, &topology(), &SiteConfig::default(), &credentials()).unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::MissingField(ref f)) if f == "bmc"
        ));
    }

    #[test]
    fn test_consolidated_config_serializes_flat() {
        let result = consolidate(&app(), &topology(), &SiteConfig::default(), &credentials()).unwrap();
        let yaml = serde_yaml::to_string(&result.config).unwrap();
        assert!(yaml.contains("geometry:"));
        assert!(yaml.contains("host_ipv4_map:"));
        assert!(yaml.contains("x3000c0s1b0n0:"));
        assert!(yaml.contains("can-gw: 10.100.0.1"));
        assert!(yaml.contains("csm_version:"));
        assert!(yaml.contains("version: 1.6.0"));
    }
}
