//! Provisioning seed files
//!
//! The system config is fully derived. The cabinets seed is derived from
//! the geometry. The remaining seed files have no source data in the
//! cluster description yet and are produced as typed empty documents.

use std::collections::BTreeMap;
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::application::SystemConfig;
use crate::error::{Error, Result};
use crate::topology::Geometry;

pub const SYSTEM_CONFIG_FILE: &str = "system_config.yaml";
pub const CABINETS_FILE: &str = "cabinets.yaml";
pub const APPLICATION_NODE_CONFIG_FILE: &str = "application_node_config.yaml";
pub const HMN_CONNECTIONS_FILE: &str = "hmn_connections.json";
pub const NCN_METADATA_FILE: &str = "ncn_metadata.csv";
pub const SWITCH_METADATA_FILE: &str = "switch_metadata.csv";

/// Header written ahead of the remote `/etc/hosts` additions
pub const HOSTS_BLOCK_HEADER: &str = "# Added by vTDS Application Layer Deployment";

// ============================================================================
// SBIO: Pure data structures
// ============================================================================

/// One cabinet and its chassis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CabinetEntry {
    pub id: u32,
    pub chassis: Vec<u32>,
}

/// A group of cabinets of one type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CabinetGroup {
    #[serde(rename = "type")]
    pub kind: String,
    pub total_number: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_id: Option<u32>,
    pub cabinets: Vec<CabinetEntry>,
}

/// Contents of `cabinets.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CabinetsSeed {
    pub cabinets: Vec<CabinetGroup>,
}

impl CabinetsSeed {
    /// One river group covering every cabinet in the geometry
    pub fn from_geometry(geometry: &Geometry) -> Self {
        if geometry.cabinets.is_empty() {
            return Self::default();
        }
        let cabinets: Vec<CabinetEntry> = geometry
            .cabinets
            .iter()
            .map(|cabinet| CabinetEntry {
                id: cabinet.id,
                chassis: cabinet.chassis.iter().map(|c| c.id).collect(),
            })
            .collect();
        Self {
            cabinets: vec![CabinetGroup {
                kind: "river".to_string(),
                total_number: cabinets.len(),
                starting_id: cabinets.first().map(|c| c.id),
                cabinets,
            }],
        }
    }
}

/// A CSV seed: a fixed header and zero or more rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvSeed {
    pub header: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl CsvSeed {
    pub fn empty(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// One line per row, header first
    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in std::iter::once(&self.header).chain(self.rows.iter()) {
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }
}

/// All seed file payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedFiles {
    pub system_config: SystemConfig,
    pub cabinets: CabinetsSeed,
    pub application_node_config: BTreeMap<String, serde_yaml::Value>,
    pub hmn_connections: Vec<serde_json::Value>,
    pub ncn_metadata: CsvSeed,
    pub switch_metadata: CsvSeed,
}

/// No per-node application config is derivable yet
pub fn application_node_config() -> BTreeMap<String, serde_yaml::Value> {
    BTreeMap::new()
}

/// No cabling data is derivable yet
pub fn hmn_connections() -> Vec<serde_json::Value> {
    Vec::new()
}

/// NCN metadata needs MAC addresses the cluster description does not carry
pub fn ncn_metadata() -> CsvSeed {
    CsvSeed::empty(&[
        "Xname",
        "Role",
        "Subrole",
        "BMC MAC",
        "Bootstrap MAC",
        "Bond0 MAC0",
        "Bond0 MAC1",
    ])
}

pub fn switch_metadata() -> CsvSeed {
    CsvSeed::empty(&["Switch Xname", "Type", "Brand"])
}

impl SeedFiles {
    pub fn build(system_config: SystemConfig, geometry: &Geometry) -> Self {
        Self {
            system_config,
            cabinets: CabinetsSeed::from_geometry(geometry),
            application_node_config: application_node_config(),
            hmn_connections: hmn_connections(),
            ncn_metadata: ncn_metadata(),
            switch_metadata: switch_metadata(),
        }
    }
}

/// Render the `/etc/hosts` fragment for a hostname → address map
pub fn render_hosts_block(hosts: &BTreeMap<String, Ipv4Addr>) -> String {
    let mut out = format!("{}\n", HOSTS_BLOCK_HEADER);
    for (hostname, addr) in hosts {
        out.push_str(&format!("{:<15.15} {}\n", addr.to_string(), hostname));
    }
    out
}

// ============================================================================
// I/O boundary
// ============================================================================

fn to_yaml<T: Serialize>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).map_err(|e| Error::Serialize(e.to_string()))
}

fn write(path: PathBuf, content: String) -> Result<PathBuf> {
    fs::write(&path, content).map_err(|e| Error::io(&path, e))?;
    debug!("wrote {}", path.display());
    Ok(path)
}

/// Write every seed file into `dir`, returning the written paths
pub fn write_seed_files(seed: &SeedFiles, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let hmn_connections = serde_json::to_string_pretty(&seed.hmn_connections)
        .map_err(|e| Error::Serialize(e.to_string()))?;

    Ok(vec![
        write(dir.join(SYSTEM_CONFIG_FILE), to_yaml(&seed.system_config)?)?,
        write(dir.join(CABINETS_FILE), to_yaml(&seed.cabinets)?)?,
        write(
            dir.join(APPLICATION_NODE_CONFIG_FILE),
            to_yaml(&seed.application_node_config)?,
        )?,
        write(dir.join(HMN_CONNECTIONS_FILE), hmn_connections)?,
        write(dir.join(NCN_METADATA_FILE), seed.ncn_metadata.render())?,
        write(dir.join(SWITCH_METADATA_FILE), seed.switch_metadata.render())?,
    ])
}
