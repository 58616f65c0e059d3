//! Application layer configuration schema
//!
//! The input document carries a top-level `application` section. Most of it
//! is consumed as-is; `seed_files.system_config` is also the place where the
//! consolidator writes its derived values, using the kebab-case keys the
//! provisioning toolchain expects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Name of the serialized application document, locally and on targets
pub const APP_CONFIG_NAME: &str = "application_core_config.yaml";

/// Remote script deployed to nodes
pub const NODE_DEPLOY_SCRIPT_NAME: &str = "deploy_application_to_node.py";

/// Remote script deployed to blades
pub const BLADE_DEPLOY_SCRIPT_NAME: &str = "deploy_application_to_blade.py";

/// Library shared by both deploy scripts
pub const COMMON_DEPLOY_LIB_NAME: &str = "deploy_application_common.py";

/// Top-level document wrapper
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApplicationDocument {
    #[serde(default)]
    pub application: Option<ApplicationConfig>,
}

/// The `application` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ApplicationConfig {
    #[serde(default)]
    pub geometry: GeometryConfig,

    /// Required; an empty section still picks up the default user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmc: Option<BmcConfig>,

    #[serde(default)]
    pub csm: CsmConfig,

    #[serde(default)]
    pub seed_files: SeedFilesConfig,

    /// Packages the remote deploy scripts install on every target
    #[serde(default)]
    pub debian_packages: Vec<String>,

    #[serde(default)]
    pub deploy: DeploySettings,
}

impl ApplicationConfig {
    pub fn bmc_config(&self) -> Result<&BmcConfig, ConfigurationError> {
        self.bmc
            .as_ref()
            .ok_or_else(|| ConfigurationError::MissingField("bmc".to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GeometryConfig {
    #[serde(default)]
    pub cabinets: CabinetsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CabinetsConfig {
    #[serde(default)]
    pub river: RiverCabinets,
}

/// River cabinet settings: `blade_classes` maps cabinet id → chassis id →
/// blade classes in slot order
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RiverCabinets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_id: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blade_classes: Option<BTreeMap<String, BTreeMap<String, Vec<String>>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BmcConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmc_user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmc_passwd: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CsmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SeedFilesConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_config: Option<SystemConfig>,
}

/// Deployment settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeploySettings {
    /// Node class that receives the node manifest
    #[serde(default = "default_installer_node_class")]
    pub installer_node_class: String,

    /// Local directory holding the deploy scripts
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,

    /// Python interpreter used on blades
    #[serde(default = "default_blade_python")]
    pub blade_python: String,

    /// Account used for remote copies and commands
    #[serde(default = "default_remote_user")]
    pub remote_user: String,

    /// Per-command timeout in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout: u64,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            installer_node_class: default_installer_node_class(),
            scripts_dir: default_scripts_dir(),
            blade_python: default_blade_python(),
            remote_user: default_remote_user(),
            command_timeout: default_command_timeout(),
        }
    }
}

fn default_installer_node_class() -> String {
    "pit_node".to_string()
}

fn default_scripts_dir() -> String {
    "scripts".to_string()
}

fn default_blade_python() -> String {
    "python3".to_string()
}

fn default_remote_user() -> String {
    "root".to_string()
}

fn default_command_timeout() -> u64 {
    3600
}

/// The `system_config.yaml` seed file contents
///
/// Only the keys the pipeline reads or writes are typed; anything else the
/// operator supplies is carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SystemConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_cidr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chn_cidr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmn_cidr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmn_cidr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hsn_cidr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nmn_cidr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_gateway: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmn_gateway: Option<String>,
    /// Deprecated alias of `can-gateway`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_gw: Option<String>,
    /// Deprecated alias of `cmn-gateway`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmn_gw: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_dynamic_pool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_static_pool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmn_dynamic_pool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hmn_static_pool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hsn_dynamic_pool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hsn_static_pool: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csm_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub river_cabinets: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_river_cabinet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_river_nid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_ncn_bmc_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_ncn_bmc_pass: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_ncn_bond_members: Option<String>,

    #[serde(default)]
    pub ntp_peers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_dns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_resolvers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_name: Option<String>,
    #[serde(default)]
    pub upstream_ntp_server: Vec<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_application_document() {
        let yaml = r#"
application:
  geometry:
    cabinets:
      river:
        count: 1
        starting_id: 3000
        blade_classes:
          3000:
            0: [mgmt, compute]
  csm:
    version: 1.6.0
  seed_files:
    system_config:
      can-gateway: 10.102.4.1/24
      hmn-dynamic-pool: 10.254.128.0/17
      site-domain: example.com
  debian_packages: [curl]
"#;
        let doc: ApplicationDocument = serde_yaml::from_str(yaml).unwrap();
        let app = doc.application.unwrap();
        let river = &app.geometry.cabinets.river;
        assert_eq!(river.starting_id, Some(3000));
        assert_eq!(
            river.blade_classes.as_ref().unwrap()["3000"]["0"],
            vec!["mgmt", "compute"]
        );
        let system_config = app.seed_files.system_config.as_ref().unwrap();
        assert_eq!(system_config.can_gateway.as_deref(), Some("10.102.4.1/24"));
        assert_eq!(system_config.hmn_dynamic_pool.as_deref(), Some("10.254.128.0/17"));
        assert!(system_config.extra.contains_key("site-domain"));
        assert_eq!(app.deploy, DeploySettings::default());
        assert_eq!(
            app.bmc_config(),
            Err(ConfigurationError::MissingField("bmc".to_string()))
        );
    }

    #[test]
    fn test_empty_bmc_section_is_present() {
        let doc: ApplicationDocument = serde_yaml::from_str("application:\n  bmc: {}\n").unwrap();
        let app = doc.application.unwrap();
        assert_eq!(app.bmc_config(), Ok(&BmcConfig::default()));
    }

    #[test]
    fn test_missing_application_section() {
        let doc: ApplicationDocument = serde_yaml::from_str("other: {}\n").unwrap();
        assert!(doc.application.is_none());
    }

    #[test]
    fn test_system_config_serializes_kebab_case() {
        let config = SystemConfig {
            can_gw: Some("10.102.4.1/24".to_string()),
            ntp_peers: vec!["ncn-m001".to_string()],
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("can-gw: 10.102.4.1/24"));
        assert!(yaml.contains("ntp-peers:"));
        assert!(!yaml.contains("can-cidr"));
    }
}
