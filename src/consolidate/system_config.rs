//! Derivation of the `system_config.yaml` seed values
//!
//! Starts from whatever the operator supplied under
//! `seed_files.system_config` and fills in the values the pipeline owns.

use tracing::debug;

use crate::config::application::{ApplicationConfig, SystemConfig};
use crate::config::credentials::BmcCredentials;
use crate::config::version::{parse_version, SemanticVersion};
use crate::error::ConfigurationError;
use crate::topology::{NetworkRoles, SiteConfig};

/// Network roles whose CIDRs are always written
pub const REQUIRED_NETWORK_ROLES: [&str; 6] = ["CAN", "CHN", "CMN", "HMN", "HSN", "NMN"];

pub const DEFAULT_RIVER_CABINETS: &str = "1";
pub const DEFAULT_STARTING_RIVER_CABINET: &str = "3000";
pub const STARTING_RIVER_NID: &str = "1";
pub const INSTALL_NCN_BOND_MEMBERS: &str = "p1p1,p10p1";

/// Everything the derivation reads besides the application section
pub struct SystemConfigSources<'a> {
    pub roles: &'a NetworkRoles,
    pub site: &'a SiteConfig,
    pub credentials: &'a BmcCredentials,
    /// Canonical names of management nodes
    pub ntp_peers: Vec<String>,
}

fn set_role_cidr(config: &mut SystemConfig, role: &str, cidr: String) {
    let slot = match role {
        "CAN" => &mut config.can_cidr,
        "CHN" => &mut config.chn_cidr,
        "CMN" => &mut config.cmn_cidr,
        "HMN" => &mut config.hmn_cidr,
        "HSN" => &mut config.hsn_cidr,
        "NMN" => &mut config.nmn_cidr,
        _ => return,
    };
    *slot = Some(cidr);
}

fn required_gateway(value: &Option<String>, field: &str) -> Result<String, ConfigurationError> {
    value
        .clone()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigurationError::MissingField(format!("seed_files.system_config.{}", field)))
}

/// The parsed `csm.version`, which must be present
pub fn csm_version(app: &ApplicationConfig) -> Result<SemanticVersion, ConfigurationError> {
    let version = app
        .csm
        .version
        .as_deref()
        .ok_or_else(|| ConfigurationError::MissingField("csm.version".to_string()))?;
    parse_version(version)
}

/// Build the system config seed from the application section and the
/// resolved topology values
pub fn make_system_config(
    app: &ApplicationConfig,
    sources: SystemConfigSources<'_>,
) -> Result<SystemConfig, ConfigurationError> {
    let mut config = app.seed_files.system_config.clone().unwrap_or_default();

    for role in REQUIRED_NETWORK_ROLES {
        let cidr = sources.roles.cidr_for_role(role)?;
        debug!("{} network role resolves to {}", role, cidr);
        set_role_cidr(&mut config, role, cidr.to_string());
    }

    config.can_gw = Some(required_gateway(&config.can_gateway, "can-gateway")?);
    config.cmn_gw = Some(required_gateway(&config.cmn_gateway, "cmn-gateway")?);

    config.csm_version = Some(csm_version(app)?.major_minor());

    let river = &app.geometry.cabinets.river;
    config.river_cabinets = Some(
        river
            .count
            .map(|c| c.to_string())
            .unwrap_or_else(|| DEFAULT_RIVER_CABINETS.to_string()),
    );
    config.starting_river_cabinet = Some(
        river
            .starting_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| DEFAULT_STARTING_RIVER_CABINET.to_string()),
    );
    config.starting_river_nid = Some(STARTING_RIVER_NID.to_string());

    config.bootstrap_ncn_bmc_user = Some(sources.credentials.bmc_user.clone());
    config.bootstrap_ncn_bmc_pass = Some(sources.credentials.bmc_passwd.clone());
    config.install_ncn_bond_members = Some(INSTALL_NCN_BOND_MEMBERS.to_string());

    config.ntp_peers = sources.ntp_peers;
    let dns = sources.site.first_dns_address();
    config.site_dns = Some(dns.clone());
    config.ipv4_resolvers = Some(dns);
    if !sources.site.system_name.is_empty() {
        config.system_name = Some(sources.site.system_name.clone());
    }
    config.upstream_ntp_server = sources.site.ntp_server_names();

    Ok(config)
}
