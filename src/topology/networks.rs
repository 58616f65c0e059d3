//! Network role resolution
//!
//! Maps semantic network roles (`HMN`, `CAN`, ...) to the concrete network
//! declaring them so configuration never hardcodes network names.

use std::collections::BTreeMap;

use ipnet::Ipv4Net;

use crate::error::{ConfigurationError, ResolutionError};

use super::catalog::Network;

/// Role → network lookup built from the declared networks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkRoles {
    by_role: BTreeMap<String, (String, Ipv4Net)>,
}

impl NetworkRoles {
    /// Build the lookup. A role declared by two networks is rejected rather
    /// than resolved by declaration order.
    pub fn build(networks: &[Network]) -> Result<Self, ResolutionError> {
        let mut by_role: BTreeMap<String, (String, Ipv4Net)> = BTreeMap::new();
        for network in networks {
            let Some(role) = network.network_role.as_deref().filter(|r| !r.is_empty()) else {
                continue;
            };
            if let Some((first, _)) = by_role.get(role) {
                return Err(ResolutionError::DuplicateRole {
                    role: role.to_string(),
                    first: first.clone(),
                    second: network.name.clone(),
                });
            }
            by_role.insert(role.to_string(), (network.name.clone(), network.ipv4_cidr));
        }
        Ok(Self { by_role })
    }

    /// Name of the network declaring `role`
    pub fn network_for_role(&self, role: &str) -> Option<&str> {
        self.by_role.get(role).map(|(name, _)| name.as_str())
    }

    /// CIDR of the network declaring `role`
    pub fn cidr_for_role(&self, role: &str) -> Result<Ipv4Net, ConfigurationError> {
        self.by_role
            .get(role)
            .map(|(_, cidr)| *cidr)
            .ok_or_else(|| ConfigurationError::MissingNetworkRole(role.to_string()))
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.by_role.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn networks() -> Vec<Network> {
        vec![
            Network::new("hardware_management", "10.254.0.0/17".parse().unwrap()).with_role("HMN"),
            Network::new("node_management", "10.252.0.0/17".parse().unwrap()).with_role("NMN"),
            Network::new("provisioning", "10.100.0.0/24".parse().unwrap()),
        ]
    }

    #[test]
    fn test_cidr_for_role() {
        let roles = NetworkRoles::build(&networks()).unwrap();
        assert_eq!(roles.cidr_for_role("HMN").unwrap().to_string(), "10.254.0.0/17");
        assert_eq!(roles.network_for_role("NMN"), Some("node_management"));
        assert_eq!(roles.roles().collect::<Vec<_>>(), vec!["HMN", "NMN"]);
    }

    #[test]
    fn test_missing_role() {
        let roles = NetworkRoles::build(&networks()).unwrap();
        assert_eq!(
            roles.cidr_for_role("CAN"),
            Err(ConfigurationError::MissingNetworkRole("CAN".to_string()))
        );
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let mut nets = networks();
        nets.push(Network::new("hmn_two", "10.253.0.0/17".parse().unwrap()).with_role("HMN"));
        let result = NetworkRoles::build(&nets);
        assert_eq!(
            result,
            Err(ResolutionError::DuplicateRole {
                role: "HMN".to_string(),
                first: "hardware_management".to_string(),
                second: "hmn_two".to_string(),
            })
        );
    }
}
