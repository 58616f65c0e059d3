//! Subnet and gateway containment checks over a consolidated system config
//!
//! Checks run in a fixed order and stop at the first violation. NMN pools
//! live in an overlay and are not checked here.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use tracing::debug;

use crate::error::ValidationError;

use super::application::SystemConfig;

/// A pool that must sit inside a network
struct PoolCheck {
    pool_field: &'static str,
    network_field: &'static str,
}

/// A gateway that must be a host inside a network
struct GatewayCheck {
    gateway_field: &'static str,
    network_field: &'static str,
}

const POOL_CHECKS: &[PoolCheck] = &[
    PoolCheck { pool_field: "hmn-dynamic-pool", network_field: "hmn-cidr" },
    PoolCheck { pool_field: "hmn-static-pool", network_field: "hmn-cidr" },
    PoolCheck { pool_field: "hsn-dynamic-pool", network_field: "hsn-cidr" },
    PoolCheck { pool_field: "hsn-static-pool", network_field: "hsn-cidr" },
    PoolCheck { pool_field: "can-dynamic-pool", network_field: "can-cidr" },
    PoolCheck { pool_field: "can-static-pool", network_field: "can-cidr" },
];

const GATEWAY_CHECKS: &[GatewayCheck] = &[
    GatewayCheck { gateway_field: "can-gateway", network_field: "can-cidr" },
    GatewayCheck { gateway_field: "cmn-gateway", network_field: "cmn-cidr" },
];

// ============================================================================
// SBIO: Pure functions (no I/O)
// ============================================================================

/// Validate every pool and gateway against its network
pub fn validate_system_config(config: &SystemConfig) -> Result<(), ValidationError> {
    for check in POOL_CHECKS {
        let network = parse_network(check.network_field, required(config, check.network_field)?)?;
        let pool_value = required(config, check.pool_field)?;
        let pool = parse_pool(check.pool_field, pool_value)?;
        if !network.contains(&pool) {
            return Err(ValidationError::NotContained {
                field: check.pool_field.to_string(),
                value: pool_value.to_string(),
                network_field: check.network_field.to_string(),
                network: network.to_string(),
            });
        }
        debug!("{} {} is within {}", check.pool_field, pool, network);
    }

    for check in GATEWAY_CHECKS {
        let network = parse_network(check.network_field, required(config, check.network_field)?)?;
        let gateway_value = required(config, check.gateway_field)?;
        let gateway = parse_gateway(check.gateway_field, gateway_value)?;
        if !network.contains(&gateway) {
            return Err(ValidationError::NotContained {
                field: check.gateway_field.to_string(),
                value: gateway_value.to_string(),
                network_field: check.network_field.to_string(),
                network: network.to_string(),
            });
        }
        debug!("{} {} is within {}", check.gateway_field, gateway, network);
    }

    Ok(())
}

fn field<'a>(config: &'a SystemConfig, name: &str) -> Option<&'a str> {
    let value = match name {
        "can-cidr" => &config.can_cidr,
        "cmn-cidr" => &config.cmn_cidr,
        "hmn-cidr" => &config.hmn_cidr,
        "hsn-cidr" => &config.hsn_cidr,
        "can-gateway" => &config.can_gateway,
        "cmn-gateway" => &config.cmn_gateway,
        "can-dynamic-pool" => &config.can_dynamic_pool,
        "can-static-pool" => &config.can_static_pool,
        "hmn-dynamic-pool" => &config.hmn_dynamic_pool,
        "hmn-static-pool" => &config.hmn_static_pool,
        "hsn-dynamic-pool" => &config.hsn_dynamic_pool,
        "hsn-static-pool" => &config.hsn_static_pool,
        _ => return None,
    };
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(config: &'a SystemConfig, name: &str) -> Result<&'a str, ValidationError> {
    field(config, name).ok_or_else(|| ValidationError::MissingField(name.to_string()))
}

fn malformed(field: &str, value: &str, reason: impl ToString) -> ValidationError {
    ValidationError::Malformed {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// A network CIDR must name the network itself, with no host bits set
fn parse_network(field: &str, value: &str) -> Result<Ipv4Net, ValidationError> {
    let net: Ipv4Net = value.parse().map_err(|e| malformed(field, value, e))?;
    if net != net.trunc() {
        return Err(malformed(
            field,
            value,
            format!("host bits set, network is {}", net.trunc()),
        ));
    }
    Ok(net)
}

/// Pools are masked to their prefix; a bare address counts as a /32
fn parse_pool(field: &str, value: &str) -> Result<Ipv4Net, ValidationError> {
    if value.contains('/') {
        let net: Ipv4Net = value.parse().map_err(|e| malformed(field, value, e))?;
        Ok(net.trunc())
    } else {
        let addr: Ipv4Addr = value.parse().map_err(|e| malformed(field, value, e))?;
        Ipv4Net::new(addr, 32).map_err(|e| malformed(field, value, e))
    }
}

/// Gateways may carry a prefix length, which is ignored
fn parse_gateway(field: &str, value: &str) -> Result<Ipv4Addr, ValidationError> {
    let host = value.split('/').next().unwrap_or(value);
    host.parse().map_err(|e| malformed(field, value, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SystemConfig {
        SystemConfig {
            can_cidr: Some("10.102.4.0/24".to_string()),
            cmn_cidr: Some("10.103.6.0/24".to_string()),
            hmn_cidr: Some("10.254.0.0/17".to_string()),
            hsn_cidr: Some("10.253.0.0/16".to_string()),
            can_gateway: Some("10.102.4.1/24".to_string()),
            cmn_gateway: Some("10.103.6.1".to_string()),
            can_dynamic_pool: Some("10.102.4.128/25".to_string()),
            can_static_pool: Some("10.102.4.112/28".to_string()),
            hmn_dynamic_pool: Some("10.254.64.0/18".to_string()),
            hmn_static_pool: Some("10.254.1.0/24".to_string()),
            hsn_dynamic_pool: Some("10.253.128.0/17".to_string()),
            hsn_static_pool: Some("10.253.0.5".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert_eq!(validate_system_config(&valid()), Ok(()));
    }

    #[test]
    fn test_pool_outside_network() {
        let mut config = valid();
        config.hmn_cidr = Some("10.1.2.0/24".to_string());
        config.hmn_dynamic_pool = Some("10.1.2.0/25".to_string());
        config.hmn_static_pool = Some("10.1.3.0/25".to_string());

        let err = validate_system_config(&config).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotContained {
                field: "hmn-static-pool".to_string(),
                value: "10.1.3.0/25".to_string(),
                network_field: "hmn-cidr".to_string(),
                network: "10.1.2.0/24".to_string(),
            }
        );
    }

    #[test]
    fn test_pool_wider_than_network() {
        let mut config = valid();
        config.can_dynamic_pool = Some("10.102.0.0/16".to_string());
        let err = validate_system_config(&config).unwrap_err();
        assert!(matches!(err, ValidationError::NotContained { ref field, .. } if field == "can-dynamic-pool"));
    }

    #[test]
    fn test_pool_host_bits_are_masked() {
        let mut config = valid();
        config.can_static_pool = Some("10.102.4.117/28".to_string());
        assert_eq!(validate_system_config(&config), Ok(()));
    }

    #[test]
    fn test_gateway_outside_network() {
        let mut config = valid();
        config.can_cidr = Some("10.1.2.0/24".to_string());
        config.can_dynamic_pool = Some("10.1.2.128/25".to_string());
        config.can_static_pool = Some("10.1.2.64/26".to_string());
        config.can_gateway = Some("10.1.2.1/24".to_string());
        assert_eq!(validate_system_config(&config), Ok(()));

        config.can_gateway = Some("10.2.0.1".to_string());
        let err = validate_system_config(&config).unwrap_err();
        assert!(matches!(err, ValidationError::NotContained { ref field, .. } if field == "can-gateway"));
    }

    #[test]
    fn test_missing_field() {
        let mut config = valid();
        config.cmn_gateway = None;
        assert_eq!(
            validate_system_config(&config),
            Err(ValidationError::MissingField("cmn-gateway".to_string()))
        );

        config.hmn_cidr = Some("   ".to_string());
        assert_eq!(
            validate_system_config(&config),
            Err(ValidationError::MissingField("hmn-cidr".to_string()))
        );
    }

    #[test]
    fn test_network_with_host_bits_is_malformed() {
        let mut config = valid();
        config.hsn_cidr = Some("10.253.0.1/16".to_string());
        let err = validate_system_config(&config).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { ref field, .. } if field == "hsn-cidr"));
    }

    #[test]
    fn test_unparsable_values() {
        let mut config = valid();
        config.hmn_dynamic_pool = Some("10.254.0.0/33".to_string());
        let err = validate_system_config(&config).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { ref field, .. } if field == "hmn-dynamic-pool"));

        let mut config = valid();
        config.cmn_gateway = Some("gateway".to_string());
        let err = validate_system_config(&config).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { ref field, .. } if field == "cmn-gateway"));
    }

    #[test]
    fn test_checks_run_in_order() {
        let mut config = valid();
        config.hmn_dynamic_pool = Some("192.168.0.0/24".to_string());
        config.can_gateway = Some("192.168.0.1".to_string());
        let err = validate_system_config(&config).unwrap_err();
        assert!(matches!(err, ValidationError::NotContained { ref field, .. } if field == "hmn-dynamic-pool"));
    }
}
