//! BMC credential generation
//!
//! Credentials are produced by an explicit step ahead of consolidation. A
//! configured password always wins; otherwise a stable seed yields the same
//! password on every run, and only without a seed is a fresh random token
//! generated.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::application::BmcConfig;

/// User name applied when the configuration does not set one
pub const DEFAULT_BMC_USER: &str = "root";

/// Resolved BMC credentials
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BmcCredentials {
    pub bmc_user: String,
    pub bmc_passwd: String,
}

impl fmt::Debug for BmcCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BmcCredentials")
            .field("bmc_user", &self.bmc_user)
            .field("bmc_passwd", &"<redacted>")
            .finish()
    }
}

impl BmcCredentials {
    /// Resolve credentials from configuration and an optional stable seed
    pub fn resolve(config: &BmcConfig, seed: Option<&str>) -> Self {
        let bmc_user = config
            .bmc_user
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BMC_USER.to_string());

        let bmc_passwd = match (&config.bmc_passwd, seed) {
            (Some(passwd), _) if !passwd.is_empty() => passwd.clone(),
            (_, Some(seed)) if !seed.is_empty() => derive_password(seed, &bmc_user),
            _ => random_password(),
        };

        Self {
            bmc_user,
            bmc_passwd,
        }
    }
}

/// Deterministic password: hex SHA-256 over the seed and the user name
pub fn derive_password(seed: &str, user: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(b":");
    hasher.update(user.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Fresh random password
pub fn random_password() -> String {
    Uuid::new_v4().to_string()
}
