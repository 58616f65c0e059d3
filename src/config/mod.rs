pub mod application;
pub mod credentials;
pub mod validation;
pub mod version;

pub use application::{
    ApplicationConfig, ApplicationDocument, BmcConfig, DeploySettings, RiverCabinets, SystemConfig,
    APP_CONFIG_NAME, BLADE_DEPLOY_SCRIPT_NAME, COMMON_DEPLOY_LIB_NAME, NODE_DEPLOY_SCRIPT_NAME,
};
pub use credentials::{BmcCredentials, DEFAULT_BMC_USER};
pub use validation::validate_system_config;
pub use version::{parse_version, SemanticVersion};

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{ConfigurationError, Error, Result};
use crate::topology::ClusterDescription;

/// Default build directory: ~/.vshasta/build
pub fn default_build_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vshasta")
        .join("build")
}

/// Expand `~` and `$VAR` references in a configured path
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

/// Document encodings accepted on input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// `.json` selects JSON; anything else is read as YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

// ============================================================================
// SBIO: Pure parsing
// ============================================================================

fn parse_document<T: DeserializeOwned>(
    content: &str,
    format: DocumentFormat,
    what: &str,
) -> std::result::Result<T, ConfigurationError> {
    match format {
        DocumentFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| ConfigurationError::Parse(what.to_string(), e.to_string())),
        DocumentFormat::Json => serde_json::from_str(content)
            .map_err(|e| ConfigurationError::Parse(what.to_string(), e.to_string())),
    }
}

/// Parse an application configuration document and extract its
/// `application` section
pub fn parse_application(
    content: &str,
    format: DocumentFormat,
) -> std::result::Result<ApplicationConfig, ConfigurationError> {
    let document: ApplicationDocument = parse_document(content, format, "application configuration")?;
    document
        .application
        .ok_or_else(|| ConfigurationError::MissingField("application".to_string()))
}

/// Parse a cluster description document
pub fn parse_cluster(
    content: &str,
    format: DocumentFormat,
) -> std::result::Result<ClusterDescription, ConfigurationError> {
    parse_document(content, format, "cluster description")
}

// ============================================================================
// SBIO: I/O wrapper - thin layer over pure functions
// ============================================================================

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Load the application configuration file
pub fn load_application_file(path: &Path) -> Result<ApplicationConfig> {
    let content = read(path)?;
    Ok(parse_application(&content, DocumentFormat::from_path(path))?)
}

/// Load the cluster description file
pub fn load_cluster_file(path: &Path) -> Result<ClusterDescription> {
    let content = read(path)?;
    Ok(parse_cluster(&content, DocumentFormat::from_path(path))?)
}
