//! CSM semantic version parsing
//!
//! Accepts exactly `<major>.<minor>.<patch>[-<label>][+<build>]`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// A parsed semantic version. Numeric parts are kept as the digit strings
/// that were supplied.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SemanticVersion {
    pub major: String,
    pub minor: String,
    pub patch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<major>[0-9]+)\.(?P<minor>[0-9]+)\.(?P<patch>[0-9]+)(?:-(?P<label>[0-9A-Za-z.\-]+))?(?:\+(?P<build>[0-9A-Za-z.\-]+))?$",
        )
        .expect("version pattern is a valid regex")
    })
}

/// Parse a semantic version string
pub fn parse_version(s: &str) -> Result<SemanticVersion, ConfigurationError> {
    let caps = version_pattern()
        .captures(s)
        .ok_or_else(|| ConfigurationError::InvalidVersion(s.to_string()))?;
    let part = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

    Ok(SemanticVersion {
        major: part("major").unwrap_or_default(),
        minor: part("minor").unwrap_or_default(),
        patch: part("patch").unwrap_or_default(),
        label: part("label"),
        build: part("build"),
    })
}

impl SemanticVersion {
    /// `<major>.<minor>`, as written into the system config
    pub fn major_minor(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(label) = &self.label {
            write!(f, "-{}", label)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}
