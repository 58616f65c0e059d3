//! Error taxonomy for the resolution, validation and deployment pipeline
//!
//! Every error is fatal to the operation that raised it. Nothing here is
//! retried internally; callers discard partial output and restart from
//! `consolidate()`.

use std::path::PathBuf;

use thiserror::Error;

/// Missing or malformed required configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("required configuration field '{0}' is missing")]
    MissingField(String),

    #[error("configuration field '{field}' has invalid value '{value}': {reason}")]
    InvalidField {
        field: String,
        value: String,
        reason: String,
    },

    #[error("geometry references blade class '{0}' which is not defined in the topology")]
    UnknownBladeClass(String),

    #[error("blade class '{0}' appears more than once in the cabinet geometry")]
    DuplicateBladeClass(String),

    #[error("no network declares the network role '{0}'")]
    MissingNetworkRole(String),

    #[error("CSM version (csm.version) supplied '{0}' is not a valid semantic version")]
    InvalidVersion(String),

    #[error("failed to parse {0}: {1}")]
    Parse(String, String),

    #[error("deploy file '{0}' does not exist")]
    MissingDeployFile(String),
}

/// Topology or geometry inconsistencies discovered while resolving
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    #[error("unable to find blade class '{0}' in blade class list {1:?}")]
    BladeClassNotInList(String, Vec<String>),

    #[error("node class '{0}' is not defined in the topology")]
    UnknownNodeClass(String),

    #[error("node class '{node_class}' is hosted on undefined blade class '{blade_class}'")]
    UnknownHostBlade {
        node_class: String,
        blade_class: String,
    },

    #[error("node class '{0}' has no instance {1}")]
    UnknownNodeInstance(String, usize),

    #[error("node class '{0}' declares an instance capacity of zero")]
    ZeroCapacity(String),

    #[error("node class '{0}' instance range overflows for blade instance {1}")]
    CapacityOverflow(String, usize),

    #[error("network role '{role}' is declared by both '{first}' and '{second}'")]
    DuplicateRole {
        role: String,
        first: String,
        second: String,
    },

    #[error("xname '{0}' was assigned to more than one instance")]
    DuplicateXname(String),
}

/// A post-consolidation containment check failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("system config field '{0}' is missing")]
    MissingField(String),

    #[error("system config field '{field}' value '{value}' is malformed: {reason}")]
    Malformed {
        field: String,
        value: String,
        reason: String,
    },

    #[error("system config field '{field}' ({value}) is not within '{network_field}' ({network})")]
    NotContained {
        field: String,
        value: String,
        network_field: String,
        network: String,
    },
}

/// An operation was invoked before the step it depends on
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot {operation} an {state} application, call {step}() first")]
pub struct PreconditionError {
    pub operation: String,
    pub state: String,
    pub step: String,
}

impl PreconditionError {
    /// `operation` requires `prepare()`
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            state: "unprepared".to_string(),
            step: "prepare".to_string(),
        }
    }

    /// `operation` requires `consolidate()`
    pub fn unconsolidated(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            state: "unconsolidated".to_string(),
            step: "consolidate".to_string(),
        }
    }
}

/// Failure reported by the remote execution collaborator
#[derive(Error, Debug)]
pub enum RemoteExecutionError {
    #[error("no targets known for {kind} class '{class}'")]
    NoTargets { kind: String, class: String },

    #[error("'{command}' failed on {host} ({logname}): exit code {code}: {stderr}")]
    CommandFailed {
        logname: String,
        host: String,
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("'{command}' timed out on {host} after {seconds}s")]
    Timeout {
        host: String,
        command: String,
        seconds: u64,
    },

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Umbrella error for the whole pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Precondition(#[from] PreconditionError),

    #[error("remote execution error: {0}")]
    RemoteExecution(#[from] RemoteExecutionError),

    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
