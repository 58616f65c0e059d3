//! Command implementations for the CLI
//!
//! SBIO pattern: Commands return Results, I/O is handled by caller

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::{
    default_build_dir, expand_path, load_application_file, load_cluster_file, ApplicationConfig,
    BmcCredentials,
};
use crate::consolidate::{render_hosts_block, Consolidation};
use crate::deploy::Application;
use crate::error::Error as PipelineError;
use crate::topology::{ClusterDescription, Topology};

use super::{DeployArgs, InputArgs};

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Result type for commands
pub type CommandResult<T> = Result<T, CommandError>;

// ============================================================================
// Input loading
// ============================================================================

/// Load both input documents
pub fn load_inputs(input: &InputArgs) -> CommandResult<(ApplicationConfig, ClusterDescription)> {
    let app = load_application_file(&input.application)?;
    let cluster = load_cluster_file(&input.cluster)?;
    Ok((app, cluster))
}

pub fn build_dir(input: &InputArgs) -> PathBuf {
    input
        .build_dir
        .as_deref()
        .map(expand_path)
        .unwrap_or_else(default_build_dir)
}

fn unconsolidated_application(input: &InputArgs) -> CommandResult<(Application, BmcCredentials)> {
    let (app, cluster) = load_inputs(input)?;
    let bmc = app.bmc_config().map_err(PipelineError::from)?;
    let credentials = BmcCredentials::resolve(bmc, input.bmc_seed.as_deref());
    Ok((Application::new(app, cluster, build_dir(input)), credentials))
}

/// Load inputs and run consolidation
pub fn consolidated_application(input: &InputArgs) -> CommandResult<Application> {
    let (mut application, credentials) = unconsolidated_application(input)?;
    application.consolidate(&credentials)?;
    Ok(application)
}

/// Load inputs, consolidate, and hand the result to `f`
fn with_consolidation<T>(
    input: &InputArgs,
    f: impl FnOnce(&Consolidation) -> T,
) -> CommandResult<T> {
    let (mut application, credentials) = unconsolidated_application(input)?;
    Ok(f(application.consolidate(&credentials)?))
}

// ============================================================================
// Xname Commands
// ============================================================================

/// One row of the xname listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XnameRow {
    pub xname: String,
    pub kind: &'static str,
    pub class_name: String,
    pub instance: usize,
    pub role: String,
}

/// Blade rows followed by node rows, each ordered by xname
pub fn xname_rows(consolidation: &Consolidation) -> Vec<XnameRow> {
    let topology: &Topology = &consolidation.topology;
    let mut rows: Vec<XnameRow> = consolidation
        .config
        .blade_xname_map
        .iter()
        .map(|(xname, blade)| XnameRow {
            xname: xname.clone(),
            kind: "blade",
            class_name: blade.blade_class.clone(),
            instance: blade.instance,
            role: String::new(),
        })
        .collect();

    rows.extend(consolidation.config.xname_map.iter().map(|(xname, node)| {
        XnameRow {
            xname: xname.clone(),
            kind: "node",
            class_name: node.node_class.clone(),
            instance: node.instance,
            role: topology
                .node_class(&node.node_class)
                .and_then(|n| n.node_role.clone())
                .unwrap_or_default(),
        }
    }));
    rows
}

// ============================================================================
// Consolidate Commands
// ============================================================================

/// Counts reported by a dry-run consolidation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationSummary {
    pub cabinets: Vec<u32>,
    pub blades: usize,
    pub nodes: usize,
    pub hosts: usize,
    pub csm_version: String,
    pub network_cidrs: BTreeMap<String, String>,
    pub ntp_peers: Vec<String>,
}

pub fn summarize(consolidation: &Consolidation) -> ConsolidationSummary {
    let system_config = consolidation
        .config
        .application
        .seed_files
        .system_config
        .clone()
        .unwrap_or_default();

    let network_cidrs = [
        ("can-cidr", &system_config.can_cidr),
        ("chn-cidr", &system_config.chn_cidr),
        ("cmn-cidr", &system_config.cmn_cidr),
        ("hmn-cidr", &system_config.hmn_cidr),
        ("hsn-cidr", &system_config.hsn_cidr),
        ("nmn-cidr", &system_config.nmn_cidr),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.clone().map(|v| (key.to_string(), v)))
    .collect();

    ConsolidationSummary {
        cabinets: consolidation.geometry.cabinet_ids(),
        blades: consolidation.config.blade_xname_map.len(),
        nodes: consolidation.config.xname_map.len(),
        hosts: consolidation.config.host_ipv4_map.len(),
        csm_version: system_config.csm_version.clone().unwrap_or_default(),
        network_cidrs,
        ntp_peers: system_config.ntp_peers.clone(),
    }
}

pub fn consolidate_summary(input: &InputArgs) -> CommandResult<ConsolidationSummary> {
    with_consolidation(input, summarize)
}

pub fn list_xnames(input: &InputArgs) -> CommandResult<Vec<XnameRow>> {
    with_consolidation(input, xname_rows)
}

pub fn hosts_block(input: &InputArgs) -> CommandResult<String> {
    with_consolidation(input, |c| render_hosts_block(&c.config.host_ipv4_map))
}

// ============================================================================
// Lifecycle Commands
// ============================================================================

/// Consolidate and prepare, returning the prepared application
pub fn prepare(input: &InputArgs) -> CommandResult<Application> {
    let mut application = consolidated_application(input)?;
    application.prepare()?;
    Ok(application)
}

pub fn validate(input: &InputArgs) -> CommandResult<Application> {
    let application = prepare(input)?;
    application.validate()?;
    Ok(application)
}

pub fn remove(input: &InputArgs) -> CommandResult<()> {
    let application = prepare(input)?;
    application.remove()?;
    Ok(())
}

/// Prepare, optionally validate, then deploy over ssh
pub async fn deploy(args: &DeployArgs) -> CommandResult<Application> {
    let mut application = prepare(&args.input)?;
    if let Some(dir) = args.scripts_dir.as_deref() {
        application = application.with_scripts_dir(expand_path(dir));
    }
    if !args.skip_validation {
        application.validate()?;
    }

    let executor = application.ssh_executor();
    application.deploy(&executor).await?;
    Ok(application)
}
