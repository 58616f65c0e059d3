//! CLI module for vshasta
//!
//! Provides subcommands:
//! - `vshasta xnames` - Show the xname assigned to every blade and node
//! - `vshasta consolidate` - Consolidate and print a summary (dry run)
//! - `vshasta prepare` - Write the consolidated config and seed files
//! - `vshasta validate` - Prepare, then check pools and gateways
//! - `vshasta deploy` - Prepare, validate and push to the targets
//! - `vshasta remove` - Tear down the application layer
//! - `vshasta hosts` - Print the `/etc/hosts` fragment

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod display;

pub use commands::*;
pub use display::*;

#[derive(Parser, Debug)]
#[command(name = "vshasta")]
#[command(about = "Resolve a virtual cluster into xnames and deploy its application layer")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a .env file loaded before anything else
    #[arg(long, value_name = "FILE", global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the xname assigned to every blade and node
    Xnames(InputArgs),

    /// Consolidate the configuration and print a summary without writing
    Consolidate(InputArgs),

    /// Write the consolidated configuration and seed files
    Prepare(InputArgs),

    /// Prepare, then check subnet pools and gateways
    Validate(InputArgs),

    /// Prepare, validate and deploy to every target
    Deploy(DeployArgs),

    /// Remove the application layer
    Remove(InputArgs),

    /// Print the hosts file fragment for the cluster
    Hosts(InputArgs),
}

/// Inputs shared by every command
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Application configuration (YAML or JSON)
    #[arg(short, long, value_name = "FILE")]
    pub application: PathBuf,

    /// Cluster description (YAML or JSON)
    #[arg(short, long, value_name = "FILE")]
    pub cluster: PathBuf,

    /// Build directory (default: ~/.vshasta/build)
    #[arg(long, value_name = "DIR")]
    pub build_dir: Option<String>,

    /// Seed for deterministic BMC passwords
    #[arg(long, env = "VSHASTA_BMC_SEED", hide_env_values = true)]
    pub bmc_seed: Option<String>,
}

/// Arguments for the deploy command
#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Directory holding the deploy scripts (overrides deploy.scripts_dir)
    #[arg(long, value_name = "DIR")]
    pub scripts_dir: Option<String>,

    /// Skip subnet and gateway validation
    #[arg(long)]
    pub skip_validation: bool,
}
