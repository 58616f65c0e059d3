use std::process;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vshasta::cli::{
    consolidate_summary, deploy, format_prepared, format_summary, format_xname_table, hosts_block,
    list_xnames, prepare, remove, validate, Cli, Commands,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    // Load .env file if specified
    if let Some(ref env_file) = cli.env_file {
        if let Err(e) = dotenvy::from_path(env_file) {
            error!("Failed to load env file {}: {}", env_file.display(), e);
            process::exit(1);
        }
    }

    if let Err(e) = run(cli.command).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Xnames(input) => {
            let rows = list_xnames(&input).context("failed to assign xnames")?;
            print!("{}", format_xname_table(&rows));
        }
        Commands::Consolidate(input) => {
            let summary = consolidate_summary(&input).context("consolidation failed")?;
            print!("{}", format_summary(&summary));
        }
        Commands::Prepare(input) => {
            let application = prepare(&input).context("prepare failed")?;
            print!(
                "{}",
                format_prepared(&application.config_path(), &application.seed_dir())
            );
        }
        Commands::Validate(input) => {
            validate(&input).context("validation failed")?;
            println!("System configuration is valid");
        }
        Commands::Deploy(args) => {
            let application = deploy(&args).await.context("deployment failed")?;
            info!("deployed from {}", application.build_dir().display());
            println!("Application layer deployed");
        }
        Commands::Remove(input) => {
            remove(&input).context("remove failed")?;
            println!("Application layer removed");
        }
        Commands::Hosts(input) => {
            print!("{}", hosts_block(&input).context("failed to build host map")?);
        }
    }
    Ok(())
}
