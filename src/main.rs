// ABOUTME: Entry point for the caravel CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use caravel::config::{self, Config};
use caravel::error::Result;
use caravel::output::{Output, OutputMode};
use clap::Parser;
use cli::{Cli, Commands};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbose flag
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    if let Err(e) = run(cli, Output::new(mode)).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    let cwd = env::current_dir()?;

    if let Commands::Init {
        application,
        repository,
        force,
    } = &cli.command
    {
        let path = config::init_config(&cwd, application.as_deref(), repository.as_deref(), *force)?;
        output.success(&format!("Created {}", path.display()));
        return Ok(());
    }

    let config = Config::discover(&cwd)?;

    // Apply destination overrides if specified
    let config = match cli.destination.as_deref() {
        Some(dest) => config.for_destination(dest)?,
        None => config,
    };

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Setup => commands::setup(config, output).await,
        Commands::Deploy { branch, yes, force } => {
            let args = commands::DeployArgs {
                branch: &branch,
                destination: cli.destination.as_deref(),
                yes,
                force,
            };
            commands::deploy(config, args, output).await
        }
        Commands::Releases => commands::releases(config, output).await,
        Commands::Prune { keep } => commands::prune(config, keep, output).await,
        Commands::Rollback { force } => commands::rollback(config, force, output).await,
        Commands::Status => commands::status(config, output),
    }
}
