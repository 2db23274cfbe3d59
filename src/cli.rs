// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "caravel")]
#[command(about = "Release-directory deployments with atomic symlink cutover")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Target destination (defined in config)
    #[arg(short, long, global = true)]
    pub destination: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new caravel.yml configuration file
    Init {
        /// Application name
        #[arg(long)]
        application: Option<String>,

        /// Repository the hosts clone from
        #[arg(long)]
        repository: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Create the releases and shared directories on every server
    Setup,

    /// Tag a branch and deploy it as a new release
    Deploy {
        /// Branch to deploy
        branch: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Break a deploy lock held by someone else
        #[arg(long)]
        force: bool,
    },

    /// List releases on every server, newest first
    Releases,

    /// Delete old releases beyond the retention count
    Prune {
        /// Number of releases to keep (defaults to keep_releases)
        #[arg(long)]
        keep: Option<usize>,
    },

    /// Point current at the release before the active one
    Rollback {
        /// Break a deploy lock held by someone else
        #[arg(long)]
        force: bool,
    },

    /// Show configured application, layout, and servers
    Status,
}
