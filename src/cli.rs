use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "availarr")]
#[command(author, version, about = "Streaming-availability tags for Radarr")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single reconciliation pass and exit
    Run {
        /// Compute and log tag changes without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Run continuously, reconciling every `run_interval_secs`
    Start,

    /// List TMDB streaming providers for the configured region
    Providers {
        /// Also list all regions TMDB has provider data for
        #[arg(long)]
        regions: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
