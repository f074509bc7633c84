//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// K2 object graph extractor
#[derive(Parser, Debug)]
#[command(name = "k2-extractor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON or YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// State file (JSON), read before and written after a run
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Output directory for tables and manifests
    #[arg(short, long, global = true, default_value = "out")]
    pub output: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Extract the configured object into Parquet tables
    Run,

    /// Print destination tables with their primary and foreign keys
    Resolve,

    /// Validate configuration and print the effective condition
    Validate,
}
