//! CLI module
//!
//! Command-line interface for running extractions.
//!
//! # Commands
//!
//! - `run` - Extract the configured object into Parquet tables
//! - `resolve` - Print the routing table without fetching data
//! - `validate` - Validate configuration and print the effective condition

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
