// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # K2 Extractor
//!
//! Extracts nested K2 business objects into flat, relationally linked
//! tables whose column sets grow across runs without ever shrinking.
//!
//! ## Features
//!
//! - **Relation Resolution**: Child collections resolved from object metadata
//! - **Flattening**: Embedded objects become prefixed columns, child
//!   collections become child tables stamped with the parent's keys
//! - **Schema Evolution**: Column lists carried between runs, append-only
//! - **Incremental Loads**: Date windows folded into the data query
//! - **Parquet Output**: One file and manifest per table
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use k2_extractor::{ExtractorConfig, Result};
//! use k2_extractor::client::K2Client;
//! use k2_extractor::engine::ExtractionEngine;
//! use k2_extractor::output::ParquetSink;
//! use k2_extractor::state::StateManager;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ExtractorConfig::from_file("config.yaml")?;
//!     config.validate()?;
//!
//!     let state = StateManager::from_file("state.json")?;
//!     let last_run = state.snapshot().await.last_run;
//!     let job = config.job(last_run.as_deref(), chrono::Local::now().naive_local())?;
//!
//!     let client = K2Client::new(&config.client_config())?;
//!     let engine = ExtractionEngine::new(&client, &client, state);
//!     let stats = engine.run(&job, &mut ParquetSink::new("out")).await?;
//!     println!("{} rows", stats.total_rows());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       ExtractionEngine                          │
//! │  plan(job) → ExtractionPlan     run(job, sink) → RunStats       │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │ Metadata │  Client   │   Flatten     │   Table   │   Output    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Entity   │ Signing   │ Embedded obj  │ Handler   │ Parquet     │
//! │ Resolver │ Retry     │ Child rows    │ Router    │ Manifest    │
//! │ PK policy│ Rate Limit│ FK stamping   │ Evolution │ Memory      │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the extractor
pub mod error;

/// Common types and type aliases
pub mod types;

/// Object metadata and child relation resolution
pub mod metadata;

/// Payload decoding
pub mod decode;

/// Flattening of object graphs into table rows
pub mod flatten;

/// Table handlers and schema evolution
pub mod table;

/// Paged data provider
pub mod pagination;

/// Main execution engine
pub mod engine;

/// Run state persistence
pub mod state;

/// Arrow/Parquet output
pub mod output;

/// HTTP client with retry and rate limiting
pub mod http;

/// K2 REST API client
pub mod client;

/// Extractor configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::ExtractorConfig;
pub use error::{Error, Result};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
