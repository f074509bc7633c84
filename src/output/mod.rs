//! Output module
//!
//! Receives finished tables and persists them.
//!
//! # Overview
//!
//! This module provides:
//! - `RowSink` - the writer contract used by table handlers
//! - `TableManifest` - final column list, keys and descriptions of a table
//! - `ParquetSink` - one Parquet file plus a JSON manifest per table
//! - `MemorySink` - keeps everything in memory
//! - Arrow conversion of sparse rows into rectangular UTF-8 batches

mod schema;
mod sink;
mod types;
mod writer;

pub use schema::{batch_to_rows, render_value, rows_to_batch, table_schema};
pub use sink::{MemorySink, ParquetSink};
pub use types::{RowSink, TableManifest};
pub use writer::{write_batch_to_parquet, ParquetWriter, ParquetWriterConfig};
