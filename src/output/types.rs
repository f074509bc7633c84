//! Output types and the sink contract

use crate::error::Result;
use crate::types::FlatRow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Final description of one output table
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableManifest {
    /// Table name
    pub table_name: String,
    /// Final column list, in output order
    pub columns: Vec<String>,
    /// Primary key columns
    pub primary_keys: Vec<String>,
    /// Whether the destination should load incrementally
    #[serde(default)]
    pub incremental: bool,
    /// Table description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Column descriptions for known columns
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub column_descriptions: BTreeMap<String, String>,
}

/// Destination for flattened rows
///
/// `write` may be called many times per table; `finalize` is called once,
/// after the last `write`, and only for runs that completed. A sink must not
/// publish a table before it is finalized.
pub trait RowSink {
    /// Accept rows for a table
    fn write(&mut self, table: &str, rows: Vec<FlatRow>) -> Result<()>;

    /// Complete a table with its final column list
    fn finalize(&mut self, manifest: &TableManifest) -> Result<()>;
}
