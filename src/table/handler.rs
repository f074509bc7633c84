//! Table handler with append-only schema evolution

use crate::error::Result;
use crate::output::{RowSink, TableManifest};
use crate::types::{FlatRow, JsonValue};
use indexmap::IndexSet;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Owns one output table for the duration of a run
#[derive(Debug, Clone)]
pub struct TableHandler {
    table_name: String,
    primary_keys: Vec<String>,
    known_columns: IndexSet<String>,
    seeded_columns: usize,
    pending: Vec<FlatRow>,
    rows_appended: usize,
    incremental: bool,
    description: Option<String>,
    column_descriptions: BTreeMap<String, String>,
}

impl TableHandler {
    /// Create a handler seeded with the columns recorded by the previous run
    pub fn new(
        table_name: impl Into<String>,
        primary_keys: Vec<String>,
        previous_columns: Vec<String>,
    ) -> Self {
        let known_columns: IndexSet<String> = previous_columns.into_iter().collect();
        Self {
            table_name: table_name.into(),
            primary_keys,
            seeded_columns: known_columns.len(),
            known_columns,
            pending: Vec::new(),
            rows_appended: 0,
            incremental: false,
            description: None,
            column_descriptions: BTreeMap::new(),
        }
    }

    /// Mark the table as incrementally loaded
    #[must_use]
    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    /// Attach table and column descriptions for the manifest
    #[must_use]
    pub fn with_descriptions(
        mut self,
        description: Option<String>,
        column_descriptions: BTreeMap<String, String>,
    ) -> Self {
        self.description = description;
        self.column_descriptions = column_descriptions;
        self
    }

    /// Table name
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Primary key columns
    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    /// Columns known so far, previous-run columns first
    pub fn known_columns(&self) -> Vec<String> {
        self.known_columns.iter().cloned().collect()
    }

    /// Columns discovered during this run
    pub fn new_columns(&self) -> Vec<&str> {
        self.known_columns
            .iter()
            .skip(self.seeded_columns)
            .map(String::as_str)
            .collect()
    }

    /// Rows appended over the whole run
    pub fn rows_appended(&self) -> usize {
        self.rows_appended
    }

    /// Rows appended but not yet handed to a sink
    pub fn pending_rows(&self) -> usize {
        self.pending.len()
    }

    /// Append one row, registering any unseen columns
    pub fn append(&mut self, row: FlatRow) {
        for column in row.keys() {
            if !self.known_columns.contains(column) {
                debug!(table = %self.table_name, column = %column, "New column");
                self.known_columns.insert(column.clone());
            }
        }
        self.pending.push(row);
        self.rows_appended += 1;
    }

    /// Append rows in order
    pub fn append_all(&mut self, rows: impl IntoIterator<Item = FlatRow>) {
        for row in rows {
            self.append(row);
        }
    }

    /// Values of `row` for every known column, missing ones as null
    pub fn project(&self, row: &FlatRow) -> Vec<JsonValue> {
        self.known_columns
            .iter()
            .map(|c| row.get(c).cloned().unwrap_or(JsonValue::Null))
            .collect()
    }

    /// Hand pending rows to the sink
    pub fn flush(&mut self, sink: &mut dyn RowSink) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let rows = std::mem::take(&mut self.pending);
        let count = rows.len();
        sink.write(&self.table_name, rows)?;
        Ok(count)
    }

    /// Snapshot of the manifest describing this table now
    pub fn manifest(&self) -> TableManifest {
        let columns = self.known_columns();
        let column_descriptions = self
            .column_descriptions
            .iter()
            .filter(|(name, _)| self.known_columns.contains(*name))
            .map(|(name, desc)| (name.clone(), desc.clone()))
            .collect();

        TableManifest {
            table_name: self.table_name.clone(),
            columns,
            primary_keys: self.primary_keys.clone(),
            incremental: self.incremental,
            description: self.description.clone(),
            column_descriptions,
        }
    }

    /// Flush remaining rows and finalize the table in the sink.
    ///
    /// Returns the manifest, whose `columns` is the list to persist for the
    /// next run.
    pub fn close(mut self, sink: &mut dyn RowSink) -> Result<TableManifest> {
        self.flush(sink)?;
        let manifest = self.manifest();
        sink.finalize(&manifest)?;
        info!(
            table = %self.table_name,
            rows = self.rows_appended,
            columns = manifest.columns.len(),
            new_columns = self.known_columns.len() - self.seeded_columns,
            "Table finalized"
        );
        Ok(manifest)
    }
}

/// Values of `row` in `columns` order, missing ones as null
pub fn project_row(row: &FlatRow, columns: &[String]) -> Vec<JsonValue> {
    columns
        .iter()
        .map(|c| row.get(c).cloned().unwrap_or(JsonValue::Null))
        .collect()
}
