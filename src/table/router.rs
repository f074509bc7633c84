//! Routing of flattened batches to table handlers

use super::handler::TableHandler;
use crate::error::{Error, Result};
use crate::output::{RowSink, TableManifest};
use crate::types::TableBatches;
use indexmap::IndexMap;

/// The set of handlers for one run, in creation order
#[derive(Debug, Default)]
pub struct TableRouter {
    handlers: IndexMap<String, TableHandler>,
}

impl TableRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; a second handler for the same table replaces the first
    pub fn insert(&mut self, handler: TableHandler) {
        self.handlers
            .insert(handler.table_name().to_string(), handler);
    }

    /// Register a handler (builder style)
    #[must_use]
    pub fn with_handler(mut self, handler: TableHandler) -> Self {
        self.insert(handler);
        self
    }

    /// Handler for a table
    pub fn get(&self, table: &str) -> Option<&TableHandler> {
        self.handlers.get(table)
    }

    /// Registered table names, in creation order
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Number of handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Append every batch to its table's handler.
    ///
    /// Fails before appending anything if a batch names a table without a
    /// handler.
    pub fn route(&mut self, batches: TableBatches) -> Result<usize> {
        if let Some(table) = batches.keys().find(|t| !self.handlers.contains_key(*t)) {
            return Err(Error::unrouted(table.clone()));
        }

        let mut routed = 0;
        for (table, rows) in batches {
            routed += rows.len();
            if let Some(handler) = self.handlers.get_mut(&table) {
                handler.append_all(rows);
            }
        }
        Ok(routed)
    }

    /// Hand all pending rows to the sink
    pub fn flush(&mut self, sink: &mut dyn RowSink) -> Result<usize> {
        let mut written = 0;
        for handler in self.handlers.values_mut() {
            written += handler.flush(sink)?;
        }
        Ok(written)
    }

    /// Close every handler, returning their manifests in creation order
    pub fn close_all(self, sink: &mut dyn RowSink) -> Result<Vec<TableManifest>> {
        let mut manifests = Vec::with_capacity(self.handlers.len());
        for handler in self.handlers.into_values() {
            manifests.push(handler.close(sink)?);
        }
        Ok(manifests)
    }
}
