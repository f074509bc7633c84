//! Run state persisted between invocations

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Format of `last_run`
pub const STATE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// State of the last completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// When the last completed run started
    #[serde(default)]
    pub last_run: Option<String>,

    /// Final column list per table
    #[serde(default)]
    pub previous_columns: BTreeMap<String, Vec<String>>,
}

impl RunState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns recorded for a table; empty if the table is new
    pub fn previous_columns(&self, table: &str) -> Vec<String> {
        self.previous_columns.get(table).cloned().unwrap_or_default()
    }

    /// Record the columns a table finished with
    pub fn set_columns(&mut self, table: impl Into<String>, columns: Vec<String>) {
        self.previous_columns.insert(table.into(), columns);
    }

    /// Stamp the run time
    pub fn set_last_run(&mut self, at: NaiveDateTime) {
        self.last_run = Some(at.format(STATE_TIMESTAMP_FORMAT).to_string());
    }

    /// Parsed `last_run`, if present and well formed
    pub fn last_run_at(&self) -> Option<NaiveDateTime> {
        self.last_run
            .as_deref()
            .and_then(|s| NaiveDateTime::parse_from_str(s, STATE_TIMESTAMP_FORMAT).ok())
    }

    /// State for the next run: this run's columns layered over the previous
    /// ones, so tables absent from this run keep their history
    #[must_use]
    pub fn merged_with(&self, next: RunState) -> RunState {
        let mut previous_columns = self.previous_columns.clone();
        previous_columns.extend(next.previous_columns);
        RunState {
            last_run: next.last_run.or_else(|| self.last_run.clone()),
            previous_columns,
        }
    }
}
