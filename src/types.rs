//! Common types used throughout the extractor
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// One flattened output row: column name to scalar value.
///
/// Iteration order is the order in which columns were first set.
pub type FlatRow = IndexMap<String, JsonValue>;

/// Row batches keyed by destination table, in table discovery order
pub type TableBatches = IndexMap<String, Vec<FlatRow>>;

// ============================================================================
// Load Type
// ============================================================================

/// How much data a run fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadType {
    /// Fetch everything matching the configured conditions
    #[default]
    #[serde(rename = "Full load", alias = "full_load")]
    FullLoad,
    /// Fetch only records whose incremental field falls within a date window
    #[serde(rename = "Incremental load", alias = "incremental_load")]
    IncrementalLoad,
}

impl LoadType {
    /// Whether this run is incremental
    pub fn is_incremental(self) -> bool {
        matches!(self, Self::IncrementalLoad)
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.trim().is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.trim().is_empty() {
            None
        } else {
            Some(self)
        }
    }
}
