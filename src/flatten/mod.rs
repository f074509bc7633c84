//! Flattening module
//!
//! Decomposes one decoded record into rows for a main table plus one table
//! per child relation, stamping parent keys onto every child row.
//!
//! # Overview
//!
//! - Scalars land in the current row under their (prefixed) name
//! - Embedded objects merge into the current row, prefixing names with
//!   `{field}_` at every level (`Address_City`)
//! - Child collections start a fresh row per element in
//!   `{parent_class}_{field}` and get `{parent_class}_{parent_key}` columns
//! - Collections without a resolved relation are skipped and reported
//!
//! Flattening is pure: the same record and relations always give the same
//! rows in the same order.

mod flattener;
mod types;

pub use flattener::Flattener;
pub use types::{FlattenOutput, FlattenReport, RelationMap};
