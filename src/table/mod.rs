//! Table handler module
//!
//! One `TableHandler` per destination table owns its column list and rows.
//!
//! # Overview
//!
//! - Columns are seeded from the previous run and only ever appended to
//! - Rows are sparse; `project_row` makes them rectangular over the final
//!   column list at serialization time
//! - `TableRouter` hands each flattened batch to its handler and treats a
//!   batch for an unknown table as an internal defect

mod handler;
mod router;

pub use handler::{project_row, TableHandler};
pub use router::TableRouter;
