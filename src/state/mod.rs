//! State management module
//!
//! Carries the run state between invocations: the timestamp of the last
//! completed run and, per table, the column list it finished with. Seeding
//! table handlers from that list keeps output schemas append-only.

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{RunState, STATE_TIMESTAMP_FORMAT};

#[cfg(test)]
mod manager_tests;
