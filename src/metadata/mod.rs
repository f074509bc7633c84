//! Object metadata module
//!
//! Read-only view over the class descriptions served by the K2 API, and the
//! resolver that turns a requested field list into the child relations that
//! must be extracted.
//!
//! # Overview
//!
//! - `EntityMetadata` - primary keys, fields and declared children of a class
//! - `MetadataProvider` - source of metadata (REST client, static map)
//! - `ChildRelationResolver` - walks dotted field paths into `ChildRelation`s
//! - `PrimaryKeyPolicy` - overrides and the opt-in name heuristic

mod provider;
mod resolver;
mod types;

pub use provider::{MetadataProvider, StaticMetadataProvider};
pub use resolver::ChildRelationResolver;
pub use types::{
    ChildDefinition, ChildRelation, EntityMetadata, FieldDefinition, PrimaryKeyField,
    PrimaryKeyPolicy,
};
