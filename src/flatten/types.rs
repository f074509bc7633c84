//! Flattening types

use crate::metadata::ChildRelation;
use crate::types::TableBatches;
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Resolved child relations keyed by field name
///
/// Several parent classes may declare the same child field name; lookups
/// prefer the entry whose parent class matches the object being flattened.
#[derive(Debug, Clone, Default)]
pub struct RelationMap {
    by_field: IndexMap<String, Vec<ChildRelation>>,
}

impl RelationMap {
    /// Build a map from resolved relations
    pub fn new(relations: impl IntoIterator<Item = ChildRelation>) -> Self {
        let mut by_field: IndexMap<String, Vec<ChildRelation>> = IndexMap::new();
        for relation in relations {
            by_field
                .entry(relation.field_name.clone())
                .or_default()
                .push(relation);
        }
        Self { by_field }
    }

    /// Find the relation for a collection field.
    ///
    /// A known parent class must match a declaring class exactly; only an
    /// object without a class marker falls back to the first declaration.
    pub fn lookup(&self, field_name: &str, parent_class: Option<&str>) -> Option<&ChildRelation> {
        let candidates = self.by_field.get(field_name)?;
        match parent_class {
            Some(class) => candidates.iter().find(|r| r.parent_class_name == class),
            None => candidates.first(),
        }
    }

    /// Find the relation whose rows go to `table_name`
    pub fn by_table(&self, table_name: &str) -> Option<&ChildRelation> {
        self.iter().find(|r| r.table_name() == table_name)
    }

    /// All relations, in resolution order per field
    pub fn iter(&self) -> impl Iterator<Item = &ChildRelation> {
        self.by_field.values().flatten()
    }

    /// Number of relations
    pub fn len(&self) -> usize {
        self.by_field.values().map(Vec::len).sum()
    }

    /// Whether there are no relations
    pub fn is_empty(&self) -> bool {
        self.by_field.is_empty()
    }
}

impl FromIterator<ChildRelation> for RelationMap {
    fn from_iter<I: IntoIterator<Item = ChildRelation>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Data-quality observations from flattening
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenReport {
    /// Foreign key values left empty because the parent key was absent
    pub missing_parent_keys: usize,
    /// Collection fields skipped for lack of a resolved relation
    pub unmatched_collections: BTreeSet<String>,
}

impl FlattenReport {
    /// Fold another report into this one
    pub fn merge(&mut self, other: FlattenReport) {
        self.missing_parent_keys += other.missing_parent_keys;
        self.unmatched_collections
            .extend(other.unmatched_collections);
    }

    /// Whether nothing noteworthy happened
    pub fn is_clean(&self) -> bool {
        self.missing_parent_keys == 0 && self.unmatched_collections.is_empty()
    }
}

/// Rows produced from one or more records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenOutput {
    /// Rows per destination table
    pub tables: TableBatches,
    /// Data-quality observations
    pub report: FlattenReport,
}

impl FlattenOutput {
    /// Append another output's rows after this one's
    pub fn merge(&mut self, other: FlattenOutput) {
        for (table, rows) in other.tables {
            self.tables.entry(table).or_default().extend(rows);
        }
        self.report.merge(other.report);
    }

    /// Total rows across all tables
    pub fn row_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Rows of one table (empty if none)
    pub fn rows(&self, table: &str) -> &[crate::types::FlatRow] {
        self.tables.get(table).map_or(&[], Vec::as_slice)
    }
}
