//! Record flattener

use super::types::{FlattenOutput, RelationMap};
use crate::decode::{DataObject, FieldValue};
use crate::metadata::ChildRelation;
use crate::types::{FlatRow, JsonValue};
use tracing::debug;

/// Flattens records of one root class into per-table rows
#[derive(Debug, Clone)]
pub struct Flattener<'a> {
    relations: &'a RelationMap,
    root_table: String,
    root_class: String,
}

impl<'a> Flattener<'a> {
    /// Create a flattener whose root table is named after the root class
    pub fn new(relations: &'a RelationMap, root_class: impl Into<String>) -> Self {
        let root_class = root_class.into();
        Self {
            relations,
            root_table: root_class.clone(),
            root_class,
        }
    }

    /// Write root rows to a differently named table
    #[must_use]
    pub fn with_root_table(mut self, root_table: impl Into<String>) -> Self {
        self.root_table = root_table.into();
        self
    }

    /// Name of the root table
    pub fn root_table(&self) -> &str {
        &self.root_table
    }

    /// Flatten one top-level record
    pub fn flatten(&self, record: &DataObject) -> FlattenOutput {
        let mut out = FlattenOutput::default();
        out.tables.entry(self.root_table.clone()).or_default();

        let mut row = FlatRow::new();
        self.walk(record, Some(self.root_class.as_str()), "", &mut row, &mut out);

        if !row.is_empty() {
            out.tables
                .entry(self.root_table.clone())
                .or_default()
                .push(row);
        }
        out
    }

    /// Flatten all records of a page, concatenating rows in record order
    pub fn flatten_all<'r>(&self, records: impl IntoIterator<Item = &'r DataObject>) -> FlattenOutput {
        let mut out = FlattenOutput::default();
        out.tables.entry(self.root_table.clone()).or_default();
        for record in records {
            out.merge(self.flatten(record));
        }
        out
    }

    /// Depth-first walk over one object's fields, filling `row`
    fn walk(
        &self,
        object: &DataObject,
        class: Option<&str>,
        prefix: &str,
        row: &mut FlatRow,
        out: &mut FlattenOutput,
    ) {
        for field in &object.fields {
            match &field.value {
                FieldValue::Scalar(value) => {
                    row.insert(qualify(prefix, &field.name), value.clone());
                }
                FieldValue::Object(nested) => {
                    let nested_prefix = qualify(prefix, &field.name);
                    self.walk(nested, nested.class_name.as_deref(), &nested_prefix, row, out);
                }
                FieldValue::Collection(items) => {
                    match self.relations.lookup(&field.name, class) {
                        Some(relation) => self.flatten_children(object, relation, items, out),
                        None => {
                            debug!(field = %field.name, "Skipping child collection without relation");
                            out.report
                                .unmatched_collections
                                .insert(field.name.clone());
                        }
                    }
                }
            }
        }
    }

    /// Emit one row per child element, stamped with the parent's keys
    fn flatten_children(
        &self,
        parent: &DataObject,
        relation: &ChildRelation,
        items: &[DataObject],
        out: &mut FlattenOutput,
    ) {
        if items.is_empty() {
            return;
        }

        let foreign_keys: Vec<(String, JsonValue)> = relation
            .parent_primary_keys
            .iter()
            .map(|key| {
                let value = match parent.scalar_field(key) {
                    Some(value) => value.clone(),
                    None => {
                        debug!(
                            table = %relation.table_name(),
                            key = %key,
                            "Parent key missing, foreign key left empty"
                        );
                        out.report.missing_parent_keys += items.len();
                        JsonValue::Null
                    }
                };
                (relation.foreign_key_column(key), value)
            })
            .collect();

        let table = relation.table_name();
        out.tables.entry(table.clone()).or_default();

        for item in items {
            let mut child_row = FlatRow::new();
            self.walk(
                item,
                Some(relation.child_class_name.as_str()),
                "",
                &mut child_row,
                out,
            );
            for (column, value) in &foreign_keys {
                child_row.insert(column.clone(), value.clone());
            }
            out.tables.entry(table.clone()).or_default().push(child_row);
        }
    }
}

/// Column name for a field under an embedded-object prefix
fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}_{name}")
    }
}
