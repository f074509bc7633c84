//! Metadata types
//!
//! These mirror the class description JSON returned by the `Meta` endpoint.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// A declared field of a class
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FieldDefinition {
    /// Field name as it appears in data payloads
    pub field_name: String,
    /// Human readable description
    #[serde(default)]
    pub description: Option<String>,
}

/// One entry of a class's primary key
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrimaryKeyField {
    /// Name of the key field
    pub field_name: String,
}

/// A declared one-to-many child relationship
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChildDefinition {
    /// Field on the parent holding the child collection
    pub field_name: String,
    /// Class of the child records
    pub child_class_name: String,
}

/// Immutable description of one object class
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityMetadata {
    /// Class name (identity)
    pub class_name: String,
    /// Human readable caption, used as the table description
    #[serde(default)]
    pub caption: Option<String>,
    /// Declared fields
    #[serde(default, deserialize_with = "null_as_empty")]
    pub field_list: Vec<FieldDefinition>,
    /// Primary key fields in declaration order
    #[serde(default, deserialize_with = "null_as_empty")]
    pub primary_key_field_list: Vec<PrimaryKeyField>,
    /// Declared child relationships
    #[serde(default, deserialize_with = "null_as_empty")]
    pub child_list: Vec<ChildDefinition>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl EntityMetadata {
    /// Create metadata for a class with no fields
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Default::default()
        }
    }

    /// Set the primary key fields
    #[must_use]
    pub fn with_primary_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key_field_list = keys
            .into_iter()
            .map(|k| PrimaryKeyField {
                field_name: k.into(),
            })
            .collect();
        self
    }

    /// Add scalar fields
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_list.extend(fields.into_iter().map(|f| FieldDefinition {
            field_name: f.into(),
            description: None,
        }));
        self
    }

    /// Declare a child relationship
    #[must_use]
    pub fn with_child(mut self, field_name: impl Into<String>, child_class: impl Into<String>) -> Self {
        self.child_list.push(ChildDefinition {
            field_name: field_name.into(),
            child_class_name: child_class.into(),
        });
        self
    }

    /// Set the caption
    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Declared primary key names, in declaration order
    pub fn primary_key_names(&self) -> Vec<String> {
        self.primary_key_field_list
            .iter()
            .map(|pk| pk.field_name.clone())
            .collect()
    }

    /// Declared field names
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.field_list.iter().map(|f| f.field_name.as_str())
    }

    /// Class of the child declared under `field_name`, if any
    pub fn child_class_for(&self, field_name: &str) -> Option<&str> {
        self.child_list
            .iter()
            .find(|c| c.field_name == field_name)
            .map(|c| c.child_class_name.as_str())
    }

    /// Field descriptions keyed by field name, skipping undocumented fields
    pub fn column_descriptions(&self) -> BTreeMap<String, String> {
        self.field_list
            .iter()
            .filter_map(|f| {
                f.description
                    .as_ref()
                    .map(|d| (f.field_name.clone(), d.clone()))
            })
            .collect()
    }

    /// Guess an identifying field from field names.
    ///
    /// Prefers `Id`, then the first field containing `id` (any case), then
    /// the first declared field. This is a heuristic: a class whose real
    /// key does not contain `id` gets a wrong answer.
    pub fn identifier_field(&self) -> Option<String> {
        let names: Vec<&str> = self
            .field_names()
            .chain(self.primary_key_field_list.iter().map(|pk| pk.field_name.as_str()))
            .collect();

        if names.contains(&"Id") {
            return Some("Id".to_string());
        }
        names
            .iter()
            .find(|n| n.to_lowercase().contains("id"))
            .or_else(|| names.first())
            .map(|n| (*n).to_string())
    }
}

/// A child relation resolved for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildRelation {
    /// Class that declares the child field
    pub parent_class_name: String,
    /// Class of the child records
    pub child_class_name: String,
    /// Field on the parent holding the collection
    pub field_name: String,
    /// Parent primary keys, copied at resolution time
    pub parent_primary_keys: Vec<String>,
    /// Primary keys of the child class itself
    pub child_primary_keys: Vec<String>,
    /// Dotted path from the root class that reached this relation
    pub path: String,
}

impl ChildRelation {
    /// Destination table for rows of this relation.
    ///
    /// Named after the parent's class, not the path segment: `Items.Taxes`
    /// under `Order` lands in `OrderLine_Taxes`, never `Items_Taxes`.
    pub fn table_name(&self) -> String {
        format!("{}_{}", self.parent_class_name, self.field_name)
    }

    /// Synthesized foreign key column for one parent key
    pub fn foreign_key_column(&self, parent_key: &str) -> String {
        format!("{}_{}", self.parent_class_name, parent_key)
    }

    /// All foreign key columns, in parent key order
    pub fn foreign_key_columns(&self) -> Vec<String> {
        self.parent_primary_keys
            .iter()
            .map(|pk| self.foreign_key_column(pk))
            .collect()
    }

    /// Primary keys of the child table: its own keys followed by the foreign keys
    pub fn table_primary_keys(&self) -> Vec<String> {
        let mut keys = self.child_primary_keys.clone();
        for fk in self.foreign_key_columns() {
            if !keys.contains(&fk) {
                keys.push(fk);
            }
        }
        keys
    }
}

/// How primary keys are chosen for a class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryKeyPolicy {
    /// Explicit keys per class, taking precedence over metadata
    pub overrides: HashMap<String, Vec<String>>,
    /// Fall back to `EntityMetadata::identifier_field` when nothing is declared
    pub infer_from_names: bool,
}

impl PrimaryKeyPolicy {
    /// Use declared keys only
    pub fn declared() -> Self {
        Self::default()
    }

    /// Override the keys of one class
    #[must_use]
    pub fn with_override(mut self, class_name: impl Into<String>, keys: Vec<String>) -> Self {
        self.overrides.insert(class_name.into(), keys);
        self
    }

    /// Enable or disable the name heuristic fallback
    #[must_use]
    pub fn with_name_heuristic(mut self, enabled: bool) -> Self {
        self.infer_from_names = enabled;
        self
    }

    /// Primary keys for a class under this policy
    pub fn keys_for(&self, metadata: &EntityMetadata) -> Vec<String> {
        if let Some(keys) = self.overrides.get(&metadata.class_name) {
            return keys.clone();
        }

        let declared = metadata.primary_key_names();
        if !declared.is_empty() || !self.infer_from_names {
            return declared;
        }

        match metadata.identifier_field() {
            Some(guess) => {
                warn!(
                    class = %metadata.class_name,
                    key = %guess,
                    "No primary key declared, guessed one from field names"
                );
                vec![guess]
            }
            None => Vec::new(),
        }
    }
}
