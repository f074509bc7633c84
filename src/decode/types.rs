//! Decoded payload types

use crate::types::JsonValue;

/// Type marker of an embedded single object
pub const NESTED_OBJECT_TYPE: &str = "DataObjectWrapper:K2.Data";

/// Type marker of a child record collection
pub const CHILD_COLLECTION_TYPE: &str = "ChildDataObjectWrapper:K2.Data";

/// One decoded record: a class marker and its ordered fields
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataObject {
    /// Class name carried by the payload (`DOClassName`), if any
    pub class_name: Option<String>,
    /// Fields in payload order
    pub fields: Vec<FieldNode>,
}

/// A named field of a data object
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    /// Field name
    pub name: String,
    /// Classified value
    pub value: FieldValue,
}

/// Value of a field, classified by the payload's type marker
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Leaf value
    Scalar(JsonValue),
    /// Embedded object whose fields merge into the enclosing row
    Object(DataObject),
    /// Repeated child records
    Collection(Vec<DataObject>),
}

impl DataObject {
    /// Create an empty object of a class
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            fields: Vec::new(),
        }
    }

    /// Append a scalar field
    #[must_use]
    pub fn scalar(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.fields.push(FieldNode {
            name: name.into(),
            value: FieldValue::Scalar(value.into()),
        });
        self
    }

    /// Append an embedded object field
    #[must_use]
    pub fn object(mut self, name: impl Into<String>, value: DataObject) -> Self {
        self.fields.push(FieldNode {
            name: name.into(),
            value: FieldValue::Object(value),
        });
        self
    }

    /// Append a child collection field
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>, items: Vec<DataObject>) -> Self {
        self.fields.push(FieldNode {
            name: name.into(),
            value: FieldValue::Collection(items),
        });
        self
    }

    /// Look up a scalar among this object's own fields (not recursive)
    pub fn scalar_field(&self, name: &str) -> Option<&JsonValue> {
        self.fields.iter().find_map(|f| match &f.value {
            FieldValue::Scalar(v) if f.name == name => Some(v),
            _ => None,
        })
    }
}

/// One page of records returned by the data provider
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    /// Root-level records
    pub items: Vec<DataObject>,
    /// Continuation token for the next page, `None` on the last page
    pub next_token: Option<String>,
}

impl Page {
    /// Create a page
    pub fn new(items: Vec<DataObject>, next_token: Option<String>) -> Self {
        Self { items, next_token }
    }

    /// Create a final page
    pub fn last(items: Vec<DataObject>) -> Self {
        Self::new(items, None)
    }

    /// Whether more pages follow
    pub fn has_next(&self) -> bool {
        self.next_token.is_some()
    }
}
