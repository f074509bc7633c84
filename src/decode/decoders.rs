//! Decoder implementations
//!
//! Converts wire JSON into `DataObject` trees and `Page`s.

use super::types::{
    DataObject, FieldNode, FieldValue, Page, CHILD_COLLECTION_TYPE, NESTED_OBJECT_TYPE,
};
use crate::error::{Error, Result};
use serde_json::Value;

const TYPE_KEY: &str = "__type";
const CLASS_NAME_KEY: &str = "DOClassName";
const FIELD_VALUES_KEY: &str = "FieldValues";
const FIELD_NAME_KEY: &str = "Name";
const FIELD_VALUE_KEY: &str = "Value";
const COLLECTION_ITEMS_KEY: &str = "Items";

/// Trait for decoding a response body into a page of records
pub trait PageDecoder: Send + Sync {
    /// Decode the response body into a page
    fn decode(&self, body: &str) -> Result<Page>;
}

// ============================================================================
// K2 JSON Decoder
// ============================================================================

/// Decoder for the K2 REST data endpoint
///
/// Accepts either an envelope `{"Items": [...], "NextPageUrl": ...}` or a
/// bare array of records (single page).
#[derive(Debug, Clone)]
pub struct K2JsonDecoder {
    items_key: String,
    next_key: String,
}

impl Default for K2JsonDecoder {
    fn default() -> Self {
        Self {
            items_key: COLLECTION_ITEMS_KEY.to_string(),
            next_key: "NextPageUrl".to_string(),
        }
    }
}

impl K2JsonDecoder {
    /// Create a decoder with the default envelope keys
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the envelope keys
    #[must_use]
    pub fn with_keys(mut self, items_key: impl Into<String>, next_key: impl Into<String>) -> Self {
        self.items_key = items_key.into();
        self.next_key = next_key.into();
        self
    }

    /// Decode an already parsed response
    pub fn decode_value(&self, value: &Value) -> Result<Page> {
        match value {
            Value::Array(items) => Ok(Page::last(decode_items(items)?)),
            Value::Object(obj) => {
                let items = match obj.get(&self.items_key) {
                    Some(Value::Array(items)) => decode_items(items)?,
                    Some(Value::Null) | None => Vec::new(),
                    Some(other) => {
                        return Err(Error::decode(format!(
                            "'{}' must be an array, got {}",
                            self.items_key,
                            kind(other)
                        )))
                    }
                };
                let next_token = obj
                    .get(&self.next_key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(String::from);
                Ok(Page::new(items, next_token))
            }
            other => Err(Error::decode(format!(
                "Expected a page object or array, got {}",
                kind(other)
            ))),
        }
    }
}

impl PageDecoder for K2JsonDecoder {
    fn decode(&self, body: &str) -> Result<Page> {
        let value: Value = serde_json::from_str(body).map_err(|e| Error::Decode {
            message: format!("Failed to parse JSON: {e}"),
        })?;
        self.decode_value(&value)
    }
}

fn decode_items(items: &[Value]) -> Result<Vec<DataObject>> {
    items.iter().map(decode_data_object).collect()
}

/// Decode one record (`{"DOClassName": ..., "FieldValues": [...]}`)
pub fn decode_data_object(value: &Value) -> Result<DataObject> {
    let Value::Object(obj) = value else {
        return Err(Error::decode(format!(
            "Expected a data object, got {}",
            kind(value)
        )));
    };

    let class_name = obj
        .get(CLASS_NAME_KEY)
        .and_then(Value::as_str)
        .map(String::from);

    let fields = match obj.get(FIELD_VALUES_KEY) {
        Some(Value::Array(values)) => values
            .iter()
            .map(decode_field)
            .collect::<Result<Vec<_>>>()?,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            return Err(Error::decode(format!(
                "'{FIELD_VALUES_KEY}' must be an array, got {}",
                kind(other)
            )))
        }
    };

    Ok(DataObject { class_name, fields })
}

fn decode_field(value: &Value) -> Result<FieldNode> {
    let name = value
        .get(FIELD_NAME_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::decode("Field value without a 'Name'"))?
        .to_string();

    let raw = value.get(FIELD_VALUE_KEY).unwrap_or(&Value::Null);
    let value = classify(raw).map_err(|e| Error::decode(format!("Field '{name}': {e}")))?;

    Ok(FieldNode { name, value })
}

/// Classify a raw value by its explicit type marker
fn classify(raw: &Value) -> Result<FieldValue> {
    let marker = raw.get(TYPE_KEY).and_then(Value::as_str);
    match marker {
        Some(NESTED_OBJECT_TYPE) => Ok(FieldValue::Object(decode_data_object(raw)?)),
        Some(CHILD_COLLECTION_TYPE) => {
            let items = match raw.get(COLLECTION_ITEMS_KEY) {
                Some(Value::Array(items)) => decode_items(items)?,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(Error::decode(format!(
                        "collection items must be an array, got {}",
                        kind(other)
                    )))
                }
            };
            Ok(FieldValue::Collection(items))
        }
        _ => Ok(FieldValue::Scalar(raw.clone())),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
