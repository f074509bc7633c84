//! Arrow conversion of flattened rows
//!
//! Every column is a nullable UTF-8 column: type coercion belongs to the
//! source API, so values are carried as text.

use crate::error::{Error, Result};
use crate::table::project_row;
use crate::types::{FlatRow, JsonValue};
use arrow::array::{Array, ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use std::sync::Arc;

/// Arrow schema for a column list
pub fn table_schema(columns: &[String]) -> Schema {
    Schema::new(
        columns
            .iter()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    )
}

/// Text form of a scalar; `None` for JSON null
pub fn render_value(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Build a rectangular batch over `columns` from sparse rows
pub fn rows_to_batch(rows: &[FlatRow], columns: &[String]) -> Result<RecordBatch> {
    let projected: Vec<Vec<JsonValue>> = rows.iter().map(|row| project_row(row, columns)).collect();

    let arrays: Vec<ArrayRef> = (0..columns.len())
        .map(|col_idx| {
            let array: StringArray = projected
                .iter()
                .map(|values| render_value(&values[col_idx]))
                .collect();
            Arc::new(array) as ArrayRef
        })
        .collect();

    let options = RecordBatchOptions::new().with_row_count(Some(rows.len()));
    RecordBatch::try_new_with_options(Arc::new(table_schema(columns)), arrays, &options).map_err(
        |e| Error::Output {
            message: format!("Failed to create RecordBatch: {e}"),
        },
    )
}

/// Read a batch back into rows, skipping null cells
pub fn batch_to_rows(batch: &RecordBatch) -> Result<Vec<FlatRow>> {
    let schema = batch.schema();
    let mut rows = vec![FlatRow::new(); batch.num_rows()];

    for (col_idx, field) in schema.fields().iter().enumerate() {
        let column = batch
            .column(col_idx)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| Error::Output {
                message: format!("Column '{}' is not UTF-8", field.name()),
            })?;

        for (row_idx, row) in rows.iter_mut().enumerate() {
            if !column.is_null(row_idx) {
                row.insert(
                    field.name().clone(),
                    JsonValue::String(column.value(row_idx).to_string()),
                );
            }
        }
    }

    Ok(rows)
}
