//! Value-against-column type checking.
//!
//! Null and Blob are accepted for any declared type. Real widens into
//! Integer columns (the engine narrows at its discretion); Integer into Real
//! is rejected, as is any cross of Text with a numeric column.

use crate::error::{ErrorKind, Result, StoreError};
use crate::schema::Schema;
use crate::value::{ColumnType, Value};

/// Validate a scalar value against `table.column`'s declared type.
pub fn validate_scalar(schema: &Schema, table: &str, column: &str, value: &Value) -> Result<()> {
    let expected = schema.column_type(table, column)?;
    validate_value(&format!("column '{column}'"), expected, value)
}

/// Validate a vector/set value against the element type of the companion
/// table holding `attribute`.
pub fn validate_vector(
    schema: &Schema,
    collection: &str,
    attribute: &str,
    value: &Value,
) -> Result<()> {
    let expected = vector_element_type(schema, collection, attribute)?;
    validate_value(&format!("vector '{attribute}'"), expected, value)
}

/// Element type of a vector or set attribute, resolved through its
/// companion table.
pub fn vector_element_type(schema: &Schema, collection: &str, attribute: &str) -> Result<ColumnType> {
    let table = schema
        .vector_table_for_column(collection, attribute)
        .or_else(|| schema.set_table_for_column(collection, attribute))
        .ok_or_else(|| StoreError::attribute_not_found(collection, attribute))?;
    let column = table
        .column(attribute)
        .ok_or_else(|| StoreError::attribute_not_found(collection, attribute))?;
    Ok(column.column_type)
}

/// Validate a value against an explicit column type. `context` names the
/// attribute for the error message, e.g. `"column 'cost'"`.
pub fn validate_value(context: &str, expected: ColumnType, value: &Value) -> Result<()> {
    let actual = match value {
        // Null and Blob are valid for any column.
        Value::Null | Value::Blob(_) => return Ok(()),
        Value::Int(_) => {
            if expected == ColumnType::Integer || expected == ColumnType::Blob {
                return Ok(());
            }
            "INTEGER"
        }
        Value::Real(_) => {
            // REAL can be stored in INTEGER or REAL columns.
            if matches!(expected, ColumnType::Real | ColumnType::Integer | ColumnType::Blob) {
                return Ok(());
            }
            "REAL"
        }
        Value::Text(_) => {
            if expected == ColumnType::Text || expected == ColumnType::Blob {
                return Ok(());
            }
            "TEXT"
        }
        Value::IntArray(_) => {
            if expected == ColumnType::Integer || expected == ColumnType::Blob {
                return Ok(());
            }
            "INTEGER[]"
        }
        Value::RealArray(_) => {
            if matches!(expected, ColumnType::Real | ColumnType::Integer | ColumnType::Blob) {
                return Ok(());
            }
            "REAL[]"
        }
        Value::TextArray(_) => {
            if expected == ColumnType::Text || expected == ColumnType::Blob {
                return Ok(());
            }
            "TEXT[]"
        }
    };

    Err(StoreError::new(
        ErrorKind::TypeMismatch,
        format!(
            "type mismatch for {context}: expected {}, got {actual}",
            expected.as_str()
        ),
    )
    .with_context(context.to_string()))
}
