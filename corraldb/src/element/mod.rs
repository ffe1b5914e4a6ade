use crate::error::{ErrorKind, Result, StoreError};
use crate::value::Value;
use std::collections::BTreeMap;

/// Columnar table of equal-length value columns, keyed by column name.
/// One row per cross-section; inserted row-wise into a time-series companion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    columns: BTreeMap<String, Vec<Value>>,
}

impl TimeSeries {
    pub fn new() -> Self {
        TimeSeries::default()
    }

    pub fn add_int_column(mut self, name: &str, values: Vec<i64>) -> Self {
        self.columns
            .insert(name.to_string(), values.into_iter().map(Value::Int).collect());
        self
    }

    pub fn add_real_column(mut self, name: &str, values: Vec<f64>) -> Self {
        self.columns
            .insert(name.to_string(), values.into_iter().map(Value::Real).collect());
        self
    }

    pub fn add_text_column(mut self, name: &str, values: Vec<String>) -> Self {
        self.columns
            .insert(name.to_string(), values.into_iter().map(Value::Text).collect());
        self
    }

    pub fn add_column(mut self, name: &str, values: Vec<Value>) -> Self {
        self.columns.insert(name.to_string(), values);
        self
    }

    pub fn columns(&self) -> &BTreeMap<String, Vec<Value>> {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Number of rows, checking that every column has the same length.
    pub fn row_count(&self) -> Result<usize> {
        let mut len = None;
        for (name, values) in &self.columns {
            match len {
                None => len = Some(values.len()),
                Some(expected) if expected != values.len() => {
                    return Err(StoreError::new(
                        ErrorKind::InvalidValue,
                        format!(
                            "time series columns have unequal lengths: '{name}' has {} rows, expected {expected}",
                            values.len()
                        ),
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(len.unwrap_or(0))
    }
}

/// Builder for a logical element: a scalar map, a vector map, and named
/// time-series tables. Hand it to [`Store::create_element`] to persist.
///
/// Scalars hold single values; an array-valued scalar entry is routed to the
/// matching vector or set companion by the store. The mandatory `label`
/// scalar identifies the element within its collection.
///
/// [`Store::create_element`]: crate::store::Store::create_element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    scalars: BTreeMap<String, Value>,
    vectors: BTreeMap<String, Vec<Value>>,
    time_series: BTreeMap<String, TimeSeries>,
}

impl Element {
    pub fn new() -> Self {
        Element::default()
    }

    /// Set a scalar attribute. Accepts anything convertible to [`Value`].
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.scalars.insert(name.to_string(), value.into());
        self
    }

    pub fn set_null(mut self, name: &str) -> Self {
        self.scalars.insert(name.to_string(), Value::Null);
        self
    }

    pub fn set_blob(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.scalars.insert(name.to_string(), Value::Blob(bytes));
        self
    }

    pub fn set_int_vector(mut self, name: &str, values: Vec<i64>) -> Self {
        self.vectors
            .insert(name.to_string(), values.into_iter().map(Value::Int).collect());
        self
    }

    pub fn set_real_vector(mut self, name: &str, values: Vec<f64>) -> Self {
        self.vectors
            .insert(name.to_string(), values.into_iter().map(Value::Real).collect());
        self
    }

    pub fn set_text_vector(mut self, name: &str, values: Vec<String>) -> Self {
        self.vectors
            .insert(name.to_string(), values.into_iter().map(Value::Text).collect());
        self
    }

    pub fn set_vector(mut self, name: &str, values: Vec<Value>) -> Self {
        self.vectors.insert(name.to_string(), values);
        self
    }

    pub fn add_time_series(mut self, group: &str, table: TimeSeries) -> Self {
        self.time_series.insert(group.to_string(), table);
        self
    }

    /// Reset all three sub-containers.
    pub fn clear(&mut self) {
        self.scalars.clear();
        self.vectors.clear();
        self.time_series.clear();
    }

    pub fn scalars(&self) -> &BTreeMap<String, Value> {
        &self.scalars
    }

    pub fn vectors(&self) -> &BTreeMap<String, Vec<Value>> {
        &self.vectors
    }

    pub fn time_series(&self) -> &BTreeMap<String, TimeSeries> {
        &self.time_series
    }

    pub fn has_scalars(&self) -> bool {
        !self.scalars.is_empty()
    }

    pub fn has_vectors(&self) -> bool {
        !self.vectors.is_empty()
    }

    pub fn has_time_series(&self) -> bool {
        !self.time_series.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.vectors.is_empty() && self.time_series.is_empty()
    }

    /// The element's label scalar, if set to a text value.
    pub fn label(&self) -> Option<&str> {
        self.scalars.get("label").and_then(Value::as_text)
    }
}
