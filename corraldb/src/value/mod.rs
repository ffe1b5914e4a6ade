use crate::error::{ErrorKind, Result, StoreError};

/// A single cell value at the API boundary.
///
/// The array variants exist only transiently while writing or reading vector,
/// set and time-series attributes; on disk an array is many single-valued
/// rows in a companion table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    IntArray(Vec<i64>),
    RealArray(Vec<f64>),
    TextArray(Vec<String>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, for type inspection on query results.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::IntArray(_) => "integer[]",
            Value::RealArray(_) => "real[]",
            Value::TextArray(_) => "text[]",
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Value::IntArray(_) | Value::RealArray(_) | Value::TextArray(_)
        )
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Expand an array variant into its scalar elements. Scalar variants are
    /// a one-element expansion of themselves.
    pub fn into_elements(self) -> Vec<Value> {
        match self {
            Value::IntArray(vs) => vs.into_iter().map(Value::Int).collect(),
            Value::RealArray(vs) => vs.into_iter().map(Value::Real).collect(),
            Value::TextArray(vs) => vs.into_iter().map(Value::Text).collect(),
            other => vec![other],
        }
    }

    /// Convert to the engine's scalar value. Array variants cannot cross the
    /// engine boundary directly.
    pub(crate) fn to_engine(&self) -> Result<rusqlite::types::Value> {
        match self {
            Value::Null => Ok(rusqlite::types::Value::Null),
            Value::Int(v) => Ok(rusqlite::types::Value::Integer(*v)),
            Value::Real(v) => Ok(rusqlite::types::Value::Real(*v)),
            Value::Text(s) => Ok(rusqlite::types::Value::Text(s.clone())),
            Value::Blob(b) => Ok(rusqlite::types::Value::Blob(b.clone())),
            Value::IntArray(_) | Value::RealArray(_) | Value::TextArray(_) => Err(StoreError::new(
                ErrorKind::InvalidValue,
                "array values must be written through a vector or set attribute",
            )),
        }
    }
}

impl From<rusqlite::types::Value> for Value {
    fn from(v: rusqlite::types::Value) -> Self {
        match v {
            rusqlite::types::Value::Null => Value::Null,
            rusqlite::types::Value::Integer(i) => Value::Int(i),
            rusqlite::types::Value::Real(r) => Value::Real(r),
            rusqlite::types::Value::Text(s) => Value::Text(s),
            rusqlite::types::Value::Blob(b) => Value::Blob(b),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
            Value::IntArray(vs) => write_list(f, vs),
            Value::RealArray(vs) => write_list(f, vs),
            Value::TextArray(vs) => write_list(f, vs),
        }
    }
}

fn write_list<T: std::fmt::Display>(
    f: &mut std::fmt::Formatter<'_>,
    items: &[T],
) -> std::fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "]")
}

/// Declared type of a schema column, as the engine's affinity rules see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
}

impl ColumnType {
    /// Map a declared type token onto a column type using SQLite's affinity
    /// rules: INT → Integer, CHAR/CLOB/TEXT → Text, BLOB/none → Blob,
    /// REAL/FLOA/DOUB → Real, anything else numeric (treated as Real).
    pub fn from_declared(token: &str) -> ColumnType {
        let upper = token.to_ascii_uppercase();
        if upper.is_empty() {
            return ColumnType::Blob;
        }
        if upper.contains("INT") {
            ColumnType::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            ColumnType::Text
        } else if upper.contains("BLOB") {
            ColumnType::Blob
        } else {
            ColumnType::Real
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
        }
    }
}

/// Materialised result of a pass-through query: column names plus rows of
/// values. Owned by the caller once returned.
#[derive(Debug, Clone, Default)]
pub struct Rows {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Rows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Rows { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_name(&self, col: usize) -> Option<&str> {
        self.columns.get(col).map(String::as_str)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn is_null(&self, row: usize, col: usize) -> bool {
        matches!(self.get(row, col), Some(Value::Null) | None)
    }

    /// Variant name of a cell, `None` when out of range.
    pub fn value_type(&self, row: usize, col: usize) -> Option<&'static str> {
        self.get(row, col).map(Value::type_name)
    }

    pub fn get_int(&self, row: usize, col: usize) -> Option<i64> {
        self.get(row, col).and_then(Value::as_int)
    }

    pub fn get_real(&self, row: usize, col: usize) -> Option<f64> {
        self.get(row, col).and_then(Value::as_real)
    }

    pub fn get_text(&self, row: usize, col: usize) -> Option<&str> {
        self.get(row, col).and_then(Value::as_text)
    }

    pub fn get_blob(&self, row: usize, col: usize) -> Option<&[u8]> {
        self.get(row, col).and_then(Value::as_blob)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(Vec::as_slice)
    }
}
