use crate::error::{ErrorKind, Result, StoreError};
use crate::value::ColumnType;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn companion_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(\w+?)_(vector|set|time_series)_(\w+)$").unwrap()
    })
}

fn files_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^(\w+?)_files$").unwrap())
}

/// Structural role of a table under the collection naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableKind {
    /// A main table holding one row per element.
    Collection,
    /// `<collection>_vector_<group>`: ordered multi-valued attributes.
    Vector { collection: String, group: String },
    /// `<collection>_set_<group>`: unordered multi-valued attributes.
    Set { collection: String, group: String },
    /// `<collection>_time_series_<group>`: dimensioned rows per element.
    TimeSeries { collection: String, group: String },
    /// `<collection>_files`: file paths for file-backed time series.
    Files { collection: String },
    /// The per-store `Configuration` table.
    Configuration,
}

impl TableKind {
    pub fn classify(table_name: &str) -> TableKind {
        if table_name.eq_ignore_ascii_case("configuration") {
            return TableKind::Configuration;
        }
        if let Some(caps) = companion_pattern().captures(table_name) {
            let collection = caps[1].to_string();
            let group = caps[3].to_string();
            return match caps[2].to_ascii_lowercase().as_str() {
                "vector" => TableKind::Vector { collection, group },
                "set" => TableKind::Set { collection, group },
                _ => TableKind::TimeSeries { collection, group },
            };
        }
        if let Some(caps) = files_pattern().captures(table_name) {
            return TableKind::Files {
                collection: caps[1].to_string(),
            };
        }
        TableKind::Collection
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, TableKind::Collection)
    }
}

/// One column of a table. Names are stored lower-cased; the declared type
/// token is kept verbatim alongside its resolved affinity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub declared_type: String,
    pub column_type: ColumnType,
}

/// A table-level foreign key: local column, referenced table and column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

/// One table of the schema model: declared columns in order, table-level
/// foreign keys, plus its structural classification.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<ColumnDef>,
    pub foreign_keys: Vec<ForeignKeyDef>,
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        let lower = name.to_ascii_lowercase();
        self.columns.iter().find(|c| c.name == lower)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Columns carrying attribute values: everything except the structural
    /// `id`, `vector_index` and `label` columns.
    pub fn value_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns
            .iter()
            .filter(|c| c.name != "id" && c.name != "vector_index" && c.name != "label")
    }

    /// The foreign key declared on `column`, if any.
    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKeyDef> {
        let lower = column.to_ascii_lowercase();
        self.foreign_keys.iter().find(|fk| fk.column == lower)
    }

    /// Whether `column` is a relation (a foreign-key-typed value column).
    pub fn is_relation_column(&self, column: &str) -> bool {
        self.foreign_key(column).is_some()
    }
}

/// In-memory description of a store's tables under the collection
/// convention. Built by the DDL shape validator or from `sqlite_master`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    tables: BTreeMap<String, TableDef>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    pub(crate) fn insert_table(&mut self, table: TableDef) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.values()
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    pub fn require_table(&self, name: &str) -> Result<&TableDef> {
        self.table(name).ok_or_else(|| {
            StoreError::new(
                ErrorKind::AttributeNotFound,
                format!("table '{name}' does not exist"),
            )
            .with_context(format!("table '{name}'"))
        })
    }

    /// Main table for a collection, or `CollectionNotFound`.
    pub fn collection(&self, name: &str) -> Result<&TableDef> {
        match self.table(name) {
            Some(t) if t.kind.is_collection() => Ok(t),
            _ => Err(StoreError::collection_not_found(name)),
        }
    }

    /// Names of all main tables, in name order.
    pub fn collections(&self) -> Vec<String> {
        self.tables
            .values()
            .filter(|t| t.kind.is_collection())
            .map(|t| t.name.clone())
            .collect()
    }

    // ── Companion naming convention ──────────────────────────────────

    pub fn vector_table_name(collection: &str, group: &str) -> String {
        format!("{collection}_vector_{group}")
    }

    pub fn set_table_name(collection: &str, group: &str) -> String {
        format!("{collection}_set_{group}")
    }

    pub fn time_series_table_name(collection: &str, group: &str) -> String {
        format!("{collection}_time_series_{group}")
    }

    pub fn files_table_name(collection: &str) -> String {
        format!("{collection}_files")
    }

    pub fn vector_groups(&self, collection: &str) -> Vec<String> {
        self.vector_tables(collection)
            .into_iter()
            .filter_map(|t| match &t.kind {
                TableKind::Vector { group, .. } => Some(group.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn set_groups(&self, collection: &str) -> Vec<String> {
        self.set_tables(collection)
            .into_iter()
            .filter_map(|t| match &t.kind {
                TableKind::Set { group, .. } => Some(group.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn time_series_groups(&self, collection: &str) -> Vec<String> {
        self.time_series_tables(collection)
            .into_iter()
            .filter_map(|t| match &t.kind {
                TableKind::TimeSeries { group, .. } => Some(group.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn vector_tables(&self, collection: &str) -> Vec<&TableDef> {
        self.tables
            .values()
            .filter(|t| matches!(&t.kind, TableKind::Vector { collection: c, .. } if c == collection))
            .collect()
    }

    pub fn set_tables(&self, collection: &str) -> Vec<&TableDef> {
        self.tables
            .values()
            .filter(|t| matches!(&t.kind, TableKind::Set { collection: c, .. } if c == collection))
            .collect()
    }

    pub fn time_series_tables(&self, collection: &str) -> Vec<&TableDef> {
        self.tables
            .values()
            .filter(|t| matches!(&t.kind, TableKind::TimeSeries { collection: c, .. } if c == collection))
            .collect()
    }

    pub fn files_table(&self, collection: &str) -> Option<&TableDef> {
        self.table(&Self::files_table_name(collection))
    }

    // ── Attribute resolution ─────────────────────────────────────────

    /// The vector companion of `collection` holding a value column named
    /// `column`, if any.
    pub fn vector_table_for_column(&self, collection: &str, column: &str) -> Option<&TableDef> {
        let lower = column.to_ascii_lowercase();
        self.vector_tables(collection)
            .into_iter()
            .find(|t| t.value_columns().any(|c| c.name == lower))
    }

    pub fn set_table_for_column(&self, collection: &str, column: &str) -> Option<&TableDef> {
        let lower = column.to_ascii_lowercase();
        self.set_tables(collection)
            .into_iter()
            .find(|t| t.value_columns().any(|c| c.name == lower))
    }

    pub fn time_series_table_for_column(
        &self,
        collection: &str,
        column: &str,
    ) -> Option<&TableDef> {
        let lower = column.to_ascii_lowercase();
        self.time_series_tables(collection)
            .into_iter()
            .find(|t| t.value_columns().any(|c| c.name == lower))
    }

    pub fn is_scalar_column(&self, collection: &str, column: &str) -> bool {
        self.table(collection)
            .map(|t| t.has_column(column))
            .unwrap_or(false)
    }

    pub fn is_vector_column(&self, collection: &str, column: &str) -> bool {
        self.vector_table_for_column(collection, column).is_some()
    }

    pub fn is_set_column(&self, collection: &str, column: &str) -> bool {
        self.set_table_for_column(collection, column).is_some()
    }

    /// Relation value columns of a collection's main table, as
    /// `(column, target collection)` pairs.
    pub fn scalar_relations(&self, collection: &str) -> Vec<(String, String)> {
        let Some(table) = self.table(collection) else {
            return Vec::new();
        };
        table
            .value_columns()
            .filter_map(|c| {
                table
                    .foreign_key(&c.name)
                    .map(|fk| (c.name.clone(), fk.references_table.clone()))
            })
            .collect()
    }

    fn companion_relations(tables: Vec<&TableDef>) -> Vec<(String, String, String)> {
        let mut relations = Vec::new();
        for table in tables {
            for column in table.value_columns() {
                if let Some(fk) = table.foreign_key(&column.name) {
                    relations.push((
                        table.name.clone(),
                        column.name.clone(),
                        fk.references_table.clone(),
                    ));
                }
            }
        }
        relations
    }

    /// Relation columns in vector companions, as
    /// `(table, value column, target collection)` triples.
    pub fn vector_relations(&self, collection: &str) -> Vec<(String, String, String)> {
        Self::companion_relations(self.vector_tables(collection))
    }

    /// Relation columns in set companions.
    pub fn set_relations(&self, collection: &str) -> Vec<(String, String, String)> {
        Self::companion_relations(self.set_tables(collection))
    }

    /// Declared type of `table.column`, or `AttributeNotFound`.
    pub fn column_type(&self, table: &str, column: &str) -> Result<ColumnType> {
        let table_def = self.require_table(table)?;
        table_def
            .column(column)
            .map(|c| c.column_type)
            .ok_or_else(|| {
                StoreError::new(
                    ErrorKind::AttributeNotFound,
                    format!("column '{column}' does not exist in table '{table}'"),
                )
                .with_context(format!("column '{column}'"))
            })
    }
}
