use crate::element::Element;
use crate::engine::Engine;
use crate::error::{ErrorKind, Result, StoreError};
use crate::migration;
use crate::schema::{parse_schema, parser, Schema};
use crate::typecheck;
use crate::validation;
use crate::value::{Rows, Value};
use crate::diff;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Console log threshold carried by a store handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Options for opening a store.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    pub read_only: bool,
    pub console_level: LogLevel,
}

impl StoreOptions {
    pub fn read_only() -> Self {
        StoreOptions {
            read_only: true,
            ..StoreOptions::default()
        }
    }
}

/// A store handle: one SQLite image plus the schema model describing its
/// collections and companions.
///
/// Handles are single-threaded; multiple handles against the same file rely
/// on the engine's own locking. Every mutation either joins the caller's
/// open transaction or wraps itself in an implicit one.
#[derive(Debug)]
pub struct Store {
    engine: Engine,
    schema: RefCell<Schema>,
    options: StoreOptions,
}

impl Store {
    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open a store at `path` (`":memory:"` for an ephemeral store). An
    /// existing image has its schema model rebuilt from the engine catalog
    /// and shape-validated.
    pub fn open(path: &str, options: StoreOptions) -> Result<Self> {
        let engine = Engine::open(path, options.read_only)?;
        let store = Store {
            engine,
            schema: RefCell::new(Schema::new()),
            options,
        };
        store.rebuild_schema()?;
        log::debug!("opened store at {path}");
        Ok(store)
    }

    /// Open a store and apply a DDL schema file. The file is shape-validated
    /// before any statement reaches the engine.
    pub fn from_schema(db_path: &str, schema_path: &Path, options: StoreOptions) -> Result<Self> {
        let sql = std::fs::read_to_string(schema_path).map_err(|e| {
            StoreError::from(e).with_context(format!("schema file '{}'", schema_path.display()))
        })?;
        parse_schema(&sql)?;

        let store = Store::open(db_path, options)?;
        store.apply_schema_text(&sql)?;
        Ok(store)
    }

    /// Open a store and bring it up to date from a migration directory.
    pub fn from_migrations(db_path: &str, migrations_path: &Path, options: StoreOptions) -> Result<Self> {
        let store = Store::open(db_path, options)?;
        store.migrate_up(migrations_path)?;
        Ok(store)
    }

    /// Validate and apply DDL text, then refresh the schema model from the
    /// engine catalog. All statements run in one transaction.
    pub fn apply_schema_text(&self, sql: &str) -> Result<()> {
        self.require_writable()?;
        parse_schema(sql)?;
        self.with_transaction(|| {
            for stmt in parser::split_statements(sql) {
                self.engine.execute(&stmt, &[])?;
            }
            Ok(())
        })?;
        self.rebuild_schema()
    }

    /// Read a DDL file and apply it. See [`apply_schema_text`].
    ///
    /// [`apply_schema_text`]: Store::apply_schema_text
    pub fn apply_schema(&self, schema_path: &Path) -> Result<()> {
        let sql = std::fs::read_to_string(schema_path).map_err(|e| {
            StoreError::from(e).with_context(format!("schema file '{}'", schema_path.display()))
        })?;
        self.apply_schema_text(&sql)
    }

    /// Apply every pending migration under `migrations_path`.
    ///
    /// Each version runs in its own transaction: its SQL files execute in
    /// file-name order, the schema model is rebuilt and re-validated, and
    /// the persisted version advances. A failure rolls the version back and
    /// halts the runner; lower versions stay applied.
    pub fn migrate_up(&self, migrations_path: &Path) -> Result<()> {
        self.require_writable()?;
        let discovered = migration::discover(migrations_path)?;
        let current = self.engine.version()?;
        let pending = migration::pending(discovered, current);

        for m in pending {
            self.engine.begin()?;
            let applied = (|| {
                let sql = m.load_sql()?;
                for stmt in parser::split_statements(&sql) {
                    self.engine.execute(&stmt, &[])?;
                }
                self.rebuild_schema()?;
                self.engine.set_version(m.version)
            })();

            match applied {
                Ok(()) => {
                    self.engine.commit()?;
                    log::info!("applied migration version {}", m.version);
                }
                Err(e) => {
                    let _ = self.engine.rollback();
                    // The model still describes the rolled-back state.
                    let _ = self.rebuild_schema();
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Release the handle.
    pub fn close(self) {}

    pub fn path(&self) -> &str {
        self.engine.path()
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    pub fn is_open(&self) -> bool {
        self.is_healthy()
    }

    pub fn is_healthy(&self) -> bool {
        self.engine.execute("SELECT 1", &[]).is_ok()
    }

    // ── Pass-through execution ───────────────────────────────────────

    /// Execute one SQL statement with positional parameters, returning any
    /// result rows. The escape hatch around the typed attribute API; the
    /// schema model is not refreshed for DDL issued this way.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<Rows> {
        self.engine.execute(sql, params)
    }

    // ── Transactions ─────────────────────────────────────────────────

    pub fn begin_transaction(&self) -> Result<()> {
        self.require_writable()?;
        self.engine.begin()
    }

    pub fn commit(&self) -> Result<()> {
        self.engine.commit()
    }

    pub fn rollback(&self) -> Result<()> {
        self.engine.rollback()
    }

    pub fn in_transaction(&self) -> bool {
        self.engine.in_transaction()
    }

    // ── Version ──────────────────────────────────────────────────────

    pub fn current_version(&self) -> Result<i64> {
        self.engine.version()
    }

    pub fn set_version(&self, version: i64) -> Result<()> {
        self.require_writable()?;
        self.engine.set_version(version)
    }

    // ── Element writes ───────────────────────────────────────────────

    /// Create an element in `collection`, returning its engine-assigned id.
    ///
    /// Scalars go to the main row; vector and set entries go to their
    /// companions (`vector_index` counting from zero, sets deduplicated);
    /// time-series tables insert one row per cross-section. The whole write
    /// is one transaction.
    pub fn create_element(&self, collection: &str, element: &Element) -> Result<i64> {
        self.require_writable()?;
        validation::validate_identifier(collection, "collection name")?;
        let schema = self.schema_model();
        schema.collection(collection).map_err(|e| self.refine_no_schema(e))?;

        if element.is_empty() {
            return Err(StoreError::new(
                ErrorKind::EmptyElement,
                "element has no attributes",
            )
            .with_context(format!("collection '{collection}'")));
        }

        let label = match element.label() {
            Some(l) if !l.is_empty() => l.to_string(),
            Some(_) => {
                return Err(StoreError::new(
                    ErrorKind::InvalidValue,
                    "element label must be a non-empty string",
                )
                .with_context(format!("collection '{collection}'")));
            }
            None => {
                return Err(StoreError::new(
                    ErrorKind::InvalidValue,
                    "element requires a 'label' scalar",
                )
                .with_context(format!("collection '{collection}'")));
            }
        };

        if self.find_element_id(collection, &label)?.is_some() {
            return Err(StoreError::new(
                ErrorKind::DuplicateElement,
                format!("an element labelled '{label}' already exists"),
            )
            .with_context(format!("collection '{collection}'")));
        }

        // Partition the element into main-row scalars and companion writes.
        let mut main_columns: Vec<(String, Value)> = Vec::new();
        let mut vector_writes: Vec<(String, String, Vec<Value>)> = Vec::new();
        let mut set_writes: Vec<(String, String, Vec<Value>)> = Vec::new();

        for (name, value) in element.scalars() {
            validation::validate_identifier(name, "attribute name")?;
            if value.is_array() {
                self.route_multi_value(&schema, collection, name, value.clone().into_elements(),
                    &mut vector_writes, &mut set_writes)?;
            } else {
                typecheck::validate_scalar(&schema, collection, name, value)?;
                main_columns.push((name.clone(), value.clone()));
            }
        }

        for (name, values) in element.vectors() {
            validation::validate_identifier(name, "attribute name")?;
            self.route_multi_value(&schema, collection, name, values.clone(),
                &mut vector_writes, &mut set_writes)?;
        }

        for (group, table) in element.time_series() {
            validation::validate_identifier(group, "time series group")?;
            let ts_table = Schema::time_series_table_name(collection, group);
            if schema.table(&ts_table).is_none() {
                return Err(StoreError::attribute_not_found(collection, group));
            }
            // Column existence and equal lengths are checked before any row
            // is written.
            table.row_count()?;
            for column in table.columns().keys() {
                validation::validate_identifier(column, "time series column")?;
                schema.column_type(&ts_table, column)?;
            }
        }

        self.with_transaction(|| {
            let column_names: Vec<String> = main_columns.iter().map(|(n, _)| n.clone()).collect();
            let placeholders: Vec<String> =
                (1..=main_columns.len()).map(|i| format!("?{i}")).collect();
            let params: Vec<Value> = main_columns.iter().map(|(_, v)| v.clone()).collect();
            self.engine.execute(
                &format!(
                    "INSERT INTO {collection} ({}) VALUES ({})",
                    column_names.join(", "),
                    placeholders.join(", ")
                ),
                &params,
            )?;
            let id = self.engine.last_insert_rowid();

            for (table, column, values) in &vector_writes {
                for (i, value) in values.iter().enumerate() {
                    self.engine.execute(
                        &format!(
                            "INSERT INTO {table} (id, vector_index, {column}) VALUES (?1, ?2, ?3)"
                        ),
                        &[Value::Int(id), Value::Int(i as i64), value.clone()],
                    )?;
                }
            }

            for (table, column, values) in &set_writes {
                for value in dedup_values(values.clone()) {
                    self.engine.execute(
                        &format!("INSERT INTO {table} (id, {column}) VALUES (?1, ?2)"),
                        &[Value::Int(id), value],
                    )?;
                }
            }

            for (group, table) in element.time_series() {
                let ts_table = Schema::time_series_table_name(collection, group);
                let rows = table.row_count()?;
                let columns: Vec<&String> = table.columns().keys().collect();
                let column_list = columns
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                let placeholders: Vec<String> =
                    (2..=columns.len() + 1).map(|i| format!("?{i}")).collect();
                let sql = format!(
                    "INSERT INTO {ts_table} (id, {column_list}) VALUES (?1, {})",
                    placeholders.join(", ")
                );
                for r in 0..rows {
                    let mut params = vec![Value::Int(id)];
                    for column in &columns {
                        params.push(table.columns()[*column][r].clone());
                    }
                    self.engine.execute(&sql, &params)?;
                }
            }

            log::debug!("created element '{label}' (id {id}) in {collection}");
            Ok(id)
        })
    }

    /// Delete an element by label. Companion rows follow through the
    /// foreign-key cascade.
    pub fn delete_element(&self, collection: &str, label: &str) -> Result<()> {
        self.require_writable()?;
        self.schema_model().collection(collection).map_err(|e| self.refine_no_schema(e))?;
        self.with_transaction(|| {
            self.engine.execute(
                &format!("DELETE FROM {collection} WHERE label = ?1"),
                &[Value::Text(label.to_string())],
            )?;
            if self.engine.changes() == 0 {
                return Err(StoreError::element_not_found(collection, label));
            }
            log::debug!("deleted element '{label}' from {collection}");
            Ok(())
        })
    }

    /// Delete an element by id.
    pub fn delete_element_by_id(&self, collection: &str, id: i64) -> Result<()> {
        self.require_writable()?;
        validation::validate_id(id, &format!("collection '{collection}'"))?;
        self.schema_model().collection(collection).map_err(|e| self.refine_no_schema(e))?;
        self.with_transaction(|| {
            self.engine.execute(
                &format!("DELETE FROM {collection} WHERE id = ?1"),
                &[Value::Int(id)],
            )?;
            if self.engine.changes() == 0 {
                return Err(StoreError::new(
                    ErrorKind::ElementNotFound,
                    format!("no element with id {id} in collection '{collection}'"),
                )
                .with_context(format!("collection '{collection}'")));
            }
            Ok(())
        })
    }

    // ── Scalar updates ───────────────────────────────────────────────

    /// Update one scalar attribute of the element labelled `label`. Accepts
    /// anything convertible to [`Value`].
    pub fn update_scalar_parameter(
        &self,
        collection: &str,
        column: &str,
        label: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        self.require_writable()?;
        validation::validate_identifier(column, "attribute name")?;
        let value = value.into();
        let schema = self.schema_model();
        schema.collection(collection).map_err(|e| self.refine_no_schema(e))?;
        typecheck::validate_scalar(&schema, collection, column, &value)?;

        self.with_transaction(|| {
            self.engine.execute(
                &format!("UPDATE {collection} SET {column} = ?1 WHERE label = ?2"),
                &[value.clone(), Value::Text(label.to_string())],
            )?;
            if self.engine.changes() == 0 {
                return Err(StoreError::element_not_found(collection, label));
            }
            Ok(())
        })
    }

    /// Replace the whole vector stored for `column` on the element labelled
    /// `label`.
    pub fn update_vector_parameters(
        &self,
        collection: &str,
        column: &str,
        label: &str,
        values: &[Value],
    ) -> Result<()> {
        self.require_writable()?;
        validation::validate_identifier(column, "attribute name")?;
        let schema = self.schema_model();
        let (table, value_column) = self.resolve_vector_table(&schema, collection, column)?;
        let element_type = schema.column_type(&table, &value_column)?;
        for value in values {
            typecheck::validate_value(&format!("vector '{column}'"), element_type, value)?;
        }
        let id = self.element_id(collection, label)?;

        self.with_transaction(|| {
            self.engine.execute(
                &format!("DELETE FROM {table} WHERE id = ?1"),
                &[Value::Int(id)],
            )?;
            for (i, value) in values.iter().enumerate() {
                self.engine.execute(
                    &format!(
                        "INSERT INTO {table} (id, vector_index, {value_column}) VALUES (?1, ?2, ?3)"
                    ),
                    &[Value::Int(id), Value::Int(i as i64), value.clone()],
                )?;
            }
            Ok(())
        })
    }

    /// Replace the whole set stored for `column` on the element labelled
    /// `label`. Duplicates collapse on write.
    pub fn update_set_parameters(
        &self,
        collection: &str,
        column: &str,
        label: &str,
        values: &[Value],
    ) -> Result<()> {
        self.require_writable()?;
        validation::validate_identifier(column, "attribute name")?;
        let schema = self.schema_model();
        let (table, value_column) = self.resolve_set_table(&schema, collection, column)?;
        let element_type = schema.column_type(&table, &value_column)?;
        for value in values {
            typecheck::validate_value(&format!("vector '{column}'"), element_type, value)?;
        }
        let id = self.element_id(collection, label)?;

        self.with_transaction(|| {
            self.engine.execute(
                &format!("DELETE FROM {table} WHERE id = ?1"),
                &[Value::Int(id)],
            )?;
            for value in dedup_values(values.to_vec()) {
                self.engine.execute(
                    &format!("INSERT INTO {table} (id, {value_column}) VALUES (?1, ?2)"),
                    &[Value::Int(id), value],
                )?;
            }
            Ok(())
        })
    }

    // ── Time series writes ───────────────────────────────────────────

    /// Update one cell of a time-series row, addressed by the element label
    /// and the row's `date_time` dimension value.
    pub fn update_time_series_row(
        &self,
        collection: &str,
        column: &str,
        label: &str,
        value: Value,
        date_time: &str,
    ) -> Result<()> {
        self.require_writable()?;
        validation::validate_identifier(column, "attribute name")?;
        let schema = self.schema_model();
        let table = schema
            .time_series_table_for_column(collection, column)
            .ok_or_else(|| StoreError::attribute_not_found(collection, column))?;
        let table_name = table.name.clone();
        if !table.has_column("date_time") {
            return Err(StoreError::new(
                ErrorKind::AttributeNotFound,
                format!("time series table '{table_name}' has no 'date_time' column"),
            )
            .with_context(format!("table '{table_name}'")));
        }
        let id = self.element_id(collection, label)?;

        self.with_transaction(|| {
            self.engine.execute(
                &format!("UPDATE {table_name} SET {column} = ?1 WHERE id = ?2 AND date_time = ?3"),
                &[
                    value.clone(),
                    Value::Int(id),
                    Value::Text(date_time.to_string()),
                ],
            )?;
            if self.engine.changes() == 0 {
                return Err(StoreError::new(
                    ErrorKind::ElementNotFound,
                    format!(
                        "no time series row for element '{label}' at date_time '{date_time}'"
                    ),
                )
                .with_context(format!("table '{table_name}'")));
            }
            Ok(())
        })
    }

    /// Remove every row of one time-series group for the element labelled
    /// `label`.
    pub fn delete_time_series(&self, collection: &str, group: &str, label: &str) -> Result<()> {
        self.require_writable()?;
        validation::validate_identifier(group, "time series group")?;
        let schema = self.schema_model();
        let table = Schema::time_series_table_name(collection, group);
        if schema.table(&table).is_none() {
            return Err(StoreError::attribute_not_found(collection, group));
        }
        let id = self.element_id(collection, label)?;
        self.with_transaction(|| {
            self.engine.execute(
                &format!("DELETE FROM {table} WHERE id = ?1"),
                &[Value::Int(id)],
            )?;
            Ok(())
        })
    }

    // ── File-backed time series ──────────────────────────────────────

    /// Record the (relative) file path backing `parameter`. The `_files`
    /// companion holds at most one row per collection.
    pub fn set_time_series_file(&self, collection: &str, parameter: &str, path: &str) -> Result<()> {
        self.require_writable()?;
        validation::validate_identifier(parameter, "parameter name")?;
        let schema = self.schema_model();
        let table = schema
            .files_table(collection)
            .ok_or_else(|| StoreError::attribute_not_found(collection, parameter))?
            .name
            .clone();
        schema.column_type(&table, parameter)?;

        self.with_transaction(|| {
            let rows = self
                .engine
                .execute(&format!("SELECT COUNT(*) FROM {table}"), &[])?;
            if rows.get_int(0, 0).unwrap_or(0) == 0 {
                self.engine.execute(
                    &format!("INSERT INTO {table} ({parameter}) VALUES (?1)"),
                    &[Value::Text(path.to_string())],
                )?;
            } else {
                self.engine.execute(
                    &format!("UPDATE {table} SET {parameter} = ?1"),
                    &[Value::Text(path.to_string())],
                )?;
            }
            Ok(())
        })
    }

    /// The stored file path for `parameter`, if set.
    pub fn read_time_series_file(&self, collection: &str, parameter: &str) -> Result<Option<String>> {
        validation::validate_identifier(parameter, "parameter name")?;
        let schema = self.schema_model();
        let table = schema
            .files_table(collection)
            .ok_or_else(|| StoreError::attribute_not_found(collection, parameter))?
            .name
            .clone();
        schema.column_type(&table, parameter)?;

        let rows = self
            .engine
            .execute(&format!("SELECT {parameter} FROM {table}"), &[])?;
        Ok(rows.get_text(0, 0).map(str::to_string))
    }

    /// The stored path resolved against the store file's directory
    /// (ephemeral stores resolve against the current directory).
    pub fn time_series_file_absolute_path(
        &self,
        collection: &str,
        parameter: &str,
    ) -> Result<Option<PathBuf>> {
        let Some(relative) = self.read_time_series_file(collection, parameter)? else {
            return Ok(None);
        };
        let base = if self.engine.is_memory() {
            PathBuf::from(".")
        } else {
            Path::new(self.engine.path())
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        };
        Ok(Some(base.join(relative)))
    }

    // ── Relations ────────────────────────────────────────────────────

    /// Point the scalar relation `relation` of the element labelled
    /// `parent_label` at the `target_collection` element labelled
    /// `child_label`.
    pub fn set_scalar_relation(
        &self,
        collection: &str,
        target_collection: &str,
        parent_label: &str,
        child_label: &str,
        relation: &str,
    ) -> Result<()> {
        self.require_writable()?;
        validation::validate_identifier(relation, "relation name")?;
        let schema = self.schema_model();
        let table = schema.collection(collection).map_err(|e| self.refine_no_schema(e))?;
        if !table.has_column(relation) {
            return Err(StoreError::attribute_not_found(collection, relation));
        }
        schema.collection(target_collection)?;
        let child_id = self.element_id(target_collection, child_label)?;

        self.with_transaction(|| {
            self.engine.execute(
                &format!("UPDATE {collection} SET {relation} = ?1 WHERE label = ?2"),
                &[Value::Int(child_id), Value::Text(parent_label.to_string())],
            )?;
            if self.engine.changes() == 0 {
                return Err(StoreError::element_not_found(collection, parent_label));
            }
            Ok(())
        })
    }

    /// Replace the vector relation `relation` of `parent_label` with the
    /// given child labels, in order.
    pub fn set_vector_relation(
        &self,
        collection: &str,
        target_collection: &str,
        parent_label: &str,
        child_labels: &[&str],
        relation: &str,
    ) -> Result<()> {
        let parent_id = self.element_id(collection, parent_label)?;
        let child_ids = child_labels
            .iter()
            .map(|l| self.element_id(target_collection, l))
            .collect::<Result<Vec<i64>>>()?;
        self.set_vector_relation_by_id(collection, target_collection, parent_id, &child_ids, relation)
    }

    /// As [`set_vector_relation`], addressing elements by id.
    ///
    /// [`set_vector_relation`]: Store::set_vector_relation
    pub fn set_vector_relation_by_id(
        &self,
        collection: &str,
        target_collection: &str,
        parent_id: i64,
        child_ids: &[i64],
        relation: &str,
    ) -> Result<()> {
        self.require_writable()?;
        validation::validate_identifier(relation, "relation name")?;
        validation::validate_id(parent_id, &format!("collection '{collection}'"))?;
        let schema = self.schema_model();
        schema.collection(target_collection).map_err(|e| self.refine_no_schema(e))?;
        let (table, column) = self.resolve_vector_table(&schema, collection, relation)?;

        self.with_transaction(|| {
            self.engine.execute(
                &format!("DELETE FROM {table} WHERE id = ?1"),
                &[Value::Int(parent_id)],
            )?;
            for (i, child_id) in child_ids.iter().enumerate() {
                self.engine.execute(
                    &format!(
                        "INSERT INTO {table} (id, vector_index, {column}) VALUES (?1, ?2, ?3)"
                    ),
                    &[Value::Int(parent_id), Value::Int(i as i64), Value::Int(*child_id)],
                )?;
            }
            Ok(())
        })
    }

    /// Replace the set relation `relation` of `parent_label` with the given
    /// child labels, deduplicated.
    pub fn set_set_relation(
        &self,
        collection: &str,
        target_collection: &str,
        parent_label: &str,
        child_labels: &[&str],
        relation: &str,
    ) -> Result<()> {
        self.require_writable()?;
        validation::validate_identifier(relation, "relation name")?;
        let schema = self.schema_model();
        schema.collection(target_collection).map_err(|e| self.refine_no_schema(e))?;
        let (table, column) = self.resolve_set_table(&schema, collection, relation)?;
        let parent_id = self.element_id(collection, parent_label)?;
        let child_ids = child_labels
            .iter()
            .map(|l| self.element_id(target_collection, l))
            .collect::<Result<Vec<i64>>>()?;

        self.with_transaction(|| {
            self.engine.execute(
                &format!("DELETE FROM {table} WHERE id = ?1"),
                &[Value::Int(parent_id)],
            )?;
            for child_id in dedup_values(child_ids.iter().map(|i| Value::Int(*i)).collect()) {
                self.engine.execute(
                    &format!("INSERT INTO {table} (id, {column}) VALUES (?1, ?2)"),
                    &[Value::Int(parent_id), child_id],
                )?;
            }
            Ok(())
        })
    }

    /// Target labels of a scalar relation, one entry per element ordered by
    /// id; `None` where the relation is unset.
    pub fn read_scalar_relations(
        &self,
        collection: &str,
        target_collection: &str,
        relation: &str,
    ) -> Result<Vec<Option<String>>> {
        validation::validate_identifier(relation, "relation name")?;
        let schema = self.schema_model();
        let table = schema.collection(collection).map_err(|e| self.refine_no_schema(e))?;
        if !table.has_column(relation) {
            return Err(StoreError::attribute_not_found(collection, relation));
        }
        schema.collection(target_collection)?;

        let rows = self.engine.execute(
            &format!(
                "SELECT t.label FROM {collection} AS c LEFT JOIN {target_collection} AS t \
                 ON c.{relation} = t.id ORDER BY c.id"
            ),
            &[],
        )?;
        Ok(rows
            .iter()
            .map(|row| row[0].as_text().map(str::to_string))
            .collect())
    }

    /// Target labels of a vector relation, outer by element id, inner in
    /// `vector_index` order.
    pub fn read_vector_relations(
        &self,
        collection: &str,
        target_collection: &str,
        relation: &str,
    ) -> Result<Vec<Vec<String>>> {
        self.read_relation_lists(collection, target_collection, relation, true)
    }

    /// Target labels of a set relation, outer by element id, inner
    /// unordered.
    pub fn read_set_relations(
        &self,
        collection: &str,
        target_collection: &str,
        relation: &str,
    ) -> Result<Vec<Vec<String>>> {
        self.read_relation_lists(collection, target_collection, relation, false)
    }

    // ── Attribute reads ──────────────────────────────────────────────

    /// All values of a scalar attribute, ordered by element id, nulls
    /// included.
    pub fn read_scalar(&self, collection: &str, attribute: &str) -> Result<Vec<Value>> {
        validation::validate_identifier(attribute, "attribute name")?;
        let schema = self.schema_model();
        let table = schema.collection(collection).map_err(|e| self.refine_no_schema(e))?;
        if !table.has_column(attribute) {
            return Err(StoreError::attribute_not_found(collection, attribute));
        }
        let rows = self.engine.execute(
            &format!("SELECT {attribute} FROM {collection} ORDER BY id"),
            &[],
        )?;
        Ok(rows.iter().map(|row| row[0].clone()).collect())
    }

    /// One element's scalar attribute, by label.
    pub fn read_scalar_by_label(
        &self,
        collection: &str,
        attribute: &str,
        label: &str,
    ) -> Result<Value> {
        validation::validate_identifier(attribute, "attribute name")?;
        let schema = self.schema_model();
        let table = schema.collection(collection).map_err(|e| self.refine_no_schema(e))?;
        if !table.has_column(attribute) {
            return Err(StoreError::attribute_not_found(collection, attribute));
        }
        let rows = self.engine.execute(
            &format!("SELECT {attribute} FROM {collection} WHERE label = ?1"),
            &[Value::Text(label.to_string())],
        )?;
        if rows.is_empty() {
            return Err(StoreError::element_not_found(collection, label));
        }
        Ok(rows.get(0, 0).cloned().unwrap_or(Value::Null))
    }

    /// All vectors of an attribute: outer by element id (empty for elements
    /// with no rows), inner by `vector_index`.
    pub fn read_vector(&self, collection: &str, attribute: &str) -> Result<Vec<Vec<Value>>> {
        let schema = self.schema_model();
        let (table, column) = self.resolve_vector_table(&schema, collection, attribute)?;
        self.read_grouped(collection, &table, &column, true)
    }

    /// One element's vector attribute, by label, in `vector_index` order.
    pub fn read_vector_by_label(
        &self,
        collection: &str,
        attribute: &str,
        label: &str,
    ) -> Result<Vec<Value>> {
        let schema = self.schema_model();
        let (table, column) = self.resolve_vector_table(&schema, collection, attribute)?;
        let id = self.element_id(collection, label)?;
        let rows = self.engine.execute(
            &format!("SELECT {column} FROM {table} WHERE id = ?1 ORDER BY vector_index"),
            &[Value::Int(id)],
        )?;
        Ok(rows.iter().map(|row| row[0].clone()).collect())
    }

    /// All sets of an attribute: outer by element id, inner unordered.
    pub fn read_set(&self, collection: &str, attribute: &str) -> Result<Vec<Vec<Value>>> {
        let schema = self.schema_model();
        let (table, column) = self.resolve_set_table(&schema, collection, attribute)?;
        self.read_grouped(collection, &table, &column, false)
    }

    /// One element's set attribute, by label, unordered.
    pub fn read_set_by_label(
        &self,
        collection: &str,
        attribute: &str,
        label: &str,
    ) -> Result<Vec<Value>> {
        let schema = self.schema_model();
        let (table, column) = self.resolve_set_table(&schema, collection, attribute)?;
        let id = self.element_id(collection, label)?;
        let rows = self.engine.execute(
            &format!("SELECT {column} FROM {table} WHERE id = ?1"),
            &[Value::Int(id)],
        )?;
        Ok(rows.iter().map(|row| row[0].clone()).collect())
    }

    /// Every scalar column of one element's main row except `id`, as
    /// `(name, value)` pairs in column order.
    pub fn read_element_scalar_attributes(
        &self,
        collection: &str,
        id: i64,
    ) -> Result<Vec<(String, Value)>> {
        validation::validate_id(id, &format!("collection '{collection}'"))?;
        self.schema_model().collection(collection).map_err(|e| self.refine_no_schema(e))?;
        let rows = self.engine.execute(
            &format!("SELECT * FROM {collection} WHERE id = ?1"),
            &[Value::Int(id)],
        )?;
        if rows.is_empty() {
            return Err(StoreError::new(
                ErrorKind::ElementNotFound,
                format!("no element with id {id} in collection '{collection}'"),
            )
            .with_context(format!("collection '{collection}'")));
        }

        let mut attributes = Vec::new();
        for (c, name) in rows.columns().iter().enumerate() {
            if name.eq_ignore_ascii_case("id") {
                continue;
            }
            attributes.push((name.clone(), rows.get(0, c).cloned().unwrap_or(Value::Null)));
        }
        Ok(attributes)
    }

    /// Every value column of one vector group for one element, each
    /// materialised in `vector_index` order.
    pub fn read_element_vector_group(
        &self,
        collection: &str,
        id: i64,
        group: &str,
    ) -> Result<Vec<(String, Vec<Value>)>> {
        let table = Schema::vector_table_name(collection, group);
        self.read_element_group(collection, id, &table, true)
    }

    /// Every value column of one set group for one element, unordered.
    pub fn read_element_set_group(
        &self,
        collection: &str,
        id: i64,
        group: &str,
    ) -> Result<Vec<(String, Vec<Value>)>> {
        let table = Schema::set_table_name(collection, group);
        self.read_element_group(collection, id, &table, false)
    }

    /// Rows of one time-series group for one element, ordered
    /// lexicographically on `dimension_keys`. Each row maps column name to
    /// value, dimension columns included.
    pub fn read_element_time_series_group(
        &self,
        collection: &str,
        id: i64,
        group: &str,
        dimension_keys: &[&str],
    ) -> Result<Vec<BTreeMap<String, Value>>> {
        validation::validate_id(id, &format!("collection '{collection}'"))?;
        validation::validate_identifier(group, "time series group")?;
        let schema = self.schema_model();
        let table_name = Schema::time_series_table_name(collection, group);
        let table = schema
            .table(&table_name)
            .ok_or_else(|| StoreError::attribute_not_found(collection, group))?;
        for key in dimension_keys {
            if !table.has_column(key) {
                return Err(StoreError::new(
                    ErrorKind::AttributeNotFound,
                    format!("dimension column '{key}' does not exist in '{table_name}'"),
                )
                .with_context(format!("column '{key}'")));
            }
        }

        let order = if dimension_keys.is_empty() {
            String::new()
        } else {
            format!(" ORDER BY {}", dimension_keys.join(", "))
        };
        let rows = self.engine.execute(
            &format!("SELECT * FROM {table_name} WHERE id = ?1{order}"),
            &[Value::Int(id)],
        )?;

        let mut result = Vec::with_capacity(rows.row_count());
        for row in rows.iter() {
            let mut map = BTreeMap::new();
            for (c, name) in rows.columns().iter().enumerate() {
                if name.eq_ignore_ascii_case("id") {
                    continue;
                }
                map.insert(name.clone(), row[c].clone());
            }
            result.push(map);
        }
        Ok(result)
    }

    // ── Introspection ────────────────────────────────────────────────

    /// Names of all collections (main tables), in name order.
    pub fn get_collections(&self) -> Vec<String> {
        self.schema.borrow().collections()
    }

    /// Engine-assigned ids of a collection's elements, ascending.
    pub fn get_element_ids(&self, collection: &str) -> Result<Vec<i64>> {
        self.schema_model().collection(collection).map_err(|e| self.refine_no_schema(e))?;
        let rows = self
            .engine
            .execute(&format!("SELECT id FROM {collection} ORDER BY id"), &[])?;
        Ok(rows.iter().filter_map(|row| row[0].as_int()).collect())
    }

    /// The id of the element labelled `label`.
    pub fn get_element_id(&self, collection: &str, label: &str) -> Result<i64> {
        self.element_id(collection, label)
    }

    pub fn get_vector_groups(&self, collection: &str) -> Result<Vec<String>> {
        let schema = self.schema_model();
        schema.collection(collection).map_err(|e| self.refine_no_schema(e))?;
        Ok(schema.vector_groups(collection))
    }

    pub fn get_set_groups(&self, collection: &str) -> Result<Vec<String>> {
        let schema = self.schema_model();
        schema.collection(collection).map_err(|e| self.refine_no_schema(e))?;
        Ok(schema.set_groups(collection))
    }

    pub fn get_time_series_groups(&self, collection: &str) -> Result<Vec<String>> {
        let schema = self.schema_model();
        schema.collection(collection).map_err(|e| self.refine_no_schema(e))?;
        Ok(schema.time_series_groups(collection))
    }

    pub fn get_vector_tables(&self, collection: &str) -> Result<Vec<String>> {
        let schema = self.schema_model();
        schema.collection(collection).map_err(|e| self.refine_no_schema(e))?;
        Ok(schema
            .vector_tables(collection)
            .into_iter()
            .map(|t| t.name.clone())
            .collect())
    }

    pub fn get_set_tables(&self, collection: &str) -> Result<Vec<String>> {
        let schema = self.schema_model();
        schema.collection(collection).map_err(|e| self.refine_no_schema(e))?;
        Ok(schema
            .set_tables(collection)
            .into_iter()
            .map(|t| t.name.clone())
            .collect())
    }

    pub fn get_time_series_tables(&self, collection: &str) -> Result<Vec<String>> {
        let schema = self.schema_model();
        schema.collection(collection).map_err(|e| self.refine_no_schema(e))?;
        Ok(schema
            .time_series_tables(collection)
            .into_iter()
            .map(|t| t.name.clone())
            .collect())
    }

    /// Declared columns of any table, in declaration order.
    pub fn get_table_columns(&self, table: &str) -> Result<Vec<String>> {
        let schema = self.schema_model();
        let table = schema.require_table(table)?;
        Ok(table.columns.iter().map(|c| c.name.clone()).collect())
    }

    pub fn is_scalar_column(&self, collection: &str, column: &str) -> bool {
        self.schema.borrow().is_scalar_column(collection, column)
    }

    pub fn is_vector_column(&self, collection: &str, column: &str) -> bool {
        self.schema.borrow().is_vector_column(collection, column)
    }

    pub fn is_set_column(&self, collection: &str, column: &str) -> bool {
        self.schema.borrow().is_set_column(collection, column)
    }

    // ── Structural diff ──────────────────────────────────────────────

    pub fn compare_scalar_parameters(&self, other: &Store, collection: &str) -> Result<Vec<String>> {
        diff::compare_scalar_parameters(self, other, collection)
    }

    pub fn compare_vector_parameters(&self, other: &Store, collection: &str) -> Result<Vec<String>> {
        diff::compare_vector_parameters(self, other, collection)
    }

    pub fn compare_set_parameters(&self, other: &Store, collection: &str) -> Result<Vec<String>> {
        diff::compare_set_parameters(self, other, collection)
    }

    pub fn compare_scalar_relations(&self, other: &Store, collection: &str) -> Result<Vec<String>> {
        diff::compare_scalar_relations(self, other, collection)
    }

    pub fn compare_vector_relations(&self, other: &Store, collection: &str) -> Result<Vec<String>> {
        diff::compare_vector_relations(self, other, collection)
    }

    pub fn compare_set_relations(&self, other: &Store, collection: &str) -> Result<Vec<String>> {
        diff::compare_set_relations(self, other, collection)
    }

    pub fn compare_time_series(&self, other: &Store, collection: &str) -> Result<Vec<String>> {
        diff::compare_time_series(self, other, collection)
    }

    pub fn compare_time_series_files(&self, other: &Store, collection: &str) -> Result<Vec<String>> {
        diff::compare_time_series_files(self, other, collection)
    }

    /// Walk every common collection and concatenate all per-kind diffs.
    /// An empty result is the canonical equality predicate for two stores.
    pub fn compare_databases(&self, other: &Store) -> Result<Vec<String>> {
        diff::compare_databases(self, other)
    }

    // ── Internal helpers ─────────────────────────────────────────────

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    pub(crate) fn schema_model(&self) -> Schema {
        self.schema.borrow().clone()
    }

    fn require_writable(&self) -> Result<()> {
        if self.options.read_only {
            return Err(StoreError::new(
                ErrorKind::PermissionDenied,
                "store is open read-only",
            ));
        }
        Ok(())
    }

    // Re-parse the engine catalog into the schema model, shape-validating
    // along the way.
    fn rebuild_schema(&self) -> Result<()> {
        let ddl = self.engine.table_ddl()?;
        let schema = parse_schema(&ddl)?;
        *self.schema.borrow_mut() = schema;
        Ok(())
    }

    // A missing collection on an empty model means no schema was ever
    // loaded; keep the two conditions distinguishable.
    fn refine_no_schema(&self, err: StoreError) -> StoreError {
        if err.kind == ErrorKind::CollectionNotFound && self.schema.borrow().is_empty() {
            return StoreError::new(
                ErrorKind::NoSchemaLoaded,
                "store has no schema; load one with from_schema or from_migrations",
            );
        }
        err
    }

    // Run `f` in the caller's transaction if one is open, otherwise in an
    // implicit transaction committed on success and rolled back on error.
    fn with_transaction<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        if self.engine.in_transaction() {
            return f();
        }
        self.engine.begin()?;
        match f() {
            Ok(value) => {
                self.engine.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.engine.rollback() {
                    log::warn!("rollback after failed operation also failed: {rollback_err}");
                }
                Err(e)
            }
        }
    }

    fn find_element_id(&self, collection: &str, label: &str) -> Result<Option<i64>> {
        let rows = self.engine.execute(
            &format!("SELECT id FROM {collection} WHERE label = ?1"),
            &[Value::Text(label.to_string())],
        )?;
        Ok(rows.get_int(0, 0))
    }

    fn element_id(&self, collection: &str, label: &str) -> Result<i64> {
        self.schema_model().collection(collection).map_err(|e| self.refine_no_schema(e))?;
        self.find_element_id(collection, label)?
            .ok_or_else(|| StoreError::element_not_found(collection, label))
    }

    // Route an array-valued attribute to its vector or set companion.
    fn route_multi_value(
        &self,
        schema: &Schema,
        collection: &str,
        name: &str,
        values: Vec<Value>,
        vector_writes: &mut Vec<(String, String, Vec<Value>)>,
        set_writes: &mut Vec<(String, String, Vec<Value>)>,
    ) -> Result<()> {
        if let Ok((table, column)) = self.resolve_vector_table(schema, collection, name) {
            let element_type = schema.column_type(&table, &column)?;
            for value in &values {
                typecheck::validate_value(&format!("vector '{name}'"), element_type, value)?;
            }
            vector_writes.push((table, column, values));
            return Ok(());
        }
        if let Ok((table, column)) = self.resolve_set_table(schema, collection, name) {
            let element_type = schema.column_type(&table, &column)?;
            for value in &values {
                typecheck::validate_value(&format!("vector '{name}'"), element_type, value)?;
            }
            set_writes.push((table, column, values));
            return Ok(());
        }
        Err(StoreError::attribute_not_found(collection, name))
    }

    // Resolve a vector attribute to its companion table and value column.
    // The attribute may name a value column or a whole group.
    fn resolve_vector_table(
        &self,
        schema: &Schema,
        collection: &str,
        attribute: &str,
    ) -> Result<(String, String)> {
        validation::validate_identifier(attribute, "attribute name")?;
        schema.collection(collection).map_err(|e| self.refine_no_schema(e))?;
        if let Some(table) = schema.vector_table_for_column(collection, attribute) {
            return Ok((table.name.clone(), attribute.to_ascii_lowercase()));
        }
        let group_table = Schema::vector_table_name(collection, attribute);
        if let Some(table) = schema.table(&group_table) {
            if let Some(column) = table.value_columns().next() {
                return Ok((table.name.clone(), column.name.clone()));
            }
        }
        Err(StoreError::attribute_not_found(collection, attribute))
    }

    fn resolve_set_table(
        &self,
        schema: &Schema,
        collection: &str,
        attribute: &str,
    ) -> Result<(String, String)> {
        validation::validate_identifier(attribute, "attribute name")?;
        schema.collection(collection).map_err(|e| self.refine_no_schema(e))?;
        if let Some(table) = schema.set_table_for_column(collection, attribute) {
            return Ok((table.name.clone(), attribute.to_ascii_lowercase()));
        }
        let group_table = Schema::set_table_name(collection, attribute);
        if let Some(table) = schema.table(&group_table) {
            if let Some(column) = table.value_columns().next() {
                return Ok((table.name.clone(), column.name.clone()));
            }
        }
        Err(StoreError::attribute_not_found(collection, attribute))
    }

    // Shared implementation for bulk vector/set reads: outer dimension by
    // element id, elements without companion rows included as empty.
    fn read_grouped(
        &self,
        collection: &str,
        table: &str,
        column: &str,
        ordered: bool,
    ) -> Result<Vec<Vec<Value>>> {
        let ids = self.get_element_ids(collection)?;
        let order = if ordered { ", vector_index" } else { "" };
        let rows = self.engine.execute(
            &format!("SELECT id, {column} FROM {table} ORDER BY id{order}"),
            &[],
        )?;

        let mut by_id: BTreeMap<i64, Vec<Value>> = BTreeMap::new();
        for row in rows.iter() {
            if let Some(id) = row[0].as_int() {
                by_id.entry(id).or_default().push(row[1].clone());
            }
        }
        Ok(ids
            .into_iter()
            .map(|id| by_id.remove(&id).unwrap_or_default())
            .collect())
    }

    // Shared implementation for per-element group reads: every value column
    // of the companion, each materialised as a column vector.
    fn read_element_group(
        &self,
        collection: &str,
        id: i64,
        table_name: &str,
        ordered: bool,
    ) -> Result<Vec<(String, Vec<Value>)>> {
        validation::validate_id(id, &format!("collection '{collection}'"))?;
        let schema = self.schema_model();
        schema.collection(collection).map_err(|e| self.refine_no_schema(e))?;
        let table = schema.table(table_name).ok_or_else(|| {
            StoreError::new(
                ErrorKind::AttributeNotFound,
                format!("no companion table '{table_name}' in collection '{collection}'"),
            )
            .with_context(format!("collection '{collection}'"))
        })?;

        let columns: Vec<String> = table.value_columns().map(|c| c.name.clone()).collect();
        if columns.is_empty() {
            return Ok(Vec::new());
        }
        let order = if ordered { " ORDER BY vector_index" } else { "" };
        let rows = self.engine.execute(
            &format!(
                "SELECT {} FROM {table_name} WHERE id = ?1{order}",
                columns.join(", ")
            ),
            &[Value::Int(id)],
        )?;

        let mut result: Vec<(String, Vec<Value>)> =
            columns.into_iter().map(|c| (c, Vec::new())).collect();
        for row in rows.iter() {
            for (c, (_, values)) in result.iter_mut().enumerate() {
                values.push(row[c].clone());
            }
        }
        Ok(result)
    }

    fn read_relation_lists(
        &self,
        collection: &str,
        target_collection: &str,
        relation: &str,
        ordered: bool,
    ) -> Result<Vec<Vec<String>>> {
        let schema = self.schema_model();
        schema.collection(target_collection).map_err(|e| self.refine_no_schema(e))?;
        let (table, column) = if ordered {
            self.resolve_vector_table(&schema, collection, relation)?
        } else {
            self.resolve_set_table(&schema, collection, relation)?
        };

        let ids = self.get_element_ids(collection)?;
        let order = if ordered { ", v.vector_index" } else { "" };
        let rows = self.engine.execute(
            &format!(
                "SELECT v.id, t.label FROM {table} AS v JOIN {target_collection} AS t \
                 ON v.{column} = t.id ORDER BY v.id{order}"
            ),
            &[],
        )?;

        let mut by_id: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        for row in rows.iter() {
            if let (Some(id), Some(label)) = (row[0].as_int(), row[1].as_text()) {
                by_id.entry(id).or_default().push(label.to_string());
            }
        }
        Ok(ids
            .into_iter()
            .map(|id| by_id.remove(&id).unwrap_or_default())
            .collect())
    }
}

// Collapse duplicates while preserving first-occurrence order.
fn dedup_values(values: Vec<Value>) -> Vec<Value> {
    let mut unique: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::TimeSeries;
    use crate::engine::MEMORY_PATH;
    use tempfile::TempDir;

    const SCHEMA: &str = "
        CREATE TABLE Configuration (id INTEGER PRIMARY KEY, value TEXT);

        CREATE TABLE Fuel (
            id INTEGER PRIMARY KEY,
            label TEXT NOT NULL UNIQUE,
            price REAL
        );

        CREATE TABLE Plant (
            id INTEGER PRIMARY KEY,
            label TEXT NOT NULL UNIQUE,
            capacity REAL,
            units INTEGER,
            primary_fuel INTEGER,
            FOREIGN KEY(primary_fuel) REFERENCES Fuel(id) ON DELETE SET NULL ON UPDATE CASCADE
        );

        CREATE TABLE Plant_vector_costs (
            id INTEGER,
            vector_index INTEGER NOT NULL,
            cost REAL,
            FOREIGN KEY(id) REFERENCES Plant(id) ON DELETE CASCADE ON UPDATE CASCADE
        );

        CREATE TABLE Plant_vector_sources (
            id INTEGER,
            vector_index INTEGER NOT NULL,
            source_id INTEGER,
            FOREIGN KEY(id) REFERENCES Plant(id) ON DELETE CASCADE ON UPDATE CASCADE,
            FOREIGN KEY(source_id) REFERENCES Fuel(id) ON DELETE CASCADE ON UPDATE CASCADE
        );

        CREATE TABLE Plant_set_tags (
            id INTEGER,
            tag TEXT,
            FOREIGN KEY(id) REFERENCES Plant(id) ON DELETE CASCADE ON UPDATE CASCADE
        );

        CREATE TABLE Plant_set_backup_fuels (
            id INTEGER,
            backup_id INTEGER,
            FOREIGN KEY(id) REFERENCES Plant(id) ON DELETE CASCADE ON UPDATE CASCADE,
            FOREIGN KEY(backup_id) REFERENCES Fuel(id) ON DELETE CASCADE ON UPDATE CASCADE
        );

        CREATE TABLE Plant_time_series_generation (
            id INTEGER,
            date_time TEXT,
            stage INTEGER,
            output REAL,
            FOREIGN KEY(id) REFERENCES Plant(id) ON DELETE CASCADE ON UPDATE CASCADE
        );

        CREATE TABLE Plant_files (generation TEXT);
    ";

    fn test_store() -> Store {
        let store = Store::open(MEMORY_PATH, StoreOptions::default()).unwrap();
        store.apply_schema_text(SCHEMA).unwrap();
        store
    }

    fn plant(label: &str, capacity: f64) -> Element {
        Element::new().set("label", label).set("capacity", capacity)
    }

    #[test]
    fn test_create_element_roundtrip() {
        let store = test_store();
        let id = store
            .create_element(
                "Plant",
                &plant("P1", 50.0).set_real_vector("cost", vec![1.0, 2.0, 3.0]),
            )
            .unwrap();
        assert_eq!(id, 1);

        assert_eq!(
            store.read_scalar_by_label("Plant", "capacity", "P1").unwrap(),
            Value::Real(50.0)
        );
        assert_eq!(
            store.read_vector_by_label("Plant", "cost", "P1").unwrap(),
            vec![Value::Real(1.0), Value::Real(2.0), Value::Real(3.0)]
        );
    }

    #[test]
    fn test_create_element_requires_label() {
        let store = test_store();

        let err = store
            .create_element("Plant", &Element::new().set("capacity", 1.0))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidValue);

        let err = store
            .create_element("Plant", &Element::new().set("label", ""))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidValue);
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let store = test_store();
        store.create_element("Plant", &plant("P1", 1.0)).unwrap();
        let err = store.create_element("Plant", &plant("P1", 2.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateElement);
    }

    #[test]
    fn test_empty_element_rejected() {
        let store = test_store();
        let err = store.create_element("Plant", &Element::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::EmptyElement);
    }

    #[test]
    fn test_unknown_collection() {
        let store = test_store();
        let err = store.create_element("Ghost", &plant("X", 1.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CollectionNotFound);
    }

    #[test]
    fn test_no_schema_loaded() {
        let store = Store::open(MEMORY_PATH, StoreOptions::default()).unwrap();
        let err = store.create_element("Plant", &plant("P1", 1.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoSchemaLoaded);
    }

    #[test]
    fn test_type_mismatch_rejected_before_write() {
        let store = test_store();
        let err = store
            .create_element("Plant", &Element::new().set("label", "P1").set("capacity", "a lot"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert_eq!(err.context, "column 'capacity'");
        assert!(store.get_element_ids("Plant").unwrap().is_empty());
    }

    #[test]
    fn test_real_into_integer_column_narrows() {
        let store = test_store();
        store
            .create_element("Plant", &plant("P1", 1.0).set("units", 50.0))
            .unwrap();
        assert_eq!(
            store.read_scalar_by_label("Plant", "units", "P1").unwrap(),
            Value::Int(50)
        );
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let store = test_store();
        let err = store
            .create_element("Plant", &plant("P1", 1.0).set("ghost", 1i64))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AttributeNotFound);
    }

    #[test]
    fn test_reserved_keyword_identifier_rejected() {
        let store = test_store();
        let err = store.read_scalar("Plant", "select").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidIdentifier);

        let long = "x".repeat(129);
        let err = store.read_scalar("Plant", &long).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidIdentifier);
    }

    #[test]
    fn test_empty_vector_stores_no_rows() {
        let store = test_store();
        store
            .create_element("Plant", &plant("P1", 1.0).set_real_vector("cost", vec![]))
            .unwrap();
        let rows = store
            .execute("SELECT COUNT(*) FROM Plant_vector_costs", &[])
            .unwrap();
        assert_eq!(rows.get_int(0, 0), Some(0));
        assert_eq!(
            store.read_vector_by_label("Plant", "cost", "P1").unwrap(),
            Vec::<Value>::new()
        );
        assert_eq!(store.read_vector("Plant", "cost").unwrap(), vec![Vec::new()]);
    }

    #[test]
    fn test_set_deduplicates_on_write() {
        let store = test_store();
        store
            .create_element(
                "Plant",
                &plant("P1", 1.0).set_text_vector("tag", vec!["a".into(), "b".into(), "a".into()]),
            )
            .unwrap();
        let values = store.read_set_by_label("Plant", "tag", "P1").unwrap();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_read_scalar_ordered_by_id_with_nulls() {
        let store = test_store();
        store.create_element("Plant", &plant("P1", 10.0)).unwrap();
        store
            .create_element("Plant", &Element::new().set("label", "P2"))
            .unwrap();
        store.create_element("Plant", &plant("P3", 30.0)).unwrap();

        let values = store.read_scalar("Plant", "capacity").unwrap();
        assert_eq!(
            values,
            vec![Value::Real(10.0), Value::Null, Value::Real(30.0)]
        );
    }

    #[test]
    fn test_read_scalar_by_label_missing_element() {
        let store = test_store();
        let err = store
            .read_scalar_by_label("Plant", "capacity", "P9")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ElementNotFound);
    }

    #[test]
    fn test_read_vector_outer_by_id() {
        let store = test_store();
        store
            .create_element("Plant", &plant("P1", 1.0).set_real_vector("cost", vec![1.0, 2.0]))
            .unwrap();
        store.create_element("Plant", &plant("P2", 2.0)).unwrap();
        store
            .create_element("Plant", &plant("P3", 3.0).set_real_vector("cost", vec![9.0]))
            .unwrap();

        let vectors = store.read_vector("Plant", "cost").unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0], vec![Value::Real(1.0), Value::Real(2.0)]);
        assert!(vectors[1].is_empty());
        assert_eq!(vectors[2], vec![Value::Real(9.0)]);
    }

    #[test]
    fn test_delete_element_cascades_to_companions() {
        let store = test_store();
        store
            .create_element(
                "Plant",
                &plant("P1", 1.0)
                    .set_real_vector("cost", vec![1.0, 2.0])
                    .set_text_vector("tag", vec!["x".into()]),
            )
            .unwrap();

        store.delete_element("Plant", "P1").unwrap();

        for table in ["Plant_vector_costs", "Plant_set_tags"] {
            let rows = store
                .execute(&format!("SELECT COUNT(*) FROM {table}"), &[])
                .unwrap();
            assert_eq!(rows.get_int(0, 0), Some(0), "rows left in {table}");
        }

        let err = store.delete_element("Plant", "P1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ElementNotFound);
    }

    #[test]
    fn test_delete_element_by_id() {
        let store = test_store();
        let id = store.create_element("Plant", &plant("P1", 1.0)).unwrap();
        store.delete_element_by_id("Plant", id).unwrap();
        assert!(store.get_element_ids("Plant").unwrap().is_empty());
        assert!(store.delete_element_by_id("Plant", id).is_err());
        assert!(store.delete_element_by_id("Plant", 0).is_err());
    }

    #[test]
    fn test_read_element_scalar_attributes() {
        let store = test_store();
        let id = store
            .create_element("Plant", &plant("P1", 50.0).set("units", 3i64))
            .unwrap();

        let attrs = store.read_element_scalar_attributes("Plant", id).unwrap();
        let names: Vec<&str> = attrs.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"label"));
        assert!(names.contains(&"capacity"));
        assert!(!names.contains(&"id"));

        let capacity = attrs.iter().find(|(n, _)| n == "capacity").unwrap();
        assert_eq!(capacity.1, Value::Real(50.0));

        let err = store.read_element_scalar_attributes("Plant", 99).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ElementNotFound);
    }

    #[test]
    fn test_read_element_vector_group() {
        let store = test_store();
        let id = store
            .create_element("Plant", &plant("P1", 1.0).set_real_vector("cost", vec![1.0, 2.0]))
            .unwrap();

        let group = store.read_element_vector_group("Plant", id, "costs").unwrap();
        assert_eq!(group.len(), 1);
        assert_eq!(group[0].0, "cost");
        assert_eq!(group[0].1, vec![Value::Real(1.0), Value::Real(2.0)]);

        let err = store
            .read_element_vector_group("Plant", id, "ghost")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AttributeNotFound);
    }

    #[test]
    fn test_read_element_set_group() {
        let store = test_store();
        let id = store
            .create_element(
                "Plant",
                &plant("P1", 1.0).set_text_vector("tag", vec!["a".into(), "b".into()]),
            )
            .unwrap();
        let group = store.read_element_set_group("Plant", id, "tags").unwrap();
        assert_eq!(group[0].0, "tag");
        assert_eq!(group[0].1.len(), 2);
    }

    #[test]
    fn test_time_series_roundtrip() {
        let store = test_store();
        let ts = TimeSeries::new()
            .add_text_column("date_time", vec!["2024-02".into(), "2024-01".into()])
            .add_int_column("stage", vec![2, 1])
            .add_real_column("output", vec![20.0, 10.0]);
        let id = store
            .create_element("Plant", &plant("P1", 1.0).add_time_series("generation", ts))
            .unwrap();

        let rows = store
            .read_element_time_series_group("Plant", id, "generation", &["date_time"])
            .unwrap();
        assert_eq!(rows.len(), 2);
        // Lexicographic on the dimension key.
        assert_eq!(rows[0]["date_time"], Value::Text("2024-01".into()));
        assert_eq!(rows[0]["output"], Value::Real(10.0));
        assert_eq!(rows[1]["date_time"], Value::Text("2024-02".into()));
        assert!(rows[0].contains_key("stage"));
    }

    #[test]
    fn test_time_series_unequal_columns_rejected() {
        let store = test_store();
        let ts = TimeSeries::new()
            .add_text_column("date_time", vec!["2024-01".into()])
            .add_real_column("output", vec![1.0, 2.0]);
        let err = store
            .create_element("Plant", &plant("P1", 1.0).add_time_series("generation", ts))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidValue);
        assert!(store.get_element_ids("Plant").unwrap().is_empty());
    }

    #[test]
    fn test_update_scalar_parameter() {
        let store = test_store();
        store.create_element("Plant", &plant("P1", 50.0)).unwrap();
        store
            .update_scalar_parameter("Plant", "capacity", "P1", Value::Real(60.0))
            .unwrap();
        assert_eq!(
            store.read_scalar_by_label("Plant", "capacity", "P1").unwrap(),
            Value::Real(60.0)
        );

        let err = store
            .update_scalar_parameter("Plant", "capacity", "P9", Value::Real(1.0))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ElementNotFound);
    }

    #[test]
    fn test_update_vector_parameters_replaces() {
        let store = test_store();
        store
            .create_element("Plant", &plant("P1", 1.0).set_real_vector("cost", vec![1.0, 2.0, 3.0]))
            .unwrap();
        store
            .update_vector_parameters(
                "Plant",
                "cost",
                "P1",
                &[Value::Real(9.0), Value::Real(8.0)],
            )
            .unwrap();
        assert_eq!(
            store.read_vector_by_label("Plant", "cost", "P1").unwrap(),
            vec![Value::Real(9.0), Value::Real(8.0)]
        );
    }

    #[test]
    fn test_update_set_parameters_deduplicates() {
        let store = test_store();
        store
            .create_element("Plant", &plant("P1", 1.0).set_text_vector("tag", vec!["a".into()]))
            .unwrap();
        store
            .update_set_parameters(
                "Plant",
                "tag",
                "P1",
                &[
                    Value::Text("x".into()),
                    Value::Text("y".into()),
                    Value::Text("x".into()),
                ],
            )
            .unwrap();
        let values = store.read_set_by_label("Plant", "tag", "P1").unwrap();
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_update_time_series_row() {
        let store = test_store();
        let ts = TimeSeries::new()
            .add_text_column("date_time", vec!["2024-01".into(), "2024-02".into()])
            .add_int_column("stage", vec![1, 2])
            .add_real_column("output", vec![10.0, 20.0]);
        let id = store
            .create_element("Plant", &plant("P1", 1.0).add_time_series("generation", ts))
            .unwrap();

        store
            .update_time_series_row("Plant", "output", "P1", Value::Real(15.0), "2024-01")
            .unwrap();
        let rows = store
            .read_element_time_series_group("Plant", id, "generation", &["date_time"])
            .unwrap();
        assert_eq!(rows[0]["output"], Value::Real(15.0));
        assert_eq!(rows[1]["output"], Value::Real(20.0));

        let err = store
            .update_time_series_row("Plant", "output", "P1", Value::Real(1.0), "2030-01")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ElementNotFound);
    }

    #[test]
    fn test_delete_time_series() {
        let store = test_store();
        let ts = TimeSeries::new()
            .add_text_column("date_time", vec!["2024-01".into()])
            .add_int_column("stage", vec![1])
            .add_real_column("output", vec![10.0]);
        let id = store
            .create_element("Plant", &plant("P1", 1.0).add_time_series("generation", ts))
            .unwrap();

        store.delete_time_series("Plant", "generation", "P1").unwrap();
        let rows = store
            .read_element_time_series_group("Plant", id, "generation", &[])
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_scalar_relation() {
        let store = test_store();
        store
            .create_element("Fuel", &Element::new().set("label", "gas"))
            .unwrap();
        store.create_element("Plant", &plant("P1", 1.0)).unwrap();
        store.create_element("Plant", &plant("P2", 2.0)).unwrap();

        store
            .set_scalar_relation("Plant", "Fuel", "P1", "gas", "primary_fuel")
            .unwrap();

        let relations = store
            .read_scalar_relations("Plant", "Fuel", "primary_fuel")
            .unwrap();
        assert_eq!(relations, vec![Some("gas".to_string()), None]);

        let err = store
            .set_scalar_relation("Plant", "Fuel", "P1", "plutonium", "primary_fuel")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ElementNotFound);
    }

    #[test]
    fn test_vector_relation() {
        let store = test_store();
        store
            .create_element("Fuel", &Element::new().set("label", "gas"))
            .unwrap();
        store
            .create_element("Fuel", &Element::new().set("label", "coal"))
            .unwrap();
        store.create_element("Plant", &plant("P1", 1.0)).unwrap();

        store
            .set_vector_relation("Plant", "Fuel", "P1", &["coal", "gas"], "sources")
            .unwrap();
        let relations = store
            .read_vector_relations("Plant", "Fuel", "sources")
            .unwrap();
        assert_eq!(relations, vec![vec!["coal".to_string(), "gas".to_string()]]);

        // Replacement semantics.
        store
            .set_vector_relation("Plant", "Fuel", "P1", &["gas"], "sources")
            .unwrap();
        let relations = store
            .read_vector_relations("Plant", "Fuel", "sources")
            .unwrap();
        assert_eq!(relations, vec![vec!["gas".to_string()]]);
    }

    #[test]
    fn test_vector_relation_rolls_back_on_bad_child() {
        let store = test_store();
        store
            .create_element("Fuel", &Element::new().set("label", "gas"))
            .unwrap();
        let plant_id = store.create_element("Plant", &plant("P1", 1.0)).unwrap();
        store
            .set_vector_relation("Plant", "Fuel", "P1", &["gas"], "sources")
            .unwrap();

        // A nonexistent child id violates the foreign key mid-sequence; the
        // prior rows must survive the rollback.
        let err = store
            .set_vector_relation_by_id("Plant", "Fuel", plant_id, &[999], "sources")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ForeignKeyViolation);

        let relations = store
            .read_vector_relations("Plant", "Fuel", "sources")
            .unwrap();
        assert_eq!(relations, vec![vec!["gas".to_string()]]);
    }

    #[test]
    fn test_set_relation_deduplicates() {
        let store = test_store();
        store
            .create_element("Fuel", &Element::new().set("label", "gas"))
            .unwrap();
        store.create_element("Plant", &plant("P1", 1.0)).unwrap();

        store
            .set_set_relation("Plant", "Fuel", "P1", &["gas", "gas"], "backup_fuels")
            .unwrap();
        let relations = store
            .read_set_relations("Plant", "Fuel", "backup_fuels")
            .unwrap();
        assert_eq!(relations, vec![vec!["gas".to_string()]]);
    }

    #[test]
    fn test_introspection() {
        let store = test_store();
        assert_eq!(store.get_collections(), vec!["Fuel".to_string(), "Plant".to_string()]);
        assert_eq!(
            store.get_vector_groups("Plant").unwrap(),
            vec!["costs".to_string(), "sources".to_string()]
        );
        assert_eq!(
            store.get_set_groups("Plant").unwrap(),
            vec!["backup_fuels".to_string(), "tags".to_string()]
        );
        assert_eq!(
            store.get_time_series_groups("Plant").unwrap(),
            vec!["generation".to_string()]
        );
        assert!(store.is_scalar_column("Plant", "capacity"));
        assert!(store.is_vector_column("Plant", "cost"));
        assert!(store.is_set_column("Plant", "tag"));
        assert!(!store.is_vector_column("Plant", "capacity"));

        let columns = store.get_table_columns("Plant").unwrap();
        assert_eq!(columns[0], "id");
        assert!(columns.contains(&"capacity".to_string()));
    }

    #[test]
    fn test_execute_passthrough() {
        let store = test_store();
        store.create_element("Plant", &plant("P1", 50.0)).unwrap();
        let rows = store
            .execute(
                "SELECT label, capacity FROM Plant WHERE capacity > ?1",
                &[Value::Real(10.0)],
            )
            .unwrap();
        assert_eq!(rows.row_count(), 1);
        assert_eq!(rows.get_text(0, 0), Some("P1"));
        assert_eq!(rows.get_real(0, 1), Some(50.0));
    }

    #[test]
    fn test_version_roundtrip() {
        let store = test_store();
        assert_eq!(store.current_version().unwrap(), 0);
        store.set_version(4).unwrap();
        assert_eq!(store.current_version().unwrap(), 4);
        assert!(store.set_version(-1).is_err());
    }

    fn write_migration(root: &std::path::Path, version: &str, files: &[(&str, &str)]) {
        let dir = root.join(version);
        std::fs::create_dir_all(&dir).unwrap();
        for (name, sql) in files {
            std::fs::write(dir.join(name), sql).unwrap();
        }
    }

    #[test]
    fn test_migrations_apply_in_order_with_gaps() {
        let tmp = TempDir::new().unwrap();
        write_migration(
            tmp.path(),
            "1",
            &[("a.sql", "CREATE TABLE Plant (id INTEGER PRIMARY KEY, label TEXT NOT NULL UNIQUE);")],
        );
        write_migration(
            tmp.path(),
            "3",
            &[("a.sql", "ALTER TABLE Plant ADD COLUMN capacity REAL;")],
        );

        let store = Store::from_migrations(MEMORY_PATH, tmp.path(), StoreOptions::default()).unwrap();
        assert_eq!(store.current_version().unwrap(), 3);
        assert!(store.is_scalar_column("Plant", "capacity"));

        // Rerunning is a no-op.
        store.migrate_up(tmp.path()).unwrap();
        assert_eq!(store.current_version().unwrap(), 3);
    }

    #[test]
    fn test_migration_failure_halts_and_keeps_lower_versions() {
        let tmp = TempDir::new().unwrap();
        write_migration(
            tmp.path(),
            "1",
            &[("a.sql", "CREATE TABLE Plant (id INTEGER PRIMARY KEY, label TEXT);")],
        );
        write_migration(tmp.path(), "2", &[("a.sql", "THIS IS NOT SQL;")]);

        let store = Store::open(MEMORY_PATH, StoreOptions::default()).unwrap();
        let err = store.migrate_up(tmp.path()).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::SqlError | ErrorKind::SqlSyntaxError
        ));
        assert_eq!(store.current_version().unwrap(), 1);
        assert_eq!(store.get_collections(), vec!["Plant".to_string()]);
    }

    #[test]
    fn test_migration_with_invalid_schema_rejected() {
        // Duplicate attribute between a main table and its vector companion
        // rolls the version back and fails the open.
        let tmp = TempDir::new().unwrap();
        write_migration(
            tmp.path(),
            "1",
            &[(
                "a.sql",
                "CREATE TABLE Plant (id INTEGER PRIMARY KEY, label TEXT, cost REAL);
                 CREATE TABLE Plant_vector_costs (id INTEGER, vector_index INTEGER, cost REAL,
                     FOREIGN KEY(id) REFERENCES Plant(id) ON DELETE CASCADE ON UPDATE CASCADE);",
            )],
        );

        let err = Store::from_migrations(MEMORY_PATH, tmp.path(), StoreOptions::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSchema);
        assert_eq!(err.context, "Plant_vector_costs");
    }

    #[test]
    fn test_from_schema_file() {
        let tmp = TempDir::new().unwrap();
        let schema_path = tmp.path().join("schema.sql");
        std::fs::write(&schema_path, SCHEMA).unwrap();

        let store = Store::from_schema(MEMORY_PATH, &schema_path, StoreOptions::default()).unwrap();
        assert_eq!(store.get_collections().len(), 2);
    }

    #[test]
    fn test_from_schema_rejects_invalid_ddl() {
        let tmp = TempDir::new().unwrap();
        let schema_path = tmp.path().join("schema.sql");
        std::fs::write(
            &schema_path,
            "CREATE TABLE Plant(id INTEGER PRIMARY KEY, label TEXT, cost REAL);
             CREATE TABLE Plant_vector_costs(id INTEGER, vector_index INTEGER, cost REAL,
                 FOREIGN KEY(id) REFERENCES Plant(id) ON DELETE CASCADE ON UPDATE CASCADE);",
        )
        .unwrap();

        let err = Store::from_schema(MEMORY_PATH, &schema_path, StoreOptions::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSchema);
        assert_eq!(err.context, "Plant_vector_costs");
        assert!(err.message.contains("cost"));
    }

    #[test]
    fn test_from_schema_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = Store::from_schema(
            MEMORY_PATH,
            &tmp.path().join("absent.sql"),
            StoreOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::FileNotFound);
    }

    #[test]
    fn test_read_only_store_rejects_mutations() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("store.db");
        let db_path = db_path.to_str().unwrap();

        {
            let store = Store::open(db_path, StoreOptions::default()).unwrap();
            store.apply_schema_text(SCHEMA).unwrap();
            store.create_element("Plant", &plant("P1", 50.0)).unwrap();
        }

        let store = Store::open(db_path, StoreOptions::read_only()).unwrap();
        assert_eq!(
            store.read_scalar_by_label("Plant", "capacity", "P1").unwrap(),
            Value::Real(50.0)
        );
        let err = store.create_element("Plant", &plant("P2", 1.0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_reopen_preserves_version_and_schema() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("store.db");
        let db_path = db_path.to_str().unwrap();

        {
            let store = Store::open(db_path, StoreOptions::default()).unwrap();
            store.apply_schema_text(SCHEMA).unwrap();
            store.set_version(5).unwrap();
        }

        let store = Store::open(db_path, StoreOptions::default()).unwrap();
        assert_eq!(store.current_version().unwrap(), 5);
        assert_eq!(store.get_collections().len(), 2);
    }

    #[test]
    fn test_time_series_file_roundtrip() {
        let store = test_store();
        assert_eq!(store.read_time_series_file("Plant", "generation").unwrap(), None);

        store
            .set_time_series_file("Plant", "generation", "data/generation.csv")
            .unwrap();
        assert_eq!(
            store.read_time_series_file("Plant", "generation").unwrap(),
            Some("data/generation.csv".to_string())
        );

        // Second write updates the single row.
        store
            .set_time_series_file("Plant", "generation", "data/generation_v2.csv")
            .unwrap();
        assert_eq!(
            store.read_time_series_file("Plant", "generation").unwrap(),
            Some("data/generation_v2.csv".to_string())
        );

        let err = store.read_time_series_file("Plant", "ghost").unwrap_err();
        assert_eq!(err.kind, ErrorKind::AttributeNotFound);
    }

    #[test]
    fn test_time_series_file_absolute_path() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("store.db");
        let store = Store::open(db_path.to_str().unwrap(), StoreOptions::default()).unwrap();
        store
            .apply_schema_text("CREATE TABLE Plant (id INTEGER PRIMARY KEY, label TEXT); CREATE TABLE Plant_files (generation TEXT);")
            .unwrap();
        store
            .set_time_series_file("Plant", "generation", "data/generation.csv")
            .unwrap();

        let absolute = store
            .time_series_file_absolute_path("Plant", "generation")
            .unwrap()
            .unwrap();
        assert_eq!(absolute, tmp.path().join("data/generation.csv"));
    }

    #[test]
    fn test_implicit_transaction_commits_per_call() {
        let store = test_store();
        assert!(!store.in_transaction());
        store.create_element("Plant", &plant("P1", 1.0)).unwrap();
        assert!(!store.in_transaction());
    }

    #[test]
    fn test_explicit_transaction_spans_calls() {
        let store = test_store();
        store.begin_transaction().unwrap();
        store.create_element("Plant", &plant("P1", 1.0)).unwrap();
        store.create_element("Plant", &plant("P2", 2.0)).unwrap();
        store.rollback().unwrap();
        assert!(store.get_element_ids("Plant").unwrap().is_empty());
    }
}
