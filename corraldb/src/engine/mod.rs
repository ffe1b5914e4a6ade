use crate::error::{ErrorKind, Result, StoreError};
use crate::value::{Rows, Value};
use rusqlite::{Connection, OpenFlags};
use std::cell::Cell;
use std::path::Path;

/// In-memory store path sentinel, as the engine spells it.
pub const MEMORY_PATH: &str = ":memory:";

/// Ownership wrapper around the SQLite connection.
///
/// One engine per store handle; not shared between threads. Transaction
/// state is tracked here so the facade can open implicit transactions and
/// reject nested `begin`.
#[derive(Debug)]
pub struct Engine {
    conn: Connection,
    path: String,
    in_transaction: Cell<bool>,
}

impl Engine {
    /// Open (or create) the store file, or an ephemeral store for
    /// `":memory:"`. Foreign-key enforcement is switched on for the
    /// connection so companion rows follow their main row.
    pub fn open(path: &str, read_only: bool) -> Result<Self> {
        let conn = if path == MEMORY_PATH {
            Connection::open_in_memory()?
        } else if read_only {
            Connection::open_with_flags(
                Path::new(path),
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            Connection::open(Path::new(path))?
        };
        conn.execute_batch("PRAGMA foreign_keys = ON")?;

        Ok(Engine {
            conn,
            path: path.to_string(),
            in_transaction: Cell::new(false),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_memory(&self) -> bool {
        self.path == MEMORY_PATH
    }

    /// Execute one statement with positional parameters, materialising any
    /// result rows.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<Rows> {
        let engine_params: Vec<rusqlite::types::Value> = params
            .iter()
            .map(Value::to_engine)
            .collect::<Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(sql)?;
        if stmt.column_count() == 0 {
            stmt.execute(rusqlite::params_from_iter(engine_params.iter()))?;
            return Ok(Rows::default());
        }

        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut rows = Vec::new();
        let mut result = stmt.query(rusqlite::params_from_iter(engine_params.iter()))?;
        while let Some(row) = result.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let v: rusqlite::types::Value = row.get(i)?;
                values.push(Value::from(v));
            }
            rows.push(values);
        }
        Ok(Rows::new(columns, rows))
    }

    /// Execute multiple semicolon-separated statements without results.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    pub fn changes(&self) -> usize {
        self.conn.changes() as usize
    }

    // ── Transactions ─────────────────────────────────────────────────

    pub fn in_transaction(&self) -> bool {
        self.in_transaction.get()
    }

    pub fn begin(&self) -> Result<()> {
        if self.in_transaction.get() {
            return Err(StoreError::new(
                ErrorKind::SqlError,
                "a transaction is already active; use a savepoint for nesting",
            ));
        }
        self.conn.execute_batch("BEGIN TRANSACTION")?;
        self.in_transaction.set(true);
        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        if !self.in_transaction.get() {
            return Err(StoreError::new(ErrorKind::SqlError, "no active transaction to commit"));
        }
        self.conn.execute_batch("COMMIT")?;
        self.in_transaction.set(false);
        Ok(())
    }

    pub fn rollback(&self) -> Result<()> {
        if !self.in_transaction.get() {
            return Err(StoreError::new(
                ErrorKind::SqlError,
                "no active transaction to roll back",
            ));
        }
        self.conn.execute_batch("ROLLBACK")?;
        self.in_transaction.set(false);
        Ok(())
    }

    pub fn savepoint(&self, name: &str) -> Result<()> {
        self.conn.execute_batch(&format!("SAVEPOINT \"{name}\""))?;
        Ok(())
    }

    pub fn release_savepoint(&self, name: &str) -> Result<()> {
        self.conn.execute_batch(&format!("RELEASE SAVEPOINT \"{name}\""))?;
        Ok(())
    }

    pub fn rollback_to_savepoint(&self, name: &str) -> Result<()> {
        self.conn
            .execute_batch(&format!("ROLLBACK TO SAVEPOINT \"{name}\""))?;
        Ok(())
    }

    // ── Version slot ─────────────────────────────────────────────────

    /// The persisted store version, kept in the engine's schema-version
    /// slot (`PRAGMA user_version`).
    pub fn version(&self) -> Result<i64> {
        let v = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))?;
        Ok(v)
    }

    pub fn set_version(&self, version: i64) -> Result<()> {
        if version < 0 {
            return Err(StoreError::new(
                ErrorKind::InvalidValue,
                format!("version must be non-negative, got {version}"),
            ));
        }
        self.conn
            .execute_batch(&format!("PRAGMA user_version = {version}"))?;
        Ok(())
    }

    // ── Introspection ────────────────────────────────────────────────

    /// The DDL of every user table, as recorded by the engine. Used to
    /// rebuild the schema model for an already-populated store.
    pub fn table_ddl(&self) -> Result<String> {
        let mut stmt = self.conn.prepare(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND sql IS NOT NULL",
        )?;
        let mut ddl = String::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let sql: String = row.get(0)?;
            ddl.push_str(&sql);
            ddl.push_str(";\n");
        }
        Ok(ddl)
    }
}
