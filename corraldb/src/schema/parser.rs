//! Shape validation of schema DDL.
//!
//! This is not a SQL parser. Statements are split and tokenised by a small
//! state machine over the character stream (quote tracking plus a
//! parenthesis depth counter); regexes are used only for the foreign-key
//! action vocabulary and the companion-name suffix tests.

use crate::error::{Result, StoreError};
use crate::schema::types::{ColumnDef, ForeignKeyDef, Schema, TableDef, TableKind};
use crate::value::ColumnType;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn foreign_key_action_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)FOREIGN\s+KEY\s*\([^)]+\)\s+REFERENCES\s+\w+\s*\(\s*\w+\s*\)\s+ON\s+DELETE\s+(CASCADE|SET\s+NULL|SET\s+DEFAULT|RESTRICT|NO\s+ACTION)\s+ON\s+UPDATE\s+(CASCADE|SET\s+NULL|SET\s+DEFAULT|RESTRICT|NO\s+ACTION)",
        )
        .unwrap()
    })
}

fn foreign_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)^FOREIGN\s+KEY\s*\(\s*"?(\w+)"?\s*\)\s+REFERENCES\s+"?(\w+)"?\s*\(\s*"?(\w+)"?\s*\)"#)
            .unwrap()
    })
}

/// Split SQL text into statements on `;`, respecting single- and
/// double-quoted literals (backslash escapes the quote character).
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut string_char = '\0';
    let mut prev = '\0';

    for c in sql.chars() {
        if (c == '\'' || c == '"') && prev != '\\' {
            if !in_string {
                in_string = true;
                string_char = c;
            } else if c == string_char {
                in_string = false;
            }
            current.push(c);
        } else if c == ';' && !in_string {
            let stmt = current.trim();
            if !stmt.is_empty() {
                statements.push(stmt.to_string());
            }
            current.clear();
        } else {
            current.push(c);
        }
        prev = c;
    }

    let stmt = current.trim();
    if !stmt.is_empty() {
        statements.push(stmt.to_string());
    }
    statements
}

// Split a CREATE TABLE body into its comma-separated entries, respecting
// parenthesis nesting so inline CHECK(...) and friends stay intact.
fn split_entries(body: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut string_char = '\0';
    let mut prev = '\0';

    for c in body.chars() {
        if (c == '\'' || c == '"') && prev != '\\' {
            if !in_string {
                in_string = true;
                string_char = c;
            } else if c == string_char {
                in_string = false;
            }
            current.push(c);
        } else if !in_string && c == '(' {
            depth += 1;
            current.push(c);
        } else if !in_string && c == ')' {
            depth -= 1;
            current.push(c);
        } else if !in_string && c == ',' && depth == 0 {
            let entry = current.trim();
            if !entry.is_empty() {
                entries.push(entry.to_string());
            }
            current.clear();
        } else {
            current.push(c);
        }
        prev = c;
    }

    let entry = current.trim();
    if !entry.is_empty() {
        entries.push(entry.to_string());
    }
    entries
}

// Table-level constraints are recognised by their leading keyword.
fn is_constraint_entry(entry: &str) -> bool {
    let upper = entry.to_ascii_uppercase();
    upper.starts_with("FOREIGN KEY")
        || upper.starts_with("PRIMARY KEY")
        || upper.starts_with("UNIQUE")
        || upper.starts_with("CHECK")
        || upper.starts_with("CONSTRAINT")
}

fn strip_quotes(token: &str) -> &str {
    let token = token.trim();
    if token.len() >= 2 {
        let bytes = token.as_bytes();
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"')
            || (first == b'\'' && last == b'\'')
            || (first == b'`' && last == b'`')
            || (first == b'[' && last == b']')
        {
            return &token[1..token.len() - 1];
        }
    }
    token
}

// Extract (table_name, body) from a CREATE TABLE statement, or None when the
// statement is something else (CREATE INDEX, PRAGMA, ...). The body is the
// text between the outermost parentheses.
fn parse_create_table(stmt: &str) -> Option<(String, String)> {
    let mut tokens = stmt.split_whitespace();
    if !tokens.next()?.eq_ignore_ascii_case("create") {
        return None;
    }
    if !tokens.next()?.eq_ignore_ascii_case("table") {
        return None;
    }

    // The table name runs up to the first opening parenthesis, possibly
    // preceded by IF NOT EXISTS.
    let open = stmt.find('(')?;
    let header = &stmt[..open];
    let mut words: Vec<&str> = header.split_whitespace().collect();
    // words = ["CREATE", "TABLE", ...name parts]
    words.drain(..2);
    if words.len() >= 3
        && words[0].eq_ignore_ascii_case("if")
        && words[1].eq_ignore_ascii_case("not")
        && words[2].eq_ignore_ascii_case("exists")
    {
        words.drain(..3);
    }
    let name = strip_quotes(words.last()?).to_string();
    if name.is_empty() {
        return None;
    }

    let close = stmt.rfind(')')?;
    if close <= open {
        return None;
    }
    Some((name, stmt[open + 1..close].to_string()))
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// Invariant: when ON DELETE is CASCADE, ON UPDATE must also be CASCADE.
fn validate_foreign_key_actions(table: &str, stmt: &str) -> Result<()> {
    for caps in foreign_key_action_pattern().captures_iter(stmt) {
        let delete_action = normalize_whitespace(&caps[1]).to_ascii_uppercase();
        let update_action = normalize_whitespace(&caps[2]).to_ascii_uppercase();
        if delete_action == "CASCADE" && update_action != "CASCADE" {
            return Err(StoreError::invalid_schema(
                format!(
                    "invalid foreign key actions: ON DELETE {delete_action} with ON UPDATE \
                     {update_action}; when ON DELETE is CASCADE, ON UPDATE must also be CASCADE"
                ),
                table,
            ));
        }
    }
    Ok(())
}

fn parse_table(name: &str, body: &str) -> Result<TableDef> {
    let kind = TableKind::classify(name);
    let mut columns = Vec::new();
    let mut foreign_keys = Vec::new();

    for entry in split_entries(body) {
        if is_constraint_entry(&entry) {
            if let Some(caps) = foreign_key_pattern().captures(&entry) {
                foreign_keys.push(ForeignKeyDef {
                    column: caps[1].to_ascii_lowercase(),
                    references_table: caps[2].to_string(),
                    references_column: caps[3].to_ascii_lowercase(),
                });
            }
            continue;
        }
        let mut tokens = entry.split_whitespace();
        let Some(first) = tokens.next() else { continue };
        let column_name = strip_quotes(first).to_ascii_lowercase();
        if column_name.is_empty() {
            continue;
        }
        let declared_type = tokens.next().unwrap_or("").to_string();
        let column_type = ColumnType::from_declared(&declared_type);
        columns.push(ColumnDef {
            name: column_name,
            declared_type,
            column_type,
        });
    }

    // Invariant: vector companions carry the ordering column.
    if matches!(kind, TableKind::Vector { .. }) {
        let ok = columns
            .iter()
            .any(|c| c.name == "vector_index" && c.column_type == ColumnType::Integer);
        if !ok {
            return Err(StoreError::invalid_schema(
                format!("vector table '{name}' must have a 'vector_index INTEGER' column"),
                name,
            ));
        }
    }

    // Invariant: main tables carry the label column. Companions, the
    // Configuration table and *_files tables are exempt.
    if kind.is_collection() && !columns.iter().any(|c| c.name == "label") {
        return Err(StoreError::invalid_schema(
            format!("collection table '{name}' must have a 'label' column"),
            name,
        ));
    }

    Ok(TableDef {
        name: name.to_string(),
        kind,
        columns,
        foreign_keys,
    })
}

// Invariant: no value column appears in both a main table and one of its
// vector/set companions.
fn check_duplicate_attributes(schema: &Schema) -> Result<()> {
    for table in schema.tables() {
        let parent_name = match &table.kind {
            TableKind::Vector { collection, .. } | TableKind::Set { collection, .. } => collection,
            _ => continue,
        };
        let Some(parent) = schema.table(parent_name) else {
            continue;
        };
        let parent_columns: BTreeSet<&str> =
            parent.value_columns().map(|c| c.name.as_str()).collect();
        for column in table.value_columns() {
            if parent_columns.contains(column.name.as_str()) {
                return Err(StoreError::invalid_schema(
                    format!(
                        "duplicated attribute '{}' found in both '{}' and '{}'",
                        column.name, parent_name, table.name
                    ),
                    &table.name,
                ));
            }
        }
    }
    Ok(())
}

/// Parse DDL text into a [`Schema`], rejecting the first structural
/// invariant violation with `InvalidSchema` naming the offending table.
pub fn parse_schema(sql: &str) -> Result<Schema> {
    let mut schema = Schema::new();

    for stmt in split_statements(sql) {
        let Some((name, body)) = parse_create_table(&stmt) else {
            continue;
        };
        validate_foreign_key_actions(&name, &stmt)?;
        let table = parse_table(&name, &body)?;
        schema.insert_table(table);
    }

    check_duplicate_attributes(&schema)?;
    Ok(schema)
}
