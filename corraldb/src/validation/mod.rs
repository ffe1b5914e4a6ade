use crate::error::{ErrorKind, Result, StoreError};

/// Identifiers longer than this are rejected everywhere they are accepted
/// from callers (collection, attribute and savepoint names).
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

// Closed set of SQL keywords that must not be used as identifiers.
const RESERVED_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TABLE", "INDEX", "VIEW",
    "FROM", "WHERE", "JOIN", "INNER", "OUTER", "LEFT", "RIGHT", "ON", "AND", "OR", "NOT", "NULL",
    "IS", "IN", "LIKE", "BETWEEN", "EXISTS", "UNION", "ALL", "DISTINCT", "ORDER", "BY", "GROUP",
    "HAVING", "LIMIT", "OFFSET", "ASC", "DESC", "AS", "CASE", "WHEN", "THEN", "ELSE", "END",
    "BEGIN", "COMMIT", "ROLLBACK", "PRAGMA", "STRICT",
];

/// Whether `identifier` is a syntactically valid table/column name: starts
/// with a letter or underscore, continues with alphanumerics or underscores,
/// and is between 1 and 128 characters.
pub fn is_valid_identifier(identifier: &str) -> bool {
    if identifier.is_empty() || identifier.len() > MAX_IDENTIFIER_LENGTH {
        return false;
    }
    let mut chars = identifier.chars();
    let first = chars.next().unwrap();
    if !first.is_ascii_alphabetic() && first != '_' {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn is_reserved_keyword(word: &str) -> bool {
    let upper = word.to_ascii_uppercase();
    RESERVED_KEYWORDS.iter().any(|kw| *kw == upper)
}

/// Validate an identifier supplied by a caller, rejecting malformed names
/// and reserved keywords before any SQL is built from them.
pub fn validate_identifier(identifier: &str, context: &str) -> Result<()> {
    if !is_valid_identifier(identifier) {
        return Err(StoreError::new(
            ErrorKind::InvalidIdentifier,
            format!(
                "invalid identifier '{identifier}': must start with a letter or underscore, \
                 contain only alphanumerics and underscores, and be at most {MAX_IDENTIFIER_LENGTH} characters"
            ),
        )
        .with_context(context.to_string()));
    }
    if is_reserved_keyword(identifier) {
        return Err(StoreError::new(
            ErrorKind::InvalidIdentifier,
            format!("reserved SQL keyword cannot be used as an identifier: '{identifier}'"),
        )
        .with_context(context.to_string()));
    }
    Ok(())
}

/// Validate an engine-assigned element id (always positive).
pub fn validate_id(id: i64, context: &str) -> Result<()> {
    if id <= 0 {
        return Err(StoreError::new(
            ErrorKind::InvalidValue,
            format!("invalid id {id}: must be positive"),
        )
        .with_context(context.to_string()));
    }
    Ok(())
}
