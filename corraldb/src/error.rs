use thiserror::Error;

/// Classification tag for store errors.
///
/// The tag survives across the facade boundary unchanged; adapter layers map
/// it onto stable integer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // Schema errors
    NoSchemaLoaded,
    CollectionNotFound,
    AttributeNotFound,
    InvalidSchema,

    // Type errors
    TypeMismatch,
    InvalidType,

    // Element errors
    ElementNotFound,
    DuplicateElement,
    EmptyElement,

    // Constraint errors
    ConstraintViolation,
    ForeignKeyViolation,
    UniqueViolation,
    NotNullViolation,

    // SQL errors
    SqlError,
    SqlSyntaxError,

    // IO errors
    FileNotFound,
    PermissionDenied,
    DiskFull,

    // Validation errors
    InvalidIdentifier,
    InvalidValue,

    // Internal errors
    InternalError,
    NotImplemented,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoSchemaLoaded => "no schema loaded",
            ErrorKind::CollectionNotFound => "collection not found",
            ErrorKind::AttributeNotFound => "attribute not found",
            ErrorKind::InvalidSchema => "invalid schema",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::InvalidType => "invalid type",
            ErrorKind::ElementNotFound => "element not found",
            ErrorKind::DuplicateElement => "duplicate element",
            ErrorKind::EmptyElement => "empty element",
            ErrorKind::ConstraintViolation => "constraint violation",
            ErrorKind::ForeignKeyViolation => "foreign key violation",
            ErrorKind::UniqueViolation => "unique violation",
            ErrorKind::NotNullViolation => "not null violation",
            ErrorKind::SqlError => "sql error",
            ErrorKind::SqlSyntaxError => "sql syntax error",
            ErrorKind::FileNotFound => "file not found",
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::DiskFull => "disk full",
            ErrorKind::InvalidIdentifier => "invalid identifier",
            ErrorKind::InvalidValue => "invalid value",
            ErrorKind::InternalError => "internal error",
            ErrorKind::NotImplemented => "not implemented",
        }
    }
}

/// Error information for store operations: a kind tag, a human-readable
/// message, and a short context phrase such as `"collection 'Plant'"` or
/// `"column 'cost'"`.
#[derive(Error, Debug, Clone)]
#[error("{}", render(.kind, .message, .context))]
pub struct StoreError {
    pub kind: ErrorKind,
    pub message: String,
    pub context: String,
}

impl StoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        StoreError {
            kind,
            message: message.into(),
            context: String::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    // Shorthand constructors for the kinds the facade raises directly.

    pub fn collection_not_found(collection: &str) -> Self {
        StoreError::new(
            ErrorKind::CollectionNotFound,
            format!("collection '{collection}' does not exist"),
        )
        .with_context(format!("collection '{collection}'"))
    }

    pub fn attribute_not_found(collection: &str, attribute: &str) -> Self {
        StoreError::new(
            ErrorKind::AttributeNotFound,
            format!("attribute '{attribute}' does not exist in collection '{collection}'"),
        )
        .with_context(format!("column '{attribute}'"))
    }

    pub fn element_not_found(collection: &str, label: &str) -> Self {
        StoreError::new(
            ErrorKind::ElementNotFound,
            format!("no element labelled '{label}' in collection '{collection}'"),
        )
        .with_context(format!("collection '{collection}'"))
    }

    pub fn invalid_schema(message: impl Into<String>, table: &str) -> Self {
        StoreError::new(ErrorKind::InvalidSchema, message).with_context(table.to_string())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        StoreError::new(ErrorKind::InternalError, message)
    }
}

fn render(kind: &ErrorKind, message: &str, context: &str) -> String {
    if context.is_empty() {
        format!("{}: {}", kind.as_str(), message)
    } else {
        format!("{}: {} ({})", kind.as_str(), message, context)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ffi::ErrorCode;

        let kind = match &err {
            rusqlite::Error::SqliteFailure(e, _) => match e.code {
                ErrorCode::ConstraintViolation => refine_constraint(e.extended_code),
                ErrorCode::CannotOpen | ErrorCode::NotFound => ErrorKind::FileNotFound,
                ErrorCode::PermissionDenied | ErrorCode::ReadOnly => ErrorKind::PermissionDenied,
                ErrorCode::DiskFull => ErrorKind::DiskFull,
                _ => ErrorKind::SqlError,
            },
            rusqlite::Error::SqlInputError { .. } => ErrorKind::SqlSyntaxError,
            rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::InvalidColumnIndex(_)
            | rusqlite::Error::InvalidColumnName(_) => ErrorKind::InvalidType,
            _ => ErrorKind::SqlError,
        };

        StoreError::new(kind, err.to_string())
    }
}

// SQLite extended result codes carry the specific constraint class.
fn refine_constraint(extended_code: std::os::raw::c_int) -> ErrorKind {
    use rusqlite::ffi;

    match extended_code {
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ErrorKind::ForeignKeyViolation,
        ffi::SQLITE_CONSTRAINT_NOTNULL => ErrorKind::NotNullViolation,
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            ErrorKind::UniqueViolation
        }
        _ => ErrorKind::ConstraintViolation,
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::SqlError,
        };
        StoreError::new(kind, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_context() {
        let err = StoreError::new(ErrorKind::TypeMismatch, "expected REAL, got TEXT")
            .with_context("column 'cost'");
        let text = err.to_string();
        assert!(text.contains("type mismatch"));
        assert!(text.contains("column 'cost'"));
    }

    #[test]
    fn test_display_without_context() {
        let err = StoreError::new(ErrorKind::SqlError, "boom");
        assert_eq!(err.to_string(), "sql error: boom");
    }

    #[test]
    fn test_element_not_found_context() {
        let err = StoreError::element_not_found("Plant", "P9");
        assert_eq!(err.kind, ErrorKind::ElementNotFound);
        assert_eq!(err.context, "collection 'Plant'");
        assert!(err.message.contains("P9"));
    }

    #[test]
    fn test_constraint_refinement() {
        assert_eq!(refine_constraint(787), ErrorKind::ForeignKeyViolation);
        assert_eq!(refine_constraint(1299), ErrorKind::NotNullViolation);
        assert_eq!(refine_constraint(2067), ErrorKind::UniqueViolation);
        assert_eq!(refine_constraint(1555), ErrorKind::UniqueViolation);
        assert_eq!(refine_constraint(1), ErrorKind::ConstraintViolation);
    }
}
