pub mod parser;
pub mod types;

pub use parser::parse_schema;
pub use types::{ColumnDef, ForeignKeyDef, Schema, TableDef, TableKind};
