pub mod diff;
pub mod element;
pub mod engine;
pub mod error;
pub mod migration;
pub mod schema;
pub mod store;
pub mod transaction;
pub mod typecheck;
pub mod validation;
pub mod value;

pub use element::{Element, TimeSeries};
pub use error::{ErrorKind, Result, StoreError};
pub use schema::Schema;
pub use store::{LogLevel, Store, StoreOptions};
pub use transaction::{Savepoint, Transaction};
pub use value::{ColumnType, Rows, Value};
