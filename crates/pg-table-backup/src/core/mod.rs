//! Core abstractions shared by the walker, the actions, and the drivers.
//!
//! - [`identifier`]: identifier validation and quoting
//! - [`value`]: dynamically typed column values and literal rendering
//! - [`traits`]: capability traits for metadata, rows, execution, and actions

pub mod identifier;
pub mod traits;
pub mod value;

pub use traits::{RowReader, SchemaInspector, StatementExecutor, TableAction};
pub use value::{Row, SqlValue};
