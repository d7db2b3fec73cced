//! Capability traits the backup engine is written against.
//!
//! - [`SchemaInspector`]: column lists and foreign-key dependencies
//! - [`RowReader`]: full scans of a table's rows
//! - [`StatementExecutor`]: transactional execution of generated statements
//! - [`TableAction`]: what the walker does with each table, once
//!
//! The PostgreSQL session implements the first three; tests use in-memory
//! fakes so the traversal can be exercised without a database.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::Result;

use super::value::Row;

/// Read-only access to table metadata.
#[async_trait]
pub trait SchemaInspector: Send + Sync {
    /// List the columns of `table` in the database's natural column order.
    ///
    /// Fails with `SchemaLookup` if the table does not exist or the metadata
    /// query fails.
    async fn list_columns(&self, table: &str) -> Result<Vec<String>>;

    /// List the distinct tables referenced by `table`'s foreign keys.
    ///
    /// The `BTreeSet` fixes iteration order, so repeated walks against an
    /// unchanged schema visit dependencies identically. An empty set means
    /// the table references nothing.
    async fn list_dependencies(&self, table: &str) -> Result<BTreeSet<String>>;
}

/// Reads every row of a table.
#[async_trait]
pub trait RowReader: Send + Sync {
    /// Read all rows of `table`, values ordered like `columns`.
    ///
    /// The whole table is materialized; there is no pagination.
    async fn read_rows(&self, table: &str, columns: &[String]) -> Result<Vec<Row>>;
}

/// Executes parameterless SQL inside an explicit transaction.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Open a transaction.
    async fn begin(&self) -> Result<()>;

    /// Execute one statement.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Commit the open transaction.
    async fn commit(&self) -> Result<()>;

    /// Roll back the open transaction.
    async fn rollback(&self) -> Result<()>;
}

/// Per-table action driven by the dependency walker.
///
/// `process` is called exactly once per table per walk, after every table
/// it depends on has been processed.
#[async_trait]
pub trait TableAction: Send {
    async fn process(&mut self, table: &str) -> Result<()>;
}
