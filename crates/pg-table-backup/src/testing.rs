//! In-memory fakes for unit tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::traits::{RowReader, SchemaInspector, StatementExecutor, TableAction};
use crate::core::value::Row;
use crate::error::{BackupError, Result};

#[derive(Default)]
struct FakeTable {
    columns: Vec<String>,
    dependencies: BTreeSet<String>,
    rows: Vec<Row>,
}

/// A schema, its rows, and a journal of executed statements.
#[derive(Default)]
pub struct FakeDatabase {
    tables: BTreeMap<String, FakeTable>,
    broken: BTreeSet<String>,
    failing_statement: Option<String>,
    lookups: Mutex<Vec<String>>,
    journal: Mutex<Vec<String>>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, columns: &[&str], dependencies: &[&str]) -> Self {
        self.tables.insert(
            name.to_string(),
            FakeTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
                rows: Vec::new(),
            },
        );
        self
    }

    pub fn with_rows(mut self, name: &str, rows: Vec<Row>) -> Self {
        if let Some(table) = self.tables.get_mut(name) {
            table.rows = rows;
        }
        self
    }

    /// Metadata lookups for `name` fail.
    pub fn with_broken_metadata(mut self, name: &str) -> Self {
        self.broken.insert(name.to_string());
        self
    }

    /// Executing any statement containing `needle` fails.
    pub fn with_failing_statement(mut self, needle: &str) -> Self {
        self.failing_statement = Some(needle.to_string());
        self
    }

    pub fn dependency_lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    fn check_metadata(&self, table: &str) -> Result<()> {
        if self.broken.contains(table) {
            return Err(BackupError::schema_lookup(table, "metadata query failed"));
        }
        Ok(())
    }
}

#[async_trait]
impl SchemaInspector for FakeDatabase {
    async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        self.check_metadata(table)?;
        self.tables
            .get(table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| BackupError::schema_lookup(table, "table does not exist"))
    }

    async fn list_dependencies(&self, table: &str) -> Result<BTreeSet<String>> {
        self.lookups.lock().unwrap().push(table.to_string());
        self.check_metadata(table)?;
        Ok(self
            .tables
            .get(table)
            .map(|t| t.dependencies.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl RowReader for FakeDatabase {
    async fn read_rows(&self, table: &str, columns: &[String]) -> Result<Vec<Row>> {
        let fake = self
            .tables
            .get(table)
            .ok_or_else(|| BackupError::capture(table, "table does not exist"))?;
        assert_eq!(fake.columns, columns);
        Ok(fake.rows.clone())
    }
}

#[async_trait]
impl StatementExecutor for FakeDatabase {
    async fn begin(&self) -> Result<()> {
        self.journal.lock().unwrap().push("BEGIN".to_string());
        Ok(())
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        if let Some(needle) = &self.failing_statement {
            if sql.contains(needle.as_str()) {
                return Err(BackupError::connection(
                    "duplicate key value violates unique constraint",
                    "executing statement",
                ));
            }
        }
        self.journal.lock().unwrap().push(sql.to_string());
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.journal.lock().unwrap().push("COMMIT".to_string());
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.journal.lock().unwrap().push("ROLLBACK".to_string());
        Ok(())
    }
}

/// Records processed tables; optionally fails on one of them.
#[derive(Default)]
pub struct RecordingAction {
    pub processed: Vec<String>,
    fail_on: Option<String>,
}

impl RecordingAction {
    pub fn failing_on(table: &str) -> Self {
        Self {
            processed: Vec::new(),
            fail_on: Some(table.to_string()),
        }
    }
}

#[async_trait]
impl TableAction for RecordingAction {
    async fn process(&mut self, table: &str) -> Result<()> {
        if self.fail_on.as_deref() == Some(table) {
            return Err(BackupError::capture(table, "simulated failure"));
        }
        self.processed.push(table.to_string());
        Ok(())
    }
}
