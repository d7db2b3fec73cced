//! Backup then restore through an in-memory database.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use pg_table_backup::apply::{self, script, ApplyAction};
use pg_table_backup::capture::CaptureAction;
use pg_table_backup::core::{Row, RowReader, SchemaInspector, SqlValue, StatementExecutor};
use pg_table_backup::{BackupError, Result, Walker};

struct Table {
    columns: Vec<String>,
    references: BTreeSet<String>,
    rows: Vec<Row>,
}

#[derive(Default)]
struct MemoryDb {
    tables: BTreeMap<String, Table>,
    executed: Mutex<Vec<String>>,
}

impl MemoryDb {
    fn table(mut self, name: &str, columns: &[&str], references: &[&str], rows: Vec<Row>) -> Self {
        self.tables.insert(
            name.to_string(),
            Table {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                references: references.iter().map(|r| r.to_string()).collect(),
                rows,
            },
        );
        self
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SchemaInspector for MemoryDb {
    async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        self.tables
            .get(table)
            .map(|t| t.columns.clone())
            .ok_or_else(|| BackupError::schema_lookup(table, "table does not exist"))
    }

    async fn list_dependencies(&self, table: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.references.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl RowReader for MemoryDb {
    async fn read_rows(&self, table: &str, _columns: &[String]) -> Result<Vec<Row>> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl StatementExecutor for MemoryDb {
    async fn begin(&self) -> Result<()> {
        Ok(())
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.executed.lock().unwrap().clear();
        Ok(())
    }
}

fn shop() -> MemoryDb {
    MemoryDb::default()
        .table(
            "customers",
            &["id", "name"],
            &[],
            vec![
                vec![SqlValue::I32(1), SqlValue::from("Ada; Lovelace")],
                vec![SqlValue::I32(2), SqlValue::from("O'Brien")],
            ],
        )
        .table(
            "orders",
            &["id", "customer_id", "note"],
            &["customers"],
            vec![
                vec![SqlValue::I64(10), SqlValue::I32(1), SqlValue::Null],
                vec![SqlValue::I64(11), SqlValue::I32(2), SqlValue::from("line\nbreak")],
            ],
        )
}

async fn backup(db: &MemoryDb, tables: &[&str]) -> Result<(Vec<String>, String)> {
    let requested: Vec<String> = tables.iter().map(|t| t.to_string()).collect();
    let mut action = CaptureAction::new(db, Vec::new());
    let walked = Walker::new(db).walk(&requested, &mut action).await;
    let (sink, _) = action.finish().await?;
    let text = String::from_utf8(sink).unwrap();
    walked.map(|report| (report.order, text))
}

#[tokio::test]
async fn test_backup_writes_dependencies_first() {
    let db = shop();
    let (order, artifact) = backup(&db, &["orders"]).await.unwrap();

    assert_eq!(order, ["customers", "orders"]);
    let lines: Vec<&str> = artifact.lines().collect();
    assert!(lines[0].starts_with("INSERT INTO \"customers\""));
    assert!(artifact.contains("'Ada; Lovelace'"));
    assert!(artifact.contains("'O''Brien'"));
    assert!(artifact.contains("(10, 1, NULL)"));

    let first_order = artifact.find("INSERT INTO \"orders\"").unwrap();
    let last_customer = artifact.rfind("INSERT INTO \"customers\"").unwrap();
    assert!(last_customer < first_order);
}

#[tokio::test]
async fn test_restore_replays_captured_statements() {
    let source = shop();
    let (_, artifact) = backup(&source, &["orders"]).await.unwrap();

    let statements = script::parse(&artifact).unwrap();
    assert_eq!(statements.len(), 4);

    let target = shop();
    let requested = vec!["orders".to_string()];
    let mut action = ApplyAction::new(&target);
    let report = Walker::new(&target).walk(&requested, &mut action).await.unwrap();
    apply::validate_order(&statements, &report).unwrap();

    let applied = apply::apply_statements(&target, &statements).await.unwrap();
    assert_eq!(applied.len(), 2);

    let expected: Vec<String> = statements.iter().map(|s| s.sql.clone()).collect();
    assert_eq!(target.executed(), expected);
    assert!(target.executed()[3].contains("'line\nbreak'"));
}

#[tokio::test]
async fn test_missing_table_writes_nothing() {
    let db = shop();
    let err = backup(&db, &["invoices"]).await.unwrap_err();

    assert!(matches!(err, BackupError::SchemaLookup { ref table, .. } if table == "invoices"));
}

#[tokio::test]
async fn test_missing_table_leaves_sink_empty() {
    let db = shop();
    let requested = vec!["invoices".to_string()];
    let mut action = CaptureAction::new(&db, Vec::new());
    assert!(Walker::new(&db).walk(&requested, &mut action).await.is_err());

    let (sink, captured) = action.finish().await.unwrap();
    assert!(sink.is_empty());
    assert!(captured.is_empty());
}
