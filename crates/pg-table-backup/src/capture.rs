//! Backup: render each table's rows as replayable `INSERT` statements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::core::identifier::quote_pg;
use crate::core::traits::{RowReader, SchemaInspector, TableAction};
use crate::core::value::SqlValue;
use crate::error::{BackupError, Result};

/// Rows written for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCapture {
    pub table: String,
    pub rows: u64,
}

/// Walker action that appends every processed table's rows to one sink.
///
/// The sink is shared by the whole run, so the artifact holds the tables in
/// walk order. Statements are flushed once per table; if a later table fails,
/// earlier tables' statements stay in the sink.
pub struct CaptureAction<'a, D: ?Sized, W> {
    db: &'a D,
    sink: W,
    captured: Vec<TableCapture>,
}

impl<'a, D, W> CaptureAction<'a, D, W>
where
    D: SchemaInspector + RowReader + ?Sized,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(db: &'a D, sink: W) -> Self {
        Self {
            db,
            sink,
            captured: Vec::new(),
        }
    }

    /// Tables captured so far, in walk order.
    pub fn captured(&self) -> &[TableCapture] {
        &self.captured
    }

    /// Flush the sink and hand it back with the per-table counts.
    pub async fn finish(mut self) -> Result<(W, Vec<TableCapture>)> {
        self.sink.flush().await?;
        Ok((self.sink, self.captured))
    }
}

#[async_trait]
impl<'a, D, W> TableAction for CaptureAction<'a, D, W>
where
    D: SchemaInspector + RowReader + ?Sized,
    W: AsyncWrite + Unpin + Send,
{
    async fn process(&mut self, table: &str) -> Result<()> {
        let columns = self.db.list_columns(table).await?;
        let rows = self
            .db
            .read_rows(table, &columns)
            .await
            .map_err(|e| match e {
                BackupError::Capture { .. } => e,
                other => BackupError::capture(table, other),
            })?;
        debug!("Read {} row(s) from {}", rows.len(), table);

        let prefix = insert_prefix(table, &columns)?;
        let mut statements = String::new();
        for row in &rows {
            if row.len() != columns.len() {
                return Err(BackupError::capture(
                    table,
                    format!(
                        "row has {} values but the table has {} columns",
                        row.len(),
                        columns.len()
                    ),
                ));
            }
            push_statement(&mut statements, &prefix, row);
        }

        self.sink
            .write_all(statements.as_bytes())
            .await
            .map_err(|e| BackupError::capture(table, format!("writing statements: {}", e)))?;
        self.sink
            .flush()
            .await
            .map_err(|e| BackupError::capture(table, format!("flushing statements: {}", e)))?;

        info!("Captured {} row(s) from {}", rows.len(), table);
        self.captured.push(TableCapture {
            table: table.to_string(),
            rows: rows.len() as u64,
        });
        Ok(())
    }
}

/// Render one row as a newline-terminated `INSERT` statement.
///
/// Values are paired with `columns` by position.
pub fn render_insert(table: &str, columns: &[String], row: &[SqlValue]) -> Result<String> {
    if row.len() != columns.len() {
        return Err(BackupError::capture(
            table,
            format!("{} values for {} columns", row.len(), columns.len()),
        ));
    }
    let mut out = String::new();
    push_statement(&mut out, &insert_prefix(table, columns)?, row);
    Ok(out)
}

/// `INSERT INTO "table" ("a", "b") VALUES (`
fn insert_prefix(table: &str, columns: &[String]) -> Result<String> {
    let quoted_table = quote_pg(table).map_err(|e| BackupError::capture(table, e))?;
    let quoted_columns = columns
        .iter()
        .map(|c| quote_pg(c))
        .collect::<Result<Vec<_>>>()
        .map_err(|e| BackupError::capture(table, e))?;
    Ok(format!(
        "INSERT INTO {} ({}) VALUES (",
        quoted_table,
        quoted_columns.join(", ")
    ))
}

fn push_statement(out: &mut String, prefix: &str, row: &[SqlValue]) {
    out.push_str(prefix);
    for (i, value) in row.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&value.to_pg_literal());
    }
    out.push_str(");\n");
}
