//! Restore: replay a backup artifact in one transaction.
//!
//! The artifact is parsed once ([`script::parse`]) and executed exactly once,
//! whatever number of tables it covers. The dependency walk over the
//! requested tables does not execute anything: [`ApplyAction`] confirms each
//! table exists in the target, and the resulting [`WalkReport`] is used by
//! [`validate_order`] to check that no table's rows come after the rows of a
//! table that depends on it. Only then does [`apply_statements`] run the
//! statements between `BEGIN` and `COMMIT`, rolling back on the first failure.

pub mod script;

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::traits::{SchemaInspector, StatementExecutor, TableAction};
use crate::error::{BackupError, Result};
use crate::walker::WalkReport;

pub use script::Statement;

/// Walker action for restores: checks every table of the closure exists.
pub struct ApplyAction<'a, I: ?Sized> {
    inspector: &'a I,
    verified: Vec<String>,
}

impl<'a, I: SchemaInspector + ?Sized> ApplyAction<'a, I> {
    pub fn new(inspector: &'a I) -> Self {
        Self {
            inspector,
            verified: Vec::new(),
        }
    }

    /// Tables confirmed present in the target, in walk order.
    pub fn verified(&self) -> &[String] {
        &self.verified
    }
}

#[async_trait]
impl<'a, I: SchemaInspector + ?Sized> TableAction for ApplyAction<'a, I> {
    async fn process(&mut self, table: &str) -> Result<()> {
        let columns = self.inspector.list_columns(table).await?;
        debug!("Restore target {} has {} column(s)", table, columns.len());
        self.verified.push(table.to_string());
        Ok(())
    }
}

/// Statements executed for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableApply {
    pub table: String,
    pub statements: u64,
}

/// Check that the artifact only touches walked tables, in a dependency-safe order.
pub fn validate_order(statements: &[Statement], report: &WalkReport) -> Result<()> {
    let mut dependents: HashMap<&str, BTreeSet<String>> = HashMap::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for stmt in statements {
        let table = stmt.table.as_str();
        if !report.contains(table) {
            return Err(BackupError::apply(
                table,
                format!(
                    "statement at line {} targets a table outside the requested tables and their dependencies",
                    stmt.line
                ),
            ));
        }

        let table_dependents = dependents
            .entry(table)
            .or_insert_with(|| report.dependents_of(table));
        if let Some(dependent) = table_dependents.iter().find(|d| seen.contains(d.as_str())) {
            return Err(BackupError::apply(
                table,
                format!(
                    "rows at line {} appear after rows of {}, which depends on {}",
                    stmt.line, dependent, table
                ),
            ));
        }
        seen.insert(table);
    }

    debug!(
        "Artifact order validated: {} statement(s) over {} table(s)",
        statements.len(),
        seen.len()
    );
    Ok(())
}

/// Execute every statement in one transaction.
///
/// Commits only if every statement succeeds; otherwise rolls back and
/// reports the failing statement.
pub async fn apply_statements<E>(executor: &E, statements: &[Statement]) -> Result<Vec<TableApply>>
where
    E: StatementExecutor + ?Sized,
{
    if statements.is_empty() {
        warn!("Artifact contains no statements; nothing to restore");
    }

    executor
        .begin()
        .await
        .map_err(|e| BackupError::connection(e, "opening restore transaction"))?;

    for (index, stmt) in statements.iter().enumerate() {
        if let Err(e) = executor.execute(&stmt.sql).await {
            if let Err(rollback_err) = executor.rollback().await {
                warn!("Rollback after failed statement also failed: {}", rollback_err);
            }
            return Err(BackupError::apply(
                &stmt.table,
                format!(
                    "statement {} (line {}) failed, transaction rolled back: {}",
                    index + 1,
                    stmt.line,
                    e
                ),
            ));
        }
    }

    let per_table = count_per_table(statements);
    if let Err(e) = executor.commit().await {
        if let Err(rollback_err) = executor.rollback().await {
            warn!("Rollback after failed commit also failed: {}", rollback_err);
        }
        let tables: Vec<&str> = per_table.iter().map(|t| t.table.as_str()).collect();
        return Err(BackupError::apply(
            tables.join(", "),
            format!("commit failed, transaction rolled back: {}", e),
        ));
    }

    info!(
        "Restored {} statement(s) across {} table(s)",
        statements.len(),
        per_table.len()
    );
    Ok(per_table)
}

/// Statement counts per table, in order of first appearance.
fn count_per_table(statements: &[Statement]) -> Vec<TableApply> {
    let mut counts: Vec<TableApply> = Vec::new();
    for stmt in statements {
        match counts.iter_mut().find(|c| c.table == stmt.table) {
            Some(entry) => entry.statements += 1,
            None => counts.push(TableApply {
                table: stmt.table.clone(),
                statements: 1,
            }),
        }
    }
    counts
}
