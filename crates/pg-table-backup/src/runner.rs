//! Run orchestration: one backup, restore or health check per call.
//!
//! A run opens a [`PgSession`] and the artifact file, drives the
//! [`Walker`] with the matching action, and always closes the session
//! before returning, whether the run succeeded or not. An overwriting
//! backup writes to a staging file that replaces the artifact only once
//! every table has been captured.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::BufWriter;
use tracing::{debug, info, warn};

use crate::apply::{self, script, ApplyAction, TableApply};
use crate::capture::{CaptureAction, TableCapture};
use crate::config::Config;
use crate::core::traits::{RowReader, SchemaInspector, TableAction};
use crate::drivers::PgSession;
use crate::error::{BackupError, Result};
use crate::walker::{WalkReport, Walker};

/// Summary of a finished backup or restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Unique run identifier.
    pub run_id: String,

    /// `backup` or `restore`.
    pub command: String,

    /// Final status.
    pub status: String,

    /// Whether the run only planned (no rows read or written).
    pub dry_run: bool,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Artifact path.
    pub file: PathBuf,

    /// Processed tables, dependencies first.
    pub tables: Vec<String>,

    /// Direct dependencies of each processed table.
    pub dependencies: BTreeMap<String, Vec<String>>,

    /// Rows written per table (backup).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captured: Vec<TableCapture>,

    /// Statements executed per table (restore).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied: Vec<TableApply>,
}

impl RunResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rows written (backup) or statements executed (restore).
    pub fn total(&self) -> u64 {
        self.captured.iter().map(|c| c.rows).sum::<u64>()
            + self.applied.iter().map(|a| a.statements).sum::<u64>()
    }
}

/// Outcome of `health-check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub connected: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub healthy: bool,
}

/// Walker action for dry runs: confirms each table exists and nothing else.
pub struct PlanAction<'a, I: ?Sized> {
    inspector: &'a I,
    planned: Vec<String>,
}

impl<'a, I: SchemaInspector + ?Sized> PlanAction<'a, I> {
    pub fn new(inspector: &'a I) -> Self {
        Self {
            inspector,
            planned: Vec::new(),
        }
    }

    pub fn planned(&self) -> &[String] {
        &self.planned
    }
}

#[async_trait]
impl<'a, I: SchemaInspector + ?Sized> TableAction for PlanAction<'a, I> {
    async fn process(&mut self, table: &str) -> Result<()> {
        let columns = self.inspector.list_columns(table).await?;
        info!("Would capture {} ({} columns)", table, columns.len());
        self.planned.push(table.to_string());
        Ok(())
    }
}

/// Executes runs for one validated configuration.
pub struct Runner {
    config: Config,
}

struct RunClock {
    run_id: String,
    started_at: DateTime<Utc>,
}

impl RunClock {
    fn start(command: &str) -> Self {
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting {} run: {}", command, run_id);
        Self {
            run_id,
            started_at: Utc::now(),
        }
    }

    fn finish(self, command: &str, dry_run: bool, file: &Path, report: WalkReport) -> RunResult {
        let completed_at = Utc::now();
        let duration = (completed_at - self.started_at).num_milliseconds() as f64 / 1000.0;
        RunResult {
            run_id: self.run_id,
            command: command.to_string(),
            status: if dry_run { "planned" } else { "completed" }.to_string(),
            dry_run,
            started_at: self.started_at,
            completed_at,
            duration_seconds: duration,
            file: file.to_path_buf(),
            tables: report.order,
            dependencies: report.dependencies,
            captured: Vec::new(),
            applied: Vec::new(),
        }
    }
}

impl Runner {
    /// Create a runner; fails if the configuration cannot drive a backup or restore.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        config.backup.validate()?;
        Ok(Self { config })
    }

    /// Create a runner that only needs connection settings.
    pub fn for_health_check(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn artifact_path(&self) -> Result<&Path> {
        self.config
            .backup
            .file
            .as_deref()
            .ok_or_else(|| BackupError::Config("backup.file is required".into()))
    }

    /// Capture the requested tables and everything they depend on.
    pub async fn backup(&self, dry_run: bool) -> Result<RunResult> {
        let clock = RunClock::start("backup");
        let path = self.artifact_path()?;
        let tables = &self.config.backup.tables;

        if dry_run {
            let session = PgSession::connect(&self.config.database).await?;
            let mut action = PlanAction::new(&session);
            let outcome = Walker::new(&session).walk(tables, &mut action).await;
            session.close();
            let report = outcome?;
            return Ok(clock.finish("backup", true, path, report));
        }

        let session = PgSession::connect(&self.config.database).await?;
        let outcome = write_artifact(
            &session,
            tables,
            path,
            self.config.backup.overwrite,
            &clock.run_id,
        )
        .await;
        session.close();
        let (report, captured) = outcome?;

        let mut result = clock.finish("backup", false, path, report);
        result.captured = captured;
        info!(
            "Backup {}: {} table(s), {} row(s) in {:.1}s -> {}",
            result.status,
            result.tables.len(),
            result.total(),
            result.duration_seconds,
            path.display()
        );
        Ok(result)
    }

    /// Replay the artifact for the requested tables in one transaction.
    pub async fn restore(&self, dry_run: bool) -> Result<RunResult> {
        let clock = RunClock::start("restore");
        let path = self.artifact_path()?;

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BackupError::file(path, e))?;
        let statements = script::parse(&text)?;
        info!(
            "Parsed {} statement(s) from {}",
            statements.len(),
            path.display()
        );

        let session = PgSession::connect(&self.config.database).await?;
        let outcome = restore_tables(&session, &self.config.backup.tables, &statements, dry_run).await;
        session.close();
        let (report, applied) = outcome?;

        let mut result = clock.finish("restore", dry_run, path, report);
        result.applied = applied;
        info!(
            "Restore {}: {} table(s), {} statement(s) in {:.1}s",
            result.status,
            result.tables.len(),
            result.total(),
            result.duration_seconds
        );
        Ok(result)
    }

    /// Connect, query the server version and report latency.
    pub async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let outcome = match PgSession::connect(&self.config.database).await {
            Ok(session) => {
                let version = session.ping().await;
                session.close();
                version
            }
            Err(e) => Err(e),
        };
        let latency_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(version) => HealthCheckResult {
                connected: true,
                latency_ms,
                server_version: Some(version),
                error: None,
                healthy: true,
            },
            Err(e) => HealthCheckResult {
                connected: false,
                latency_ms,
                server_version: None,
                error: Some(e.to_string()),
                healthy: false,
            },
        }
    }
}

/// Capture `tables` into the artifact at `path`.
///
/// Appends by default. With `overwrite`, rows go to a sibling staging file
/// that is renamed over `path` on success and removed on failure, so a
/// failed run leaves the previous artifact untouched.
async fn write_artifact<D>(
    db: &D,
    tables: &[String],
    path: &Path,
    overwrite: bool,
    run_id: &str,
) -> Result<(WalkReport, Vec<TableCapture>)>
where
    D: SchemaInspector + RowReader + ?Sized,
{
    if !overwrite {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| BackupError::file(path, e))?;
        debug!("Appending to artifact {}", path.display());
        return capture_tables(db, tables, BufWriter::new(file)).await;
    }

    let staging = staging_path(path, run_id);
    let file = File::create(&staging)
        .await
        .map_err(|e| BackupError::file(&staging, e))?;
    debug!("Staging artifact in {}", staging.display());

    match capture_tables(db, tables, BufWriter::new(file)).await {
        Ok(captured) => {
            tokio::fs::rename(&staging, path)
                .await
                .map_err(|e| BackupError::file(path, e))?;
            Ok(captured)
        }
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
                warn!("Could not remove {}: {}", staging.display(), cleanup);
            }
            Err(e)
        }
    }
}

fn staging_path(path: &Path, run_id: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".{}.partial", run_id));
    path.with_file_name(name)
}

async fn capture_tables<D, W>(
    db: &D,
    tables: &[String],
    sink: W,
) -> Result<(WalkReport, Vec<TableCapture>)>
where
    D: SchemaInspector + RowReader + ?Sized,
    W: tokio::io::AsyncWrite + Unpin + Send,
{
    let mut action = CaptureAction::new(db, sink);
    let report = Walker::new(db).walk(tables, &mut action).await?;
    let (_, captured) = action.finish().await?;
    Ok((report, captured))
}

async fn restore_tables(
    session: &PgSession,
    tables: &[String],
    statements: &[apply::Statement],
    dry_run: bool,
) -> Result<(WalkReport, Vec<TableApply>)> {
    let mut action = ApplyAction::new(session);
    let report = Walker::new(session).walk(tables, &mut action).await?;
    apply::validate_order(statements, &report)?;

    if dry_run {
        info!(
            "Dry run: {} statement(s) validated, nothing executed",
            statements.len()
        );
        return Ok((report, Vec::new()));
    }

    let applied = apply::apply_statements(session, statements).await?;
    Ok((report, applied))
}
