//! # pg-table-backup
//!
//! Dependency-aware logical backup and restore of PostgreSQL tables.
//!
//! A backup of a table also captures every table it references through a
//! foreign key, transitively, and writes them dependencies first as plain
//! `INSERT` statements. A restore replays such a file in one transaction
//! after checking it against the same dependency walk.
//!
//! - **Walker** visits each table once, dependencies before dependents,
//!   and reports cycles with the offending path
//! - **Capture** renders rows as replayable statements
//! - **Apply** validates and executes an artifact atomically
//!
//! ## Example
//!
//! ```rust,no_run
//! use pg_table_backup::{Config, Runner};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> pg_table_backup::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let runner = Runner::new(config)?;
//!     let result = runner.backup(false).await?;
//!     println!("Captured {} rows", result.total());
//!     Ok(())
//! }
//! ```

pub mod apply;
pub mod capture;
pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod runner;
pub mod walker;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::{BackupConfig, Config, DatabaseConfig, Overrides};
pub use error::{BackupError, Result};
pub use runner::{HealthCheckResult, RunResult, Runner};
pub use walker::{WalkReport, Walker};
