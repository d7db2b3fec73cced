//! Configuration validation.

use super::{BackupConfig, Config};
use crate::core::identifier::validate_identifier;
use crate::drivers::common::SslMode;
use crate::error::{BackupError, Result};

/// Validate the connection part of the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let db = &config.database;
    if db.host.is_empty() {
        return Err(BackupError::Config("database.host is required".into()));
    }
    if db.port == 0 {
        return Err(BackupError::Config("database.port must be non-zero".into()));
    }
    if db.database.is_empty() {
        return Err(BackupError::Config("database.database is required".into()));
    }
    if db.user.is_empty() {
        return Err(BackupError::Config("database.user is required".into()));
    }
    validate_identifier(&db.schema)
        .map_err(|e| BackupError::Config(format!("database.schema: {}", e)))?;
    SslMode::parse(&db.ssl_mode)?;

    Ok(())
}

/// Validate the table list and artifact path needed by backup and restore.
pub fn validate_backup(backup: &BackupConfig) -> Result<()> {
    if backup.tables.is_empty() {
        return Err(BackupError::Config(
            "backup.tables must name at least one table".into(),
        ));
    }
    for table in &backup.tables {
        validate_identifier(table)
            .map_err(|e| BackupError::Config(format!("backup.tables: {}", e)))?;
    }
    match &backup.file {
        Some(path) if !path.as_os_str().is_empty() => Ok(()),
        _ => Err(BackupError::Config("backup.file is required".into())),
    }
}
