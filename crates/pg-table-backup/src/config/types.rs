//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection configuration (PostgreSQL).
    pub database: DatabaseConfig,

    /// Backup/restore behavior configuration.
    #[serde(default)]
    pub backup: BackupConfig,
}

/// PostgreSQL connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host.
    #[serde(default)]
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    #[serde(default)]
    pub database: String,

    /// Username.
    #[serde(default)]
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Schema the table names are resolved in (default: "public").
    #[serde(default = "default_public_schema")]
    pub schema: String,

    /// SSL mode (default: "disable").
    #[serde(default = "default_disable")]
    pub ssl_mode: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Which tables to process and where the artifact lives.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackupConfig {
    /// Requested tables, in processing order.
    #[serde(default)]
    pub tables: Vec<String>,

    /// Artifact path: written by backup, read by restore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Truncate the artifact before a backup instead of appending (default: false).
    #[serde(default)]
    pub overwrite: bool,
}

/// Explicit command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub schema: Option<String>,
    pub ssl_mode: Option<String>,
    pub tables: Option<Vec<String>>,
    pub file: Option<PathBuf>,
    pub overwrite: bool,
}

impl Config {
    /// Apply explicit overrides. Only fields that were given replace file values.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        let db = &mut self.database;
        if let Some(host) = overrides.host {
            db.host = host;
        }
        if let Some(port) = overrides.port {
            db.port = port;
        }
        if let Some(database) = overrides.database {
            db.database = database;
        }
        if let Some(user) = overrides.user {
            db.user = user;
        }
        if let Some(password) = overrides.password {
            db.password = password;
        }
        if let Some(schema) = overrides.schema {
            db.schema = schema;
        }
        if let Some(ssl_mode) = overrides.ssl_mode {
            db.ssl_mode = ssl_mode;
        }
        if let Some(tables) = overrides.tables {
            self.backup.tables = tables;
        }
        if let Some(file) = overrides.file {
            self.backup.file = Some(file);
        }
        if overrides.overwrite {
            self.backup.overwrite = true;
        }
        self
    }
}

// Default value functions for serde
fn default_pg_port() -> u16 {
    5432
}

fn default_public_schema() -> String {
    "public".to_string()
}

fn default_disable() -> String {
    "disable".to_string()
}
