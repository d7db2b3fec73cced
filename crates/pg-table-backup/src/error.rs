//! Error types for the backup library.

use std::path::PathBuf;

use thiserror::Error;

/// Exit code for configuration errors (invalid YAML, missing fields, etc.).
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code for connection and raw database errors.
pub const EXIT_CONNECTION_ERROR: u8 = 2;
/// Exit code for metadata lookup failures.
pub const EXIT_SCHEMA_ERROR: u8 = 3;
/// Exit code for circular foreign-key dependencies.
pub const EXIT_CYCLE_ERROR: u8 = 4;
/// Exit code for backup failures.
pub const EXIT_CAPTURE_ERROR: u8 = 5;
/// Exit code for restore failures.
pub const EXIT_APPLY_ERROR: u8 = 6;
/// Exit code for file I/O errors.
pub const EXIT_IO_ERROR: u8 = 7;
/// Exit code for result serialization errors.
pub const EXIT_JSON_ERROR: u8 = 8;

/// Main error type for backup and restore operations.
#[derive(Error, Debug)]
pub enum BackupError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure to establish or keep the database session
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Metadata query failed or the table does not exist
    #[error("Schema lookup failed for table {table}: {message}")]
    SchemaLookup { table: String, message: String },

    /// Foreign keys form a cycle; the path starts and ends at the same table
    #[error("Cyclic foreign-key dependency: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    /// Reading or rendering rows failed during backup
    #[error("Capture failed for table {table}: {message}")]
    Capture { table: String, message: String },

    /// Statement validation or execution failed during restore
    #[error("Apply failed for table {table}: {message}")]
    Apply { table: String, message: String },

    /// The restore artifact could not be parsed
    #[error("Malformed artifact at line {line}: {message}")]
    Artifact { line: usize, message: String },

    /// File operation failed on a known path
    #[error("File error on {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Database driver error without further context
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackupError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        BackupError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a SchemaLookup error
    pub fn schema_lookup(table: impl Into<String>, message: impl ToString) -> Self {
        BackupError::SchemaLookup {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a Capture error
    pub fn capture(table: impl Into<String>, message: impl ToString) -> Self {
        BackupError::Capture {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create an Apply error
    pub fn apply(table: impl Into<String>, message: impl ToString) -> Self {
        BackupError::Apply {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create an Artifact error
    pub fn artifact(line: usize, message: impl Into<String>) -> Self {
        BackupError::Artifact {
            line,
            message: message.into(),
        }
    }

    /// Create a File error for the given path
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BackupError::File {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            BackupError::Config(_) | BackupError::Yaml(_) => EXIT_CONFIG_ERROR,
            BackupError::Connection { .. } | BackupError::Database(_) => EXIT_CONNECTION_ERROR,
            BackupError::SchemaLookup { .. } => EXIT_SCHEMA_ERROR,
            BackupError::CyclicDependency { .. } => EXIT_CYCLE_ERROR,
            BackupError::Capture { .. } => EXIT_CAPTURE_ERROR,
            BackupError::Apply { .. } | BackupError::Artifact { .. } => EXIT_APPLY_ERROR,
            BackupError::File { .. } | BackupError::Io(_) => EXIT_IO_ERROR,
            BackupError::Json(_) => EXIT_JSON_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for backup operations.
pub type Result<T> = std::result::Result<T, BackupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_names_path() {
        let err = BackupError::CyclicDependency {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Cyclic foreign-key dependency: a -> b -> a");
        assert_eq!(err.exit_code(), EXIT_CYCLE_ERROR);
    }

    #[test]
    fn test_exit_codes_per_kind() {
        assert_eq!(BackupError::Config("x".into()).exit_code(), 1);
        assert_eq!(BackupError::connection("refused", "connect").exit_code(), 2);
        assert_eq!(BackupError::schema_lookup("t", "missing").exit_code(), 3);
        assert_eq!(BackupError::capture("t", "bad row").exit_code(), 5);
        assert_eq!(BackupError::apply("t", "dup key").exit_code(), 6);
        assert_eq!(BackupError::artifact(3, "unterminated").exit_code(), 6);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(BackupError::file("/tmp/x.sql", io).exit_code(), 7);
    }

    #[test]
    fn test_format_detailed_includes_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = BackupError::file("/backups/out.sql", io);
        let detailed = err.format_detailed();
        assert!(detailed.starts_with("Error: File error on /backups/out.sql: denied"));
        assert!(detailed.contains("Caused by:\n  1: denied"));
    }
}
