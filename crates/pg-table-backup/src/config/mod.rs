//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// Nothing is validated here: any field may still come from
    /// command-line overrides. [`Runner`](crate::Runner) validates the
    /// merged configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validate the connection settings.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl BackupConfig {
    /// Validate the table list and artifact path.
    pub fn validate(&self) -> Result<()> {
        validation::validate_backup(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const YAML: &str = r#"
database:
  host: db.internal
  database: shop
  user: backup
  password: hunter2
backup:
  tables: [orders, invoices]
  file: nightly.sql
"#;

    #[test]
    fn test_from_yaml_applies_defaults() {
        let config = Config::from_yaml(YAML).unwrap();
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.schema, "public");
        assert_eq!(config.database.ssl_mode, "disable");
        assert_eq!(config.backup.tables, vec!["orders", "invoices"]);
        assert_eq!(config.backup.file, Some(PathBuf::from("nightly.sql")));
        assert!(!config.backup.overwrite);
    }

    #[test]
    fn test_backup_section_is_optional() {
        let yaml = "database:\n  host: h\n  database: d\n  user: u\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert!(config.backup.tables.is_empty());
        assert!(config.backup.validate().is_err());
    }

    #[test]
    fn test_connection_fields_can_come_from_overrides() {
        let config = Config::from_yaml("database:\n  host: \"\"\n  port: 5433\n").unwrap();
        assert!(config.validate().is_err());

        let config = config.with_overrides(Overrides {
            host: Some("db.internal".to_string()),
            database: Some("shop".to_string()),
            user: Some("backup".to_string()),
            ..Default::default()
        });
        config.validate().unwrap();
        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.port, 5433);
    }

    #[test]
    fn test_missing_database_section_fails() {
        assert!(Config::from_yaml("backup:\n  tables: [a]\n").is_err());
    }

    #[test]
    fn test_overrides_replace_only_given_fields() {
        let config = Config::from_yaml(YAML).unwrap().with_overrides(Overrides {
            host: Some("localhost".to_string()),
            port: Some(6543),
            tables: Some(vec!["customers".to_string()]),
            file: Some(PathBuf::from("manual.sql")),
            overwrite: true,
            ..Default::default()
        });

        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 6543);
        assert_eq!(config.database.database, "shop");
        assert_eq!(config.database.password, "hunter2");
        assert_eq!(config.backup.tables, vec!["customers"]);
        assert_eq!(config.backup.file, Some(PathBuf::from("manual.sql")));
        assert!(config.backup.overwrite);
    }
}
