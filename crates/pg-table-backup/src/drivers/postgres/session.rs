//! PostgreSQL session: the single connection a backup or restore runs on.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use tokio_postgres::Config as PgConfig;
use tracing::{debug, info, warn};

use super::convert::{convert_row, select_list, ColumnKind};
use crate::config::DatabaseConfig;
use crate::core::identifier::{qualify_pg, quote_pg};
use crate::core::traits::{RowReader, SchemaInspector, StatementExecutor};
use crate::core::value::Row;
use crate::drivers::common::SslMode;
use crate::error::{BackupError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const COLUMNS_QUERY: &str = r#"
    SELECT column_name::text
    FROM information_schema.columns
    WHERE table_schema = $1 AND table_name = $2
    ORDER BY ordinal_position
"#;

const DEPENDENCIES_QUERY: &str = r#"
    SELECT DISTINCT ccu.table_name::text
    FROM information_schema.table_constraints AS tc
    JOIN information_schema.constraint_column_usage AS ccu
      ON tc.constraint_name = ccu.constraint_name
     AND tc.constraint_schema = ccu.constraint_schema
    WHERE tc.constraint_type = 'FOREIGN KEY'
      AND tc.table_schema = $1
      AND tc.table_name = $2
"#;

/// One open connection, used for metadata, reads and the restore transaction.
///
/// Unqualified table names in generated statements resolve through the
/// session's `search_path`, which is pinned to the configured schema.
pub struct PgSession {
    pool: Pool,
    client: Object,
    schema: String,
}

impl PgSession {
    /// Open the session described by `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let target = format!("{}:{}/{}", config.host, config.port, config.database);
        let ssl_mode = SslMode::parse(&config.ssl_mode)?;

        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);
        pg_config.application_name("pg-table-backup");
        pg_config.keepalives(true);
        pg_config.keepalives_idle(Duration::from_secs(30));
        pg_config.connect_timeout(CONNECT_TIMEOUT);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let mgr = match ssl_mode.connector()? {
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config)
            }
            Some(tls) => Manager::from_config(pg_config, tls, mgr_config),
        };
        let pool = Pool::builder(mgr)
            .max_size(1)
            .build()
            .map_err(|e| BackupError::connection(e, format!("creating pool for {}", target)))?;

        let client = pool
            .get()
            .await
            .map_err(|e| BackupError::connection(e, format!("connecting to {}", target)))?;

        let search_path = format!("SET search_path TO {}", quote_pg(&config.schema)?);
        client
            .batch_execute(&search_path)
            .await
            .map_err(|e| BackupError::connection(e, "setting search_path"))?;

        info!(
            "Connected to PostgreSQL: {} (schema {})",
            target, config.schema
        );

        Ok(Self {
            pool,
            client,
            schema: config.schema.clone(),
        })
    }

    /// Round-trip a trivial query and return the server version string.
    pub async fn ping(&self) -> Result<String> {
        let row = self
            .client
            .query_one("SELECT version()", &[])
            .await
            .map_err(|e| BackupError::connection(e, "querying server version"))?;
        Ok(row.try_get::<_, String>(0)?)
    }

    /// Release the connection.
    pub fn close(self) {
        drop(self.client);
        self.pool.close();
        debug!("PostgreSQL session closed");
    }
}

#[async_trait]
impl SchemaInspector for PgSession {
    async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        let rows = self
            .client
            .query(COLUMNS_QUERY, &[&self.schema, &table])
            .await
            .map_err(|e| BackupError::schema_lookup(table, e))?;

        if rows.is_empty() {
            return Err(BackupError::schema_lookup(
                table,
                format!("table does not exist in schema {}", self.schema),
            ));
        }

        let columns = rows
            .iter()
            .map(|r| r.try_get::<_, String>(0))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| BackupError::schema_lookup(table, e))?;
        debug!("Loaded {} columns for {}", columns.len(), table);
        Ok(columns)
    }

    async fn list_dependencies(&self, table: &str) -> Result<BTreeSet<String>> {
        let rows = self
            .client
            .query(DEPENDENCIES_QUERY, &[&self.schema, &table])
            .await
            .map_err(|e| BackupError::schema_lookup(table, e))?;

        rows.iter()
            .map(|r| r.try_get::<_, String>(0))
            .collect::<std::result::Result<BTreeSet<_>, _>>()
            .map_err(|e| BackupError::schema_lookup(table, e))
    }
}

#[async_trait]
impl RowReader for PgSession {
    async fn read_rows(&self, table: &str, columns: &[String]) -> Result<Vec<Row>> {
        let qualified = qualify_pg(&self.schema, table)?;
        let plain: Vec<String> = columns
            .iter()
            .map(|c| quote_pg(c))
            .collect::<Result<_>>()?;

        let prepared = self
            .client
            .prepare(&format!("SELECT {} FROM {}", plain.join(", "), qualified))
            .await
            .map_err(|e| BackupError::capture(table, e))?;
        let kinds: Vec<ColumnKind> = prepared
            .columns()
            .iter()
            .map(|c| ColumnKind::from_type_name(c.type_().name()))
            .collect();

        let rows = if kinds.iter().any(|k| k.needs_text_cast()) {
            let sql = format!("SELECT {} FROM {}", select_list(columns, &kinds)?, qualified);
            self.client.query(sql.as_str(), &[]).await
        } else {
            self.client.query(&prepared, &[]).await
        }
        .map_err(|e| BackupError::capture(table, e))?;

        rows.iter()
            .map(|r| convert_row(r, &kinds))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| BackupError::capture(table, e))
    }
}

#[async_trait]
impl StatementExecutor for PgSession {
    async fn begin(&self) -> Result<()> {
        self.client.batch_execute("BEGIN").await?;
        Ok(())
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.client.batch_execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }
}
