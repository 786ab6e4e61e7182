use async_trait::async_trait;
use livy_common::{Configuration, Error, Result};
use uuid::Uuid;

use crate::gateway::SqlValue;
use crate::repository::SqlRepository;

pub const VERSION_TABLE: &str = "db_version";

pub const VERSION_TABLE_SCHEMA: &str = "
    id TEXT PRIMARY KEY,
    version BIGINT NOT NULL UNIQUE
";

pub const CONFIGURATION_TABLE_SCHEMA: &str = "
    id TEXT PRIMARY KEY,
    configname TEXT NOT NULL,
    value TEXT NOT NULL
";

/// Version bookkeeping and table creation used by the migration steps.
/// Version history is append-only.
#[async_trait]
pub trait SchemaRepository: Send + Sync {
    async fn create_version_table(&self) -> Result<()>;

    /// Highest recorded version, 0 when the table is empty. A missing table
    /// surfaces as [`Error::MissingTable`] so callers can tell the two apart.
    async fn current_version(&self) -> Result<u32>;

    /// Append `version` under a fresh id. A duplicate version surfaces as
    /// [`Error::Conflict`].
    async fn record_version(&self, version: u32) -> Result<()>;

    async fn applied_versions(&self) -> Result<Vec<u32>>;

    async fn create_configuration_table(&self) -> Result<()>;
}

fn to_version(raw: i64) -> Result<u32> {
    u32::try_from(raw).map_err(|_| Error::Database(format!("invalid schema version {raw}")))
}

#[async_trait]
impl SchemaRepository for SqlRepository {
    async fn create_version_table(&self) -> Result<()> {
        self.blocking(|db| db.create_table(VERSION_TABLE, VERSION_TABLE_SCHEMA))
            .await
    }

    async fn current_version(&self) -> Result<u32> {
        let rows = self
            .blocking(|db| {
                db.query(
                    "SELECT version FROM db_version ORDER BY version DESC LIMIT 1",
                    &[],
                )
            })
            .await?;
        match rows.first() {
            Some(row) => to_version(row.integer(0)?),
            None => Ok(0),
        }
    }

    async fn record_version(&self, version: u32) -> Result<()> {
        let id = Uuid::new_v4().to_string();
        self.blocking(move |db| {
            db.execute(
                "INSERT INTO db_version (id, version) VALUES ($1, $2)",
                &[SqlValue::from(id), SqlValue::from(version)],
            )
        })
        .await?;
        Ok(())
    }

    async fn applied_versions(&self) -> Result<Vec<u32>> {
        let rows = self
            .blocking(|db| db.query("SELECT version FROM db_version ORDER BY version ASC", &[]))
            .await?;
        rows.iter().map(|row| to_version(row.integer(0)?)).collect()
    }

    async fn create_configuration_table(&self) -> Result<()> {
        self.blocking(|db| db.create_table(Configuration::TABLE, CONFIGURATION_TABLE_SCHEMA))
            .await
    }
}
