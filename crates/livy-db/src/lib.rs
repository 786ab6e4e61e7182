pub mod configuration;
pub mod gateway;
pub mod migrations;
pub mod postgres_store;
pub mod repository;
pub mod schema;
pub mod sqlite;

pub use configuration::ConfigurationRepository;
pub use gateway::{Row, SqlValue, StorageGateway};
pub use migrations::{MigrationReport, MigrationStep, Migrator};
pub use postgres_store::PostgresStore;
pub use repository::SqlRepository;
pub use schema::SchemaRepository;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use livy_common::{Error, Result};
use livy_config::StoreConfig;

/// Open the configured backing store. Blocking; call it from a blocking
/// context when running inside an async runtime.
pub fn connect(config: &StoreConfig) -> Result<Arc<dyn StorageGateway>> {
    match config {
        StoreConfig::Postgres(db) => Ok(Arc::new(PostgresStore::connect(db)?)),
        StoreConfig::Sqlite { path } => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Database(format!(
                        "failed to create data directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
            Ok(Arc::new(SqliteStore::open(path)?))
        }
    }
}
