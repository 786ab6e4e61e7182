use async_trait::async_trait;
use livy_common::{Configuration, Result};
use uuid::Uuid;

use crate::gateway::{Row, SqlValue};
use crate::repository::SqlRepository;

/// CRUD access to the `configuration` table. There is no delete.
#[async_trait]
pub trait ConfigurationRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Configuration>>;

    /// First entry with the given name, if any.
    async fn get_by_name(&self, name: &str) -> Result<Option<Configuration>>;

    /// Insert under a server-generated id and return the stored entry.
    async fn insert(&self, name: &str, value: &str) -> Result<Configuration>;

    /// Returns the number of rows changed; 0 when `id` is unknown.
    async fn update(&self, id: &str, name: &str, value: &str) -> Result<u64>;
}

fn to_configuration(row: &Row) -> Result<Configuration> {
    Ok(Configuration {
        id: row.text(0)?,
        name: row.text(1)?,
        value: row.text(2)?,
    })
}

#[async_trait]
impl ConfigurationRepository for SqlRepository {
    async fn list(&self) -> Result<Vec<Configuration>> {
        let rows = self
            .blocking(|db| {
                db.query(
                    "SELECT id, configname, value FROM configuration ORDER BY configname, id",
                    &[],
                )
            })
            .await?;
        rows.iter().map(to_configuration).collect()
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Configuration>> {
        let name = name.to_string();
        let rows = self
            .blocking(move |db| {
                db.query(
                    "SELECT id, configname, value FROM configuration WHERE configname = $1 \
                     ORDER BY id LIMIT 1",
                    &[SqlValue::from(name)],
                )
            })
            .await?;
        rows.first().map(to_configuration).transpose()
    }

    async fn insert(&self, name: &str, value: &str) -> Result<Configuration> {
        let entry = Configuration::new(Uuid::new_v4().to_string(), name, value);
        let params = vec![
            SqlValue::from(entry.id.clone()),
            SqlValue::from(entry.name.clone()),
            SqlValue::from(entry.value.clone()),
        ];
        self.blocking(move |db| {
            db.execute(
                "INSERT INTO configuration (id, configname, value) VALUES ($1, $2, $3)",
                &params,
            )
        })
        .await?;
        Ok(entry)
    }

    async fn update(&self, id: &str, name: &str, value: &str) -> Result<u64> {
        let params = vec![
            SqlValue::from(name),
            SqlValue::from(value),
            SqlValue::from(id),
        ];
        self.blocking(move |db| {
            db.execute(
                "UPDATE configuration SET configname = $1, value = $2 WHERE id = $3",
                &params,
            )
        })
        .await
    }
}
