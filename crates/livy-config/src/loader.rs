use std::path::PathBuf;
use std::str::FromStr;

use livy_common::{Error, Result};
use tracing::debug;

use crate::model::{ApiConfig, AppConfig, DatabaseConfig, StoreConfig};

pub const API_URL: &str = "API_URL";
pub const API_PORT: &str = "API_PORT";
pub const API_REQUEST_TIMEOUT_MS: &str = "API_REQUEST_TIMEOUT_MS";
pub const PG_HOST: &str = "PG_HOST";
pub const PG_PORT: &str = "PG_PORT";
pub const PG_USERNAME: &str = "PG_USERNAME";
pub const PG_PASSWORD: &str = "PG_PASSWORD";
pub const PG_DB: &str = "PG_DB";
pub const PG_MAX_CONNECTIONS: &str = "PG_MAX_CONNECTIONS";
pub const PG_CONNECT_TIMEOUT_MS: &str = "PG_CONNECT_TIMEOUT_MS";
pub const PG_STATEMENT_TIMEOUT_MS: &str = "PG_STATEMENT_TIMEOUT_MS";
pub const LIVY_SQLITE_PATH: &str = "LIVY_SQLITE_PATH";

/// Resolves [`AppConfig`] from key/value lookups. Empty values count as
/// missing, so a blank `PG_HOST=` fails the same way as an absent one.
pub struct ConfigLoader<F> {
    lookup: F,
}

impl ConfigLoader<fn(&str) -> Option<String>> {
    /// Loader backed by the process environment.
    pub fn from_env() -> Self {
        Self {
            lookup: |key| std::env::var(key).ok(),
        }
    }
}

impl<F> ConfigLoader<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn from_lookup(lookup: F) -> Self {
        Self { lookup }
    }

    /// Resolve the whole configuration. A SQLite path, when set, replaces the
    /// Postgres settings entirely.
    pub fn load(&self) -> Result<AppConfig> {
        self.load_with_sqlite(None)
    }

    /// Like [`load`](Self::load), with `sqlite` taking precedence over
    /// `LIVY_SQLITE_PATH`. No `PG_*` variable is read when a path is known.
    pub fn load_with_sqlite(&self, sqlite: Option<PathBuf>) -> Result<AppConfig> {
        let api = self.load_api()?;
        let sqlite = sqlite.or_else(|| self.optional(LIVY_SQLITE_PATH).map(PathBuf::from));
        let store = match sqlite {
            Some(path) => StoreConfig::Sqlite { path },
            None => StoreConfig::Postgres(self.load_database()?),
        };
        debug!(backend = store.backend(), "configuration resolved");
        Ok(AppConfig { api, store })
    }

    pub fn load_api(&self) -> Result<ApiConfig> {
        Ok(ApiConfig {
            host: self.required(API_URL)?,
            port: self.required_parsed(API_PORT)?,
            request_timeout_ms: self
                .optional_parsed(API_REQUEST_TIMEOUT_MS)?
                .unwrap_or(ApiConfig::DEFAULT_REQUEST_TIMEOUT_MS),
        })
    }

    pub fn load_database(&self) -> Result<DatabaseConfig> {
        Ok(DatabaseConfig {
            host: self.required(PG_HOST)?,
            port: self.required_parsed(PG_PORT)?,
            username: self.required(PG_USERNAME)?,
            password: self.required(PG_PASSWORD)?,
            database: self.required(PG_DB)?,
            max_connections: self
                .optional_parsed(PG_MAX_CONNECTIONS)?
                .unwrap_or(DatabaseConfig::DEFAULT_MAX_CONNECTIONS),
            connect_timeout_ms: self
                .optional_parsed(PG_CONNECT_TIMEOUT_MS)?
                .unwrap_or(DatabaseConfig::DEFAULT_CONNECT_TIMEOUT_MS),
            statement_timeout_ms: self
                .optional_parsed(PG_STATEMENT_TIMEOUT_MS)?
                .unwrap_or(DatabaseConfig::DEFAULT_STATEMENT_TIMEOUT_MS),
        })
    }

    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key)
            .ok_or_else(|| Error::Config(format!("{key} is not set")))
    }

    fn required_parsed<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.required(key)?;
        parse(key, &raw)
    }

    fn optional_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map(|raw| parse(key, &raw)).transpose()
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| Error::Config(format!("invalid {key} '{raw}': {e}")))
}
