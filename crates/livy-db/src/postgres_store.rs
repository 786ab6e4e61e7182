use std::time::Duration;

use livy_common::{Error, Result};
use livy_config::DatabaseConfig;
use postgres::NoTls;
use postgres::error::SqlState;
use postgres::types::{ToSql, Type};
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;
use tracing::info;

use crate::gateway::{Row, SqlValue, StorageGateway, ensure_query};

type PgPool = Pool<PostgresConnectionManager<NoTls>>;

/// Postgres backend over an r2d2 connection pool.
///
/// The synchronous `postgres` client drives its own runtime, so both
/// construction and every call must happen off the async executor threads.
pub struct PostgresStore {
    pool: Option<PgPool>,
}

impl Drop for PostgresStore {
    fn drop(&mut self) {
        // Connections own a runtime that cannot be dropped from async context.
        if let Some(pool) = self.pool.take() {
            let _ = std::thread::spawn(move || drop(pool));
        }
    }
}

impl PostgresStore {
    /// Build the pool and verify connectivity. Fails once `connect_timeout_ms`
    /// elapses without a usable connection.
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pg_config = pg_config(config);
        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build(manager)
            .map_err(|e| {
                Error::Database(format!(
                    "failed to connect to postgres at {}:{}: {e}",
                    config.host, config.port
                ))
            })?;
        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "postgres pool ready"
        );
        Ok(Self { pool: Some(pool) })
    }

    fn connection(&self) -> Result<PooledConnection<PostgresConnectionManager<NoTls>>> {
        self.pool
            .as_ref()
            .ok_or_else(|| Error::Database("postgres store closed".into()))?
            .get()
            .map_err(|e| Error::Database(e.to_string()))
    }
}

impl StorageGateway for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        ensure_query(sql)?;
        let bound = bind(params);
        let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|b| b.as_ref()).collect();
        let mut conn = self.connection()?;
        let rows = conn.query(sql, &refs).map_err(classify)?;
        rows.iter().map(convert_row).collect()
    }

    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        ensure_query(sql)?;
        let bound = bind(params);
        let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|b| b.as_ref()).collect();
        let mut conn = self.connection()?;
        conn.execute(sql, &refs).map_err(classify)
    }
}

pub(crate) fn pg_config(config: &DatabaseConfig) -> postgres::Config {
    let mut pg = postgres::Config::new();
    pg.host(&config.host)
        .port(config.port)
        .user(&config.username)
        .password(&config.password)
        .dbname(&config.database)
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .options(&format!(
            "-c statement_timeout={}",
            config.statement_timeout_ms
        ));
    pg
}

fn bind(params: &[SqlValue]) -> Vec<Box<dyn ToSql + Sync>> {
    params
        .iter()
        .map(|p| -> Box<dyn ToSql + Sync> {
            match p {
                SqlValue::Null => Box::new(Option::<String>::None),
                SqlValue::Integer(i) => Box::new(*i),
                SqlValue::Real(f) => Box::new(*f),
                SqlValue::Text(s) => Box::new(s.clone()),
            }
        })
        .collect()
}

fn convert_row(row: &postgres::Row) -> Result<Row> {
    let mut values = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let ty = column.type_();
        let value = if *ty == Type::INT8 {
            row.try_get::<_, Option<i64>>(idx).map(|v| v.map(SqlValue::Integer))
        } else if *ty == Type::INT4 {
            row.try_get::<_, Option<i32>>(idx)
                .map(|v| v.map(|i| SqlValue::Integer(i64::from(i))))
        } else if *ty == Type::INT2 {
            row.try_get::<_, Option<i16>>(idx)
                .map(|v| v.map(|i| SqlValue::Integer(i64::from(i))))
        } else if *ty == Type::FLOAT8 {
            row.try_get::<_, Option<f64>>(idx).map(|v| v.map(SqlValue::Real))
        } else if *ty == Type::FLOAT4 {
            row.try_get::<_, Option<f32>>(idx)
                .map(|v| v.map(|f| SqlValue::Real(f64::from(f))))
        } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR {
            row.try_get::<_, Option<String>>(idx).map(|v| v.map(SqlValue::Text))
        } else {
            return Err(Error::Database(format!(
                "unsupported column type {} for {}",
                ty,
                column.name()
            )));
        };
        let value = value.map_err(|e| Error::Database(e.to_string()))?;
        values.push(value.unwrap_or(SqlValue::Null));
    }
    Ok(Row(values))
}

fn classify(err: postgres::Error) -> Error {
    match err.code() {
        Some(code) if *code == SqlState::UNDEFINED_TABLE => Error::MissingTable(err.to_string()),
        Some(code) if *code == SqlState::UNIQUE_VIOLATION => Error::Conflict(err.to_string()),
        _ => Error::Database(err.to_string()),
    }
}
