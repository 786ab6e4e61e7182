use std::borrow::Cow;
use std::path::Path;
use std::sync::{LazyLock, Mutex, MutexGuard};

use livy_common::{Error, Result};
use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, InterruptHandle, params_from_iter};
use tracing::info;

use crate::gateway::{Row, SqlValue, StorageGateway, ensure_query};

static DOLLAR_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)").expect("placeholder pattern is valid"));

/// SQLite backend. A single connection guarded by a mutex; good enough for
/// local development and tests.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    interrupt: InterruptHandle,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("opening sqlite store at {}", db_path.display());
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        Ok(Self::from_connection(conn))
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;

        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            interrupt: conn.get_interrupt_handle(),
            conn: Mutex::new(conn),
        }
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("sqlite store lock poisoned".into()))
    }
}

impl StorageGateway for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        ensure_query(sql)?;
        let sql = rewrite_placeholders(sql);
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&sql).map_err(classify)?;
        let columns = stmt.column_count();

        let mut rows = stmt.query(params_from_iter(params.iter().map(to_sql))).map_err(classify)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(classify)? {
            let mut values = Vec::with_capacity(columns);
            for idx in 0..columns {
                values.push(from_sql(row.get_ref(idx).map_err(classify)?)?);
            }
            out.push(Row(values));
        }
        Ok(out)
    }

    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        ensure_query(sql)?;
        let sql = rewrite_placeholders(sql);
        let conn = self.connection()?;
        let affected = conn
            .execute(&sql, params_from_iter(params.iter().map(to_sql)))
            .map_err(classify)?;
        Ok(affected as u64)
    }

    fn interrupt(&self) {
        self.interrupt.interrupt();
    }
}

/// `$1` becomes `?1` so numbering stays explicit instead of depending on the
/// order in which SQLite first sees each named parameter.
fn rewrite_placeholders(sql: &str) -> Cow<'_, str> {
    DOLLAR_PLACEHOLDER.replace_all(sql, "?${1}")
}

fn to_sql(value: &SqlValue) -> rusqlite::types::Value {
    match value {
        SqlValue::Null => rusqlite::types::Value::Null,
        SqlValue::Integer(i) => rusqlite::types::Value::Integer(*i),
        SqlValue::Real(f) => rusqlite::types::Value::Real(*f),
        SqlValue::Text(s) => rusqlite::types::Value::Text(s.clone()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Result<SqlValue> {
    match value {
        ValueRef::Null => Ok(SqlValue::Null),
        ValueRef::Integer(i) => Ok(SqlValue::Integer(i)),
        ValueRef::Real(f) => Ok(SqlValue::Real(f)),
        ValueRef::Text(t) => Ok(SqlValue::Text(String::from_utf8_lossy(t).into_owned())),
        ValueRef::Blob(_) => Err(Error::Database("blob columns are not supported".into())),
    }
}

fn classify(err: rusqlite::Error) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.starts_with("no such table") => {
            Error::MissingTable(msg.clone())
        }
        rusqlite::Error::SqliteFailure(code, _) if code.code == ErrorCode::ConstraintViolation => {
            Error::Conflict(err.to_string())
        }
        rusqlite::Error::SqliteFailure(code, _) if code.code == ErrorCode::OperationInterrupted => {
            Error::Timeout(format!("statement interrupted: {err}"))
        }
        _ => Error::Database(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_table() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store
            .create_table("users", "id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE")
            .unwrap();
        store
    }

    #[test]
    fn rewrites_dollar_placeholders() {
        assert_eq!(
            rewrite_placeholders("UPDATE t SET a = $2 WHERE id = $1"),
            "UPDATE t SET a = ?2 WHERE id = ?1"
        );
        assert_eq!(rewrite_placeholders("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn execute_and_query_round_trip() {
        let store = store_with_table();
        let affected = store
            .execute(
                "INSERT INTO users (id, name) VALUES ($1, $2)",
                &[SqlValue::from(1i64), SqlValue::from("John")],
            )
            .unwrap();
        assert_eq!(affected, 1);
        store
            .execute(
                "INSERT INTO users (id, name) VALUES ($1, $2)",
                &[SqlValue::from(2i64), SqlValue::from("Jane")],
            )
            .unwrap();

        let rows = store
            .query("SELECT id, name FROM users ORDER BY id", &[])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].integer(0).unwrap(), 1);
        assert_eq!(rows[0].text(1).unwrap(), "John");
        assert_eq!(rows[1].text(1).unwrap(), "Jane");
    }

    #[test]
    fn out_of_order_placeholders_bind_by_number() {
        let store = store_with_table();
        store
            .execute(
                "INSERT INTO users (name, id) VALUES ($2, $1)",
                &[SqlValue::from(5i64), SqlValue::from("Five")],
            )
            .unwrap();
        let rows = store
            .query("SELECT name FROM users WHERE id = $1", &[SqlValue::from(5i64)])
            .unwrap();
        assert_eq!(rows[0].text(0).unwrap(), "Five");
    }

    #[test]
    fn update_reports_affected_rows() {
        let store = store_with_table();
        store
            .execute(
                "INSERT INTO users (id, name) VALUES ($1, $2)",
                &[SqlValue::from(1i64), SqlValue::from("John")],
            )
            .unwrap();
        let hit = store
            .execute(
                "UPDATE users SET name = $1 WHERE id = $2",
                &[SqlValue::from("Jane"), SqlValue::from(1i64)],
            )
            .unwrap();
        let miss = store
            .execute(
                "UPDATE users SET name = $1 WHERE id = $2",
                &[SqlValue::from("Nobody"), SqlValue::from(99i64)],
            )
            .unwrap();
        assert_eq!(hit, 1);
        assert_eq!(miss, 0);
    }

    #[test]
    fn missing_table_is_classified() {
        let store = SqliteStore::in_memory().unwrap();
        let err = store.query("SELECT version FROM db_version", &[]).unwrap_err();
        assert!(matches!(err, Error::MissingTable(_)), "got {err:?}");
    }

    #[test]
    fn unique_violation_is_a_conflict() {
        let store = store_with_table();
        let insert = "INSERT INTO users (id, name) VALUES ($1, $2)";
        store
            .execute(insert, &[SqlValue::from(1i64), SqlValue::from("John")])
            .unwrap();
        let err = store
            .execute(insert, &[SqlValue::from(2i64), SqlValue::from("John")])
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "got {err:?}");
    }

    #[test]
    fn empty_query_and_schema_are_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        let err = store.query("", &[]).unwrap_err();
        assert!(err.to_string().contains("query can't be empty"));
        let err = store.execute(" ", &[]).unwrap_err();
        assert!(err.to_string().contains("query can't be empty"));
        let err = store.create_table("users", "").unwrap_err();
        assert!(err.to_string().contains("schema can't be empty"));
    }

    #[test]
    fn create_table_is_idempotent() {
        let store = store_with_table();
        store
            .create_table("users", "id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE")
            .unwrap();
    }

    #[test]
    fn file_backed_store_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("livy.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.create_table("kv", "k TEXT PRIMARY KEY, v TEXT").unwrap();
            store
                .execute(
                    "INSERT INTO kv (k, v) VALUES ($1, $2)",
                    &[SqlValue::from("a"), SqlValue::from("1")],
                )
                .unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let rows = store.query("SELECT v FROM kv WHERE k = $1", &[SqlValue::from("a")]).unwrap();
        assert_eq!(rows[0].text(0).unwrap(), "1");
    }

    #[test]
    fn interrupt_aborts_running_statement() {
        let store = std::sync::Arc::new(SqliteStore::in_memory().unwrap());
        let runner = std::sync::Arc::clone(&store);
        let handle = std::thread::spawn(move || {
            runner.query(
                "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) \
                 SELECT COUNT(*) FROM c",
                &[],
            )
        });

        // The statement may not have started yet; interrupting an idle
        // connection is a no-op, so keep trying until the thread returns.
        while !handle.is_finished() {
            store.interrupt();
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        let err = handle.join().unwrap().unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "got {err:?}");

        // The connection stays usable afterwards.
        let rows = store.query("SELECT 1", &[]).unwrap();
        assert_eq!(rows[0].integer(0).unwrap(), 1);
    }
}
