use livy_common::{Error, Result};

/// A single bound parameter or column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<u32> for SqlValue {
    fn from(value: u32) -> Self {
        SqlValue::Integer(i64::from(value))
    }
}

/// One result row, columns in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(pub Vec<SqlValue>);

impl Row {
    fn column(&self, idx: usize) -> Result<&SqlValue> {
        self.0
            .get(idx)
            .ok_or_else(|| Error::Database(format!("column {idx} out of range")))
    }

    pub fn text(&self, idx: usize) -> Result<String> {
        match self.column(idx)? {
            SqlValue::Text(s) => Ok(s.clone()),
            other => Err(Error::Database(format!(
                "column {idx}: expected text, got {other:?}"
            ))),
        }
    }

    pub fn integer(&self, idx: usize) -> Result<i64> {
        match self.column(idx)? {
            SqlValue::Integer(i) => Ok(*i),
            other => Err(Error::Database(format!(
                "column {idx}: expected integer, got {other:?}"
            ))),
        }
    }
}

/// Raw read/write access to a relational backend.
///
/// Statements use `$1..$n` placeholders regardless of backend. Implementations
/// block the calling thread; async callers go through
/// [`SqlRepository`](crate::SqlRepository), which moves the work onto the
/// blocking pool.
pub trait StorageGateway: Send + Sync {
    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;

    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Run a write statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Abort the statement currently running, if any. Backends that bound
    /// statements server-side keep the default no-op.
    fn interrupt(&self) {}

    fn create_table(&self, table: &str, schema: &str) -> Result<()> {
        validate_identifier(table)?;
        if schema.trim().is_empty() {
            return Err(Error::Database("schema can't be empty".into()));
        }
        let sql = format!("CREATE TABLE IF NOT EXISTS {table} ({schema})");
        self.execute(&sql, &[])
            .map_err(|e| Error::Database(format!("failed to create table {table}: {e}")))?;
        tracing::info!(table, backend = self.backend(), "table ready");
        Ok(())
    }
}

pub(crate) fn ensure_query(sql: &str) -> Result<()> {
    if sql.trim().is_empty() {
        return Err(Error::Database("query can't be empty".into()));
    }
    Ok(())
}

/// Table names are interpolated into DDL, so only plain identifiers pass.
pub(crate) fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !valid {
        return Err(Error::Database(format!("invalid table name: {name:?}")));
    }
    Ok(())
}
