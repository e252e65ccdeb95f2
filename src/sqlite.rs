#![forbid(unsafe_code)]

//! SQLite-backed [`SqlExecutor`].

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection};
use tracing::trace;

use crate::executor::{InsertOutcome, Row, SqlExecutor};
use crate::model::Value;
use crate::sql::BoundStatement;
use crate::error::Result;

/// Executor over a single SQLite connection.
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
}

impl SqliteExecutor {
    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    /// Wraps an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Runs semicolon-separated SQL without parameters, e.g. schema DDL.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    fn query_sql(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let labels: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut mapped = Row::new();
            for (idx, label) in labels.iter().enumerate() {
                mapped.push(label.clone(), value_from_sql(row.get_ref(idx)?));
            }
            out.push(mapped);
        }
        Ok(out)
    }
}

impl SqlExecutor for SqliteExecutor {
    fn execute(&self, statement: &BoundStatement) -> Result<u64> {
        trace!(statement = %statement.id, sql = %statement.sql, "execute");
        let affected = self
            .conn
            .lock()
            .execute(&statement.sql, params_from_iter(statement.params.iter()))?;
        Ok(affected as u64)
    }

    fn insert(&self, statement: &BoundStatement) -> Result<InsertOutcome> {
        let Some(key) = &statement.generated_key else {
            return Ok(InsertOutcome {
                affected: self.execute(statement)?,
                generated_keys: Vec::new(),
            });
        };
        let sql = format!("{} RETURNING {}", statement.sql, key.column);
        trace!(statement = %statement.id, %sql, "insert returning");
        let generated_keys: Vec<Value> = self
            .query_sql(&sql, &statement.params)?
            .into_iter()
            .filter_map(|row| row.first().cloned())
            .collect();
        Ok(InsertOutcome {
            affected: generated_keys.len() as u64,
            generated_keys,
        })
    }

    fn query(&self, statement: &BoundStatement) -> Result<Vec<Row>> {
        trace!(statement = %statement.id, sql = %statement.sql, "query");
        self.query_sql(&statement.sql, &statement.params)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Bool(v) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(i64::from(*v))),
            Value::Int(v) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*v)),
            Value::Float(v) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*v)),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
        })
    }
}

fn value_from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Value::Bytes(v.to_vec()),
    }
}
