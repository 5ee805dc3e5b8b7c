//! SQLite connection backed by rusqlite.
//!
//! Query results are read fully into a [`MemoryResultSet`], which gives the
//! scroll-insensitive cursor semantics the result layer expects.

use std::cell::Cell;
use std::path::Path;
use std::time::Duration;

use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, ToSql};
use tracing::debug;

use crate::error::SqlException;
use crate::value::SqlValue;

use super::connection::{Connection, MemoryResultSet, ResultSet};

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(i64::from(*b))),
            SqlValue::Int(n) => ToSqlOutput::Owned(Value::Integer(*n)),
            SqlValue::Float(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            SqlValue::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

fn from_sqlite(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(n) => SqlValue::Int(n),
        ValueRef::Real(f) => SqlValue::Float(f),
        ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => SqlValue::Bytes(b.to_vec()),
    }
}

/// Convert a rusqlite error, keeping the extended result code.
fn to_exception(error: rusqlite::Error) -> SqlException {
    match &error {
        rusqlite::Error::SqliteFailure(failure, message) => {
            let message = message.clone().unwrap_or_else(|| error.to_string());
            SqlException::new(message).with_vendor_code(failure.extended_code)
        }
        _ => SqlException::new(error.to_string()),
    }
}

pub struct SqliteConnection {
    conn: rusqlite::Connection,
    statements: Cell<usize>,
}

impl SqliteConnection {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SqlException> {
        let conn = rusqlite::Connection::open(path).map_err(to_exception)?;
        Ok(Self::wrap(conn))
    }

    pub fn open_in_memory() -> Result<Self, SqlException> {
        let conn = rusqlite::Connection::open_in_memory().map_err(to_exception)?;
        Ok(Self::wrap(conn))
    }

    fn wrap(conn: rusqlite::Connection) -> Self {
        Self {
            conn,
            statements: Cell::new(0),
        }
    }

    /// Run semicolon-separated statements without parameters, e.g. a schema.
    pub fn execute_batch(&self, sql: &str) -> Result<(), SqlException> {
        self.conn.execute_batch(sql).map_err(to_exception)
    }

    /// Number of statements executed through [`Connection`].
    pub fn statement_count(&self) -> usize {
        self.statements.get()
    }

    fn prepare_execution(&self, sql: &str, params: &[SqlValue], timeout: Option<Duration>) -> Result<(), SqlException> {
        if let Some(timeout) = timeout {
            self.conn.busy_timeout(timeout).map_err(to_exception)?;
        }
        self.statements.set(self.statements.get() + 1);
        debug!(sql = %sql, params = params.len(), "executing statement");
        Ok(())
    }
}

impl Connection for SqliteConnection {
    fn execute_query(
        &self,
        sql: &str,
        params: &[SqlValue],
        timeout: Option<Duration>,
    ) -> Result<Box<dyn ResultSet>, SqlException> {
        self.prepare_execution(sql, params, timeout)?;
        let mut statement = self.conn.prepare(sql).map_err(to_exception)?;
        let width = statement.column_count();
        let mut rows = statement
            .query(params_from_iter(params.iter()))
            .map_err(to_exception)?;

        let mut collected = Vec::new();
        while let Some(row) = rows.next().map_err(to_exception)? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(from_sqlite(row.get_ref(i).map_err(to_exception)?));
            }
            collected.push(values);
        }
        debug!(rows = collected.len(), "query returned");
        Ok(Box::new(MemoryResultSet::new(collected)))
    }

    fn execute_update(
        &self,
        sql: &str,
        params: &[SqlValue],
        timeout: Option<Duration>,
    ) -> Result<usize, SqlException> {
        self.prepare_execution(sql, params, timeout)?;
        let count = self
            .conn
            .execute(sql, params_from_iter(params.iter()))
            .map_err(to_exception)?;
        debug!(rows = count, "update executed");
        Ok(count)
    }
}
