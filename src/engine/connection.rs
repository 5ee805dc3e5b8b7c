//! Connection layer - the boundary to a database driver.
//!
//! [`ResultSet`] is a scroll-insensitive cursor with JDBC positioning rules:
//! row numbers are 1-based, position 0 is before the first row and `n + 1`
//! after the last. [`MemoryConnection`] serves scripted results for tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::error::SqlException;
use crate::value::{JdbcType, SqlValue};

/// A cursor over the rows of an executed query.
pub trait ResultSet {
    fn next(&mut self) -> Result<bool, SqlException>;

    fn previous(&mut self) -> Result<bool, SqlException>;

    /// Move to `row` (1-based); negative values count back from the end.
    fn absolute(&mut self, row: i64) -> Result<bool, SqlException>;

    fn relative(&mut self, rows: i64) -> Result<bool, SqlException>;

    fn first(&mut self) -> Result<bool, SqlException> {
        self.absolute(1)
    }

    fn last(&mut self) -> Result<bool, SqlException> {
        self.absolute(-1)
    }

    /// Read `column` (1-based) of the current row as `jdbc_type`.
    fn get(&self, column: usize, jdbc_type: JdbcType) -> Result<SqlValue, SqlException>;

    fn close(&mut self) -> Result<(), SqlException>;
}

/// A database connection.
pub trait Connection {
    fn execute_query(
        &self,
        sql: &str,
        params: &[SqlValue],
        timeout: Option<Duration>,
    ) -> Result<Box<dyn ResultSet>, SqlException>;

    /// Execute a mutation and return the affected row count.
    fn execute_update(
        &self,
        sql: &str,
        params: &[SqlValue],
        timeout: Option<Duration>,
    ) -> Result<usize, SqlException>;
}

// =============================================================================
// In-memory result set
// =============================================================================

/// A fully materialized result set.
#[derive(Debug, Clone)]
pub struct MemoryResultSet {
    rows: Vec<Vec<SqlValue>>,
    cursor: usize,
    closed: bool,
    close_error: Option<SqlException>,
}

impl MemoryResultSet {
    pub fn new(rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            rows,
            cursor: 0,
            closed: false,
            close_error: None,
        }
    }

    /// Fail when closed.
    #[must_use]
    pub fn with_close_error(mut self, error: SqlException) -> Self {
        self.close_error = Some(error);
        self
    }

    fn on_row(&self) -> bool {
        self.cursor >= 1 && self.cursor <= self.rows.len()
    }

    fn ensure_open(&self) -> Result<(), SqlException> {
        if self.closed {
            return Err(SqlException::new("result set is closed").with_sql_state("24000"));
        }
        Ok(())
    }

    fn move_to(&mut self, position: i64) -> Result<bool, SqlException> {
        self.ensure_open()?;
        let after_last = self.rows.len() as i64 + 1;
        self.cursor = position.clamp(0, after_last) as usize;
        Ok(self.on_row())
    }
}

impl ResultSet for MemoryResultSet {
    fn next(&mut self) -> Result<bool, SqlException> {
        self.move_to(self.cursor as i64 + 1)
    }

    fn previous(&mut self) -> Result<bool, SqlException> {
        self.move_to(self.cursor as i64 - 1)
    }

    fn absolute(&mut self, row: i64) -> Result<bool, SqlException> {
        let position = if row < 0 {
            self.rows.len() as i64 + 1 + row
        } else {
            row
        };
        self.move_to(position)
    }

    fn relative(&mut self, rows: i64) -> Result<bool, SqlException> {
        self.move_to((self.cursor as i64).saturating_add(rows))
    }

    fn get(&self, column: usize, jdbc_type: JdbcType) -> Result<SqlValue, SqlException> {
        self.ensure_open()?;
        if !self.on_row() {
            return Err(SqlException::new("cursor is not on a row").with_sql_state("24000"));
        }
        let row = &self.rows[self.cursor - 1];
        let value = column
            .checked_sub(1)
            .and_then(|idx| row.get(idx))
            .ok_or_else(|| {
                SqlException::new(format!("column index {} out of range", column)).with_sql_state("07009")
            })?;
        value
            .clone()
            .coerce(jdbc_type)
            .map_err(|message| SqlException::new(message).with_sql_state("22018"))
    }

    fn close(&mut self) -> Result<(), SqlException> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.close_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Scripted connection
// =============================================================================

/// A statement received by a [`MemoryConnection`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub timeout: Option<Duration>,
}

enum Scripted {
    Rows(MemoryResultSet),
    Updated(usize),
    Error(SqlException),
}

/// A connection answering executions from a queue of scripted responses,
/// in order, and recording every statement it receives.
#[derive(Default)]
pub struct MemoryConnection {
    responses: RefCell<VecDeque<Scripted>>,
    executed: RefCell<Vec<ExecutedStatement>>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rows(&self, rows: Vec<Vec<SqlValue>>) {
        self.push_result_set(MemoryResultSet::new(rows));
    }

    pub fn push_result_set(&self, result_set: MemoryResultSet) {
        self.responses
            .borrow_mut()
            .push_back(Scripted::Rows(result_set));
    }

    pub fn push_update_count(&self, count: usize) {
        self.responses
            .borrow_mut()
            .push_back(Scripted::Updated(count));
    }

    pub fn push_error(&self, error: SqlException) {
        self.responses.borrow_mut().push_back(Scripted::Error(error));
    }

    /// Statements executed so far.
    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.executed.borrow().clone()
    }

    fn record(&self, sql: &str, params: &[SqlValue], timeout: Option<Duration>) -> Option<Scripted> {
        self.executed.borrow_mut().push(ExecutedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
            timeout,
        });
        self.responses.borrow_mut().pop_front()
    }
}

impl Connection for MemoryConnection {
    fn execute_query(
        &self,
        sql: &str,
        params: &[SqlValue],
        timeout: Option<Duration>,
    ) -> Result<Box<dyn ResultSet>, SqlException> {
        match self.record(sql, params, timeout) {
            Some(Scripted::Rows(rs)) => Ok(Box::new(rs)),
            Some(Scripted::Error(e)) => Err(e),
            Some(Scripted::Updated(_)) => Err(SqlException::new(
                "scripted response is an update count, not a result set",
            )),
            None => Ok(Box::new(MemoryResultSet::new(Vec::new()))),
        }
    }

    fn execute_update(
        &self,
        sql: &str,
        params: &[SqlValue],
        timeout: Option<Duration>,
    ) -> Result<usize, SqlException> {
        match self.record(sql, params, timeout) {
            Some(Scripted::Updated(n)) => Ok(n),
            Some(Scripted::Error(e)) => Err(e),
            Some(Scripted::Rows(_)) => Err(SqlException::new(
                "scripted response is a result set, not an update count",
            )),
            None => Ok(0),
        }
    }
}

/// A shared connection, so callers can keep inspecting it while a session
/// owns a handle.
impl<C: Connection + ?Sized> Connection for Rc<C> {
    fn execute_query(
        &self,
        sql: &str,
        params: &[SqlValue],
        timeout: Option<Duration>,
    ) -> Result<Box<dyn ResultSet>, SqlException> {
        (**self).execute_query(sql, params, timeout)
    }

    fn execute_update(
        &self,
        sql: &str,
        params: &[SqlValue],
        timeout: Option<Duration>,
    ) -> Result<usize, SqlException> {
        (**self).execute_update(sql, params, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> MemoryResultSet {
        MemoryResultSet::new(vec![
            vec![SqlValue::Int(1)],
            vec![SqlValue::Int(2)],
            vec![SqlValue::Int(3)],
        ])
    }

    #[test]
    fn test_cursor_positioning() {
        let mut rs = rows();
        assert!(rs.next().unwrap());
        assert_eq!(rs.get(1, JdbcType::Integer).unwrap(), SqlValue::Int(1));
        assert!(rs.last().unwrap());
        assert_eq!(rs.get(1, JdbcType::Integer).unwrap(), SqlValue::Int(3));
        assert!(!rs.next().unwrap());
        assert!(rs.previous().unwrap());
        assert!(rs.absolute(-2).unwrap());
        assert_eq!(rs.get(1, JdbcType::Integer).unwrap(), SqlValue::Int(2));
        assert!(!rs.relative(-5).unwrap());
        assert!(rs.get(1, JdbcType::Integer).is_err());
        assert!(rs.first().unwrap());
    }

    #[test]
    fn test_relative_move_saturates() {
        let mut rs = rows();
        assert!(rs.next().unwrap());
        assert!(!rs.relative(i64::MAX).unwrap());
        assert!(rs.previous().unwrap());
        assert_eq!(rs.get(1, JdbcType::Integer).unwrap(), SqlValue::Int(3));
        assert!(!rs.relative(i64::MIN).unwrap());
        assert!(rs.next().unwrap());
        assert_eq!(rs.get(1, JdbcType::Integer).unwrap(), SqlValue::Int(1));
    }

    #[test]
    fn test_get_coerces_and_reports_bad_columns() {
        let mut rs = MemoryResultSet::new(vec![vec![SqlValue::Int(1), SqlValue::Text("x".into())]]);
        rs.next().unwrap();
        assert_eq!(rs.get(1, JdbcType::Boolean).unwrap(), SqlValue::Bool(true));
        let err = rs.get(2, JdbcType::Integer).unwrap_err();
        assert_eq!(err.sql_state.as_deref(), Some("22018"));
        assert!(rs.get(3, JdbcType::Integer).is_err());
        assert!(rs.get(0, JdbcType::Integer).is_err());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut rs = rows().with_close_error(SqlException::new("boom"));
        assert!(rs.close().is_err());
        assert!(rs.close().is_ok());
        assert!(rs.next().is_err());
    }

    #[test]
    fn test_scripted_connection() {
        let conn = MemoryConnection::new();
        conn.push_rows(vec![vec![SqlValue::Int(7)]]);
        conn.push_update_count(2);

        let mut rs = conn
            .execute_query("SELECT 1", &[SqlValue::Int(1)], None)
            .unwrap();
        assert!(rs.next().unwrap());
        assert_eq!(conn.execute_update("DELETE FROM t", &[], None).unwrap(), 2);

        let executed = conn.executed();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0].params, vec![SqlValue::Int(1)]);
    }
}
