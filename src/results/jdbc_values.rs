//! Row sources for result processing.
//!
//! [`JdbcValues`] exposes the current row as a values array indexed by
//! selection position. [`ResultSetValues`] reads from a live [`ResultSet`];
//! [`CachedValues`] replays rows from the query-results cache.

use tracing::{trace, warn};

use crate::engine::connection::ResultSet;
use crate::error::{ExecutionError, QueryResult, SqlException};
use crate::sql::dialect::{Dialect, SqlDialect};
use crate::sql::SelectionDescriptor;
use crate::value::SqlValue;

/// A positioned source of row values.
pub trait JdbcValues {
    fn next(&mut self) -> QueryResult<bool>;

    fn previous(&mut self) -> QueryResult<bool>;

    /// Move by `rows` relative to the current row.
    fn scroll(&mut self, rows: i64) -> QueryResult<bool>;

    /// Move to the 1-based `row`; negative values count back from the end.
    fn position(&mut self, row: i64) -> QueryResult<bool>;

    fn first(&mut self) -> QueryResult<bool> {
        self.position(1)
    }

    fn last(&mut self) -> QueryResult<bool> {
        self.position(-1)
    }

    /// Values of the current row, indexed by selection position.
    fn current_row(&self) -> &[SqlValue];

    fn value(&self, position: usize) -> &SqlValue {
        self.current_row().get(position).unwrap_or(&SqlValue::Null)
    }

    /// Release the underlying resources. Calling more than once is a no-op.
    fn release(&mut self) -> QueryResult<()>;
}

// =============================================================================
// Result set values
// =============================================================================

pub struct ResultSetValues {
    result_set: Box<dyn ResultSet>,
    sql: String,
    selections: Vec<SelectionDescriptor>,
    dialect: Dialect,
    buffer: Vec<SqlValue>,
    captured: Option<Vec<Vec<SqlValue>>>,
    rows_read: usize,
    released: bool,
}

impl ResultSetValues {
    pub fn new(
        result_set: Box<dyn ResultSet>,
        sql: impl Into<String>,
        selections: Vec<SelectionDescriptor>,
        dialect: Dialect,
    ) -> Self {
        let width = selections
            .iter()
            .map(|s| s.position + 1)
            .max()
            .unwrap_or(0);
        Self {
            result_set,
            sql: sql.into(),
            selections,
            dialect,
            buffer: vec![SqlValue::Null; width],
            captured: None,
            rows_read: 0,
            released: false,
        }
    }

    /// Keep a copy of every row read, for the query-results cache.
    #[must_use]
    pub fn capturing(mut self) -> Self {
        self.captured = Some(Vec::new());
        self
    }

    pub fn take_captured_rows(&mut self) -> Option<Vec<Vec<SqlValue>>> {
        self.captured.take()
    }

    /// Number of rows extracted so far.
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Run a cursor movement and, when it lands on a row, extract that row.
    fn advance<F>(&mut self, advancer: F) -> QueryResult<bool>
    where
        F: FnOnce(&mut dyn ResultSet) -> Result<bool, SqlException>,
    {
        let on_row = advancer(self.result_set.as_mut()).map_err(|e| self.convert(e, None))?;
        if on_row {
            self.read_current_row()?;
        }
        Ok(on_row)
    }

    fn read_current_row(&mut self) -> QueryResult<()> {
        for selection in &self.selections {
            let column = selection.position + 1;
            match self.result_set.get(column, selection.jdbc_type) {
                Ok(value) => self.buffer[selection.position] = value,
                Err(e) => {
                    return Err(convert_exception(self.dialect, &self.sql, e, Some(column)).into())
                }
            }
        }
        self.rows_read += 1;
        if let Some(captured) = &mut self.captured {
            captured.push(self.buffer.clone());
        }
        trace!(row = self.rows_read, "extracted row");
        Ok(())
    }

    fn convert(&self, exception: SqlException, position: Option<usize>) -> crate::error::QueryError {
        convert_exception(self.dialect, &self.sql, exception, position).into()
    }
}

/// Convert a driver exception into an [`ExecutionError`] carrying the SQL.
pub fn convert_exception(
    dialect: Dialect,
    sql: &str,
    exception: SqlException,
    position: Option<usize>,
) -> ExecutionError {
    let kind = dialect.convert_exception(&exception);
    let mut error = ExecutionError::new(kind, exception.message.clone())
        .with_sql(sql)
        .with_source(exception);
    if let Some(position) = position {
        error = error.with_position(position);
    }
    error
}

impl JdbcValues for ResultSetValues {
    fn next(&mut self) -> QueryResult<bool> {
        self.advance(|rs| rs.next())
    }

    fn previous(&mut self) -> QueryResult<bool> {
        self.advance(|rs| rs.previous())
    }

    fn scroll(&mut self, rows: i64) -> QueryResult<bool> {
        self.advance(|rs| rs.relative(rows))
    }

    fn position(&mut self, row: i64) -> QueryResult<bool> {
        self.advance(|rs| rs.absolute(row))
    }

    fn first(&mut self) -> QueryResult<bool> {
        self.advance(|rs| rs.first())
    }

    fn last(&mut self) -> QueryResult<bool> {
        self.advance(|rs| rs.last())
    }

    fn current_row(&self) -> &[SqlValue] {
        &self.buffer
    }

    fn release(&mut self) -> QueryResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.result_set
            .close()
            .map_err(|e| self.convert(e, None))
    }
}

impl Drop for ResultSetValues {
    fn drop(&mut self) {
        if !self.released {
            warn!(sql = %self.sql, "result set was not released, closing it");
            self.released = true;
            if let Err(e) = self.result_set.close() {
                warn!(error = %e, "failed to close result set");
            }
        }
    }
}

// =============================================================================
// Cached values
// =============================================================================

/// Rows replayed from the query-results cache.
#[derive(Debug, Clone)]
pub struct CachedValues {
    rows: Vec<Vec<SqlValue>>,
    /// 0 before the first row, `rows.len() + 1` after the last.
    cursor: usize,
    empty: Vec<SqlValue>,
}

impl CachedValues {
    pub fn new(rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            rows,
            cursor: 0,
            empty: Vec::new(),
        }
    }

    fn move_to(&mut self, position: i64) -> bool {
        self.cursor = position.clamp(0, self.rows.len() as i64 + 1) as usize;
        self.cursor >= 1 && self.cursor <= self.rows.len()
    }
}

impl JdbcValues for CachedValues {
    fn next(&mut self) -> QueryResult<bool> {
        Ok(self.move_to(self.cursor as i64 + 1))
    }

    fn previous(&mut self) -> QueryResult<bool> {
        Ok(self.move_to(self.cursor as i64 - 1))
    }

    fn scroll(&mut self, rows: i64) -> QueryResult<bool> {
        Ok(self.move_to((self.cursor as i64).saturating_add(rows)))
    }

    fn position(&mut self, row: i64) -> QueryResult<bool> {
        let position = if row < 0 {
            self.rows.len() as i64 + 1 + row
        } else {
            row
        };
        Ok(self.move_to(position))
    }

    fn current_row(&self) -> &[SqlValue] {
        match self.cursor.checked_sub(1).and_then(|i| self.rows.get(i)) {
            Some(row) => row,
            None => &self.empty,
        }
    }

    fn release(&mut self) -> QueryResult<()> {
        Ok(())
    }
}
