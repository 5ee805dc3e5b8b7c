//! Scrollable results.
//!
//! Rows are materialized one at a time as the cursor moves. Loads started by
//! the rows read so far are finished when the results are closed.

use tracing::warn;

use crate::engine::persistence::PersistenceContext;
use crate::error::{QueryError, QueryResult};
use crate::value::DomainValue;

use super::jdbc_values::JdbcValues;
use super::row_reader::{EntityLoader, ExecutionContext, JdbcValuesSourceProcessingState, StandardRowReader};

pub struct ScrollableResults<'s> {
    values: Box<dyn JdbcValues + 's>,
    reader: StandardRowReader,
    processing: JdbcValuesSourceProcessingState,
    pc: &'s mut PersistenceContext,
    loader: Box<dyn EntityLoader + 's>,
    current: Option<DomainValue>,
    closed: bool,
}

impl<'s> ScrollableResults<'s> {
    pub fn new(
        values: Box<dyn JdbcValues + 's>,
        reader: StandardRowReader,
        pc: &'s mut PersistenceContext,
        loader: Box<dyn EntityLoader + 's>,
    ) -> Self {
        pc.register_load_context();
        Self {
            values,
            reader,
            processing: JdbcValuesSourceProcessingState::new(),
            pc,
            loader,
            current: None,
            closed: false,
        }
    }

    pub fn next(&mut self) -> QueryResult<bool> {
        self.move_cursor(|v| v.next())
    }

    pub fn previous(&mut self) -> QueryResult<bool> {
        self.move_cursor(|v| v.previous())
    }

    /// Move by `rows` relative to the current row.
    pub fn scroll(&mut self, rows: i64) -> QueryResult<bool> {
        self.move_cursor(|v| v.scroll(rows))
    }

    /// Move to the 1-based `row`; negative values count from the end.
    pub fn position(&mut self, row: i64) -> QueryResult<bool> {
        self.move_cursor(|v| v.position(row))
    }

    pub fn first(&mut self) -> QueryResult<bool> {
        self.move_cursor(|v| v.first())
    }

    pub fn last(&mut self) -> QueryResult<bool> {
        self.move_cursor(|v| v.last())
    }

    /// The value of the current row, if the cursor is on one.
    pub fn get(&self) -> Option<&DomainValue> {
        self.current.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Finish pending loads and release the cursor. Closing twice is a no-op.
    pub fn close(&mut self) -> QueryResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.current = None;

        let mut ctx = ExecutionContext::new(self.pc, self.loader.as_ref());
        let finished = self.processing.finish(&mut ctx);
        self.pc.deregister_load_context();
        let released = self.values.release();
        match (finished, released) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(primary), Err(cleanup)) => Err(primary.with_suppressed(cleanup)),
        }
    }

    fn move_cursor<F>(&mut self, mover: F) -> QueryResult<bool>
    where
        F: FnOnce(&mut dyn JdbcValues) -> QueryResult<bool>,
    {
        if self.closed {
            return Err(QueryError::IllegalState("scrollable results are closed".into()));
        }
        self.current = None;
        if !mover(self.values.as_mut())? {
            return Ok(false);
        }
        let mut ctx = ExecutionContext::new(self.pc, self.loader.as_ref());
        let row = self
            .reader
            .read_row(self.values.as_ref(), &mut self.processing, &mut ctx)?;
        self.current = Some(row);
        Ok(true)
    }
}

impl Drop for ScrollableResults<'_> {
    fn drop(&mut self) {
        if !self.closed {
            warn!("scrollable results were not closed, closing them");
            if let Err(e) = self.close() {
                warn!(error = %e, "failed to close scrollable results");
            }
        }
    }
}
