//! Results consumers.
//!
//! A consumer drives a [`StandardRowReader`] over every row of a
//! [`JdbcValues`] source and collects the domain values, applying the
//! requested uniqueness semantic. It owns finalization: whatever happens in
//! the row loop, loads started by the result set are finished and the
//! values source is released.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::value::DomainValue;

use super::jdbc_values::JdbcValues;
use super::row_reader::{ExecutionContext, JdbcValuesSourceProcessingState, StandardRowReader};

/// How duplicate rows are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UniqueSemantic {
    /// Keep every row.
    #[default]
    None,
    /// Drop duplicates, keeping first-seen order.
    Filter,
    /// Fail on a duplicate.
    Assert,
    /// Rows are never deduplicated, even for entity results.
    Never,
    /// Filter entity results, keep everything else.
    Allow,
}

impl UniqueSemantic {
    /// The semantic actually applied to a reader.
    fn effective(self, reader: &StandardRowReader) -> UniqueSemantic {
        match self {
            UniqueSemantic::Allow if reader.is_entity_result() => UniqueSemantic::Filter,
            UniqueSemantic::Allow => UniqueSemantic::None,
            // Collection fetches legitimately repeat the owner on every row.
            UniqueSemantic::Assert if reader.has_collection_initializers() => UniqueSemantic::None,
            other => other,
        }
    }
}

/// Collects every row into a list.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListResultsConsumer {
    unique_semantic: UniqueSemantic,
}

impl ListResultsConsumer {
    pub fn new(unique_semantic: UniqueSemantic) -> Self {
        Self { unique_semantic }
    }

    pub fn unique_semantic(&self) -> UniqueSemantic {
        self.unique_semantic
    }

    pub fn consume(
        &self,
        values: &mut dyn JdbcValues,
        reader: &mut StandardRowReader,
        ctx: &mut ExecutionContext<'_>,
    ) -> QueryResult<Vec<DomainValue>> {
        let mut processing = JdbcValuesSourceProcessingState::new();
        ctx.pc.register_load_context();

        let result = self.read_rows(values, reader, &mut processing, ctx);

        let mut cleanup = Vec::new();
        if let Err(e) = processing.finish(ctx) {
            cleanup.push(e);
        }
        ctx.pc.deregister_load_context();
        if let Err(e) = values.release() {
            cleanup.push(e);
        }

        match result {
            Ok(rows) => match combine(cleanup) {
                Some(e) => Err(e),
                None => Ok(rows),
            },
            Err(primary) => Err(cleanup.into_iter().fold(primary, QueryError::with_suppressed)),
        }
    }

    fn read_rows(
        &self,
        values: &mut dyn JdbcValues,
        reader: &mut StandardRowReader,
        processing: &mut JdbcValuesSourceProcessingState,
        ctx: &mut ExecutionContext<'_>,
    ) -> QueryResult<Vec<DomainValue>> {
        let semantic = self.unique_semantic.effective(reader);
        let entity_result = reader.is_entity_result();
        let mut rows = Vec::new();
        let mut seen_entities = HashSet::new();

        while values.next()? {
            let row = reader.read_row(&*values, processing, ctx)?;
            match semantic {
                UniqueSemantic::None | UniqueSemantic::Never | UniqueSemantic::Allow => rows.push(row),
                UniqueSemantic::Filter | UniqueSemantic::Assert => {
                    let duplicate = match row.as_entity() {
                        Some(handle) if entity_result => !seen_entities.insert(handle),
                        _ => rows.contains(&row),
                    };
                    if !duplicate {
                        rows.push(row);
                    } else if semantic == UniqueSemantic::Assert {
                        return Err(QueryError::DuplicateRow {
                            result_type: reader.result_type_name(),
                        });
                    }
                }
            }
        }
        debug!(rows = rows.len(), semantic = ?semantic, "consumed result set");
        Ok(rows)
    }
}

/// The first cleanup error, with the rest attached as suppressed.
fn combine(errors: Vec<QueryError>) -> Option<QueryError> {
    let mut errors = errors.into_iter();
    let first = errors.next()?;
    Some(errors.fold(first, QueryError::with_suppressed))
}
