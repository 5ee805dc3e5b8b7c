//! Query execution.
//!
//! [`QueryExecutor`] ties translation, the connection and result processing
//! together. It is a cheap bundle of borrows handed out by a session for the
//! duration of one call, and it doubles as the [`EntityLoader`] used for
//! select fetches, batch loads and lazy initialization.
//!
//! ```text
//! EntityQuery ──build──► SelectStatement ──translate──► JdbcSelect
//!                                                        │ bind
//!                            cache hit ◄── QueryKey ◄────┤
//!                                │                       ▼ execute
//!                           CachedValues          ResultSetValues
//!                                └──────► ListResultsConsumer ◄┘
//! ```

use std::cell::Cell;
use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{QueryError, QueryResult, TranslationResult};
use crate::mapping::MappingModel;
use crate::query::{BuiltMutation, BuiltQuery, EntityQuery, QueryOptions, Restriction};
use crate::results::jdbc_values::convert_exception;
use crate::results::{
    CachedValues, EntityLoader, ExecutionContext, InstantiatorRegistry, ListResultsConsumer,
    QueryKey, QueryResultsCache, ResultSetValues, ScrollableResults, StandardRowReader,
    UniqueSemantic,
};
use crate::sql::{Dialect, JdbcOperation, JdbcParameterBindings, JdbcSelect, SqlAstTranslator};
use crate::value::{DomainValue, SqlValue};

use super::connection::Connection;
use super::persistence::{EntityHandle, EntityKey, PersistenceContext};

/// Alias of the root in loader queries.
const LOADER_ALIAS: &str = "e";

/// Counters for the statements a session ran.
#[derive(Debug, Default)]
pub struct SessionStatistics {
    queries_executed: Cell<usize>,
    mutations_executed: Cell<usize>,
    cache_hits: Cell<usize>,
    cache_misses: Cell<usize>,
    cache_puts: Cell<usize>,
}

impl SessionStatistics {
    pub fn queries_executed(&self) -> usize {
        self.queries_executed.get()
    }

    pub fn mutations_executed(&self) -> usize {
        self.mutations_executed.get()
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.get()
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses.get()
    }

    pub fn cache_puts(&self) -> usize {
        self.cache_puts.get()
    }

    fn increment(counter: &Cell<usize>) {
        counter.set(counter.get() + 1);
    }
}

#[derive(Clone, Copy)]
pub struct QueryExecutor<'s> {
    pub(crate) connection: &'s dyn Connection,
    pub(crate) model: &'s MappingModel,
    pub(crate) settings: &'s Settings,
    pub(crate) dialect: Dialect,
    pub(crate) registry: &'s InstantiatorRegistry,
    pub(crate) cache: Option<&'s dyn QueryResultsCache>,
    pub(crate) statistics: &'s SessionStatistics,
}

impl<'s> QueryExecutor<'s> {
    pub fn build_query(&self, query: &EntityQuery) -> TranslationResult<BuiltQuery> {
        query.build(self.model, &self.settings.results, self.registry)
    }

    pub fn translate_select(&self, built: &BuiltQuery) -> TranslationResult<JdbcSelect> {
        SqlAstTranslator::new(self.dialect, &self.settings.translation).translate_select(&built.statement)
    }

    pub fn list(&self, pc: &mut PersistenceContext, built: &BuiltQuery) -> QueryResult<Vec<DomainValue>> {
        let select = self.translate_select(built)?;
        self.list_select(pc, &select, &built.bindings, &built.options)
    }

    /// Execute a translated select and consume every row.
    pub fn list_select(
        &self,
        pc: &mut PersistenceContext,
        select: &JdbcSelect,
        bindings: &JdbcParameterBindings,
        options: &QueryOptions,
    ) -> QueryResult<Vec<DomainValue>> {
        let params = select.bind(bindings)?;
        let mut reader = StandardRowReader::new(&select.domain_results);
        let consumer = ListResultsConsumer::new(options.unique_semantic);
        let mut ctx = ExecutionContext::new(pc, self);

        let cache = self
            .cache
            .filter(|_| options.cacheable && self.settings.cache.enabled);
        let key = match cache {
            Some(_) => match QueryKey::new(&select.sql, &params) {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!(error = %e, "could not compute query cache key, bypassing the cache");
                    None
                }
            },
            None => None,
        };

        if let (Some(cache), Some(key)) = (cache, &key) {
            if let Some(rows) = cache.get(key) {
                SessionStatistics::increment(&self.statistics.cache_hits);
                let mut values = CachedValues::new(rows);
                return consumer.consume(&mut values, &mut reader, &mut ctx);
            }
            SessionStatistics::increment(&self.statistics.cache_misses);
        }

        let result_set = self
            .connection
            .execute_query(&select.sql, &params, options.timeout)
            .map_err(|e| convert_exception(self.dialect, &select.sql, e, None))?;
        SessionStatistics::increment(&self.statistics.queries_executed);
        let values = ResultSetValues::new(
            result_set,
            select.sql.clone(),
            select.selections.clone(),
            self.dialect,
        );

        match (cache, key) {
            (Some(cache), Some(key)) => {
                let mut values = values.capturing();
                let rows = consumer.consume(&mut values, &mut reader, &mut ctx)?;
                if let Some(captured) = values.take_captured_rows() {
                    cache.put(key, &select.affected_tables, captured);
                    SessionStatistics::increment(&self.statistics.cache_puts);
                }
                Ok(rows)
            }
            _ => {
                let mut values = values;
                consumer.consume(&mut values, &mut reader, &mut ctx)
            }
        }
    }

    /// Execute a select and return a cursor materializing rows on demand.
    pub fn scroll(self, pc: &'s mut PersistenceContext, built: &BuiltQuery) -> QueryResult<ScrollableResults<'s>> {
        let select = self.translate_select(built)?;
        let params = select.bind(&built.bindings)?;
        let result_set = self
            .connection
            .execute_query(&select.sql, &params, built.options.timeout)
            .map_err(|e| convert_exception(self.dialect, &select.sql, e, None))?;
        SessionStatistics::increment(&self.statistics.queries_executed);

        let values = ResultSetValues::new(result_set, select.sql.clone(), select.selections, self.dialect);
        let reader = StandardRowReader::new(&select.domain_results);
        Ok(ScrollableResults::new(Box::new(values), reader, pc, Box::new(self)))
    }

    /// Run every statement of a mutation in order and invalidate cached
    /// results reading the touched tables. Returns the row count of the last
    /// statement, which targets the entity's primary table.
    pub fn execute(&self, mutation: &BuiltMutation) -> QueryResult<usize> {
        let mut affected = BTreeSet::new();
        let mut count = 0;
        for statement in &mutation.statements {
            let operation = SqlAstTranslator::new(self.dialect, &self.settings.translation).translate(statement)?;
            let JdbcOperation::Mutation(jdbc) = operation else {
                return Err(QueryError::IllegalState(format!(
                    "mutation of {} produced a select",
                    mutation.entity
                )));
            };
            let params = jdbc.bind(&mutation.bindings)?;
            count = self
                .connection
                .execute_update(&jdbc.sql, &params, None)
                .map_err(|e| convert_exception(self.dialect, &jdbc.sql, e, None))?;
            SessionStatistics::increment(&self.statistics.mutations_executed);
            debug!(entity = %mutation.entity, kind = ?jdbc.kind, rows = count, "mutation executed");
            affected.extend(jdbc.affected_tables);
        }
        if let Some(cache) = self.cache {
            cache.invalidate(&affected);
        }
        Ok(count)
    }

    /// The managed instance for `id`, loading it when it is not initialized.
    pub fn find(
        &self,
        pc: &mut PersistenceContext,
        entity: &str,
        id: SqlValue,
    ) -> QueryResult<Option<EntityHandle>> {
        let key = EntityKey::new(entity, id);
        let initialized = |pc: &PersistenceContext| pc.find(&key).filter(|h| pc.entity(*h).is_initialized());
        if let Some(handle) = initialized(&*pc) {
            return Ok(Some(handle));
        }
        self.load(pc, std::slice::from_ref(&key))?;
        Ok(initialized(&*pc))
    }
}

impl EntityLoader for QueryExecutor<'_> {
    fn load(&self, pc: &mut PersistenceContext, keys: &[EntityKey]) -> QueryResult<()> {
        let Some(first) = keys.first() else {
            return Ok(());
        };
        let mapping = self.model.entity(&first.entity)?;
        debug!(entity = %mapping.name, count = keys.len(), "loading entities by key");

        let ids: Vec<SqlValue> = keys.iter().map(|k| k.id.clone()).collect();
        let query = EntityQuery::from(mapping.name.clone(), LOADER_ALIAS)
            .filter(Restriction::in_list(&mapping.identifier.name, ids))
            .unique(UniqueSemantic::Filter);
        let built = self.build_query(&query)?;
        self.list(pc, &built)?;
        Ok(())
    }

    fn batch_size(&self, entity: &str) -> usize {
        self.model
            .find_entity(entity)
            .and_then(|m| m.batch_size)
            .unwrap_or(self.settings.results.default_batch_size)
    }
}
