//! Sessions.
//!
//! A [`Session`] owns a connection, the mapping model and a persistence
//! context. Entities read through one session are identity-managed: the same
//! key always yields the same [`EntityHandle`].
//!
//! # Example
//!
//! ```ignore
//! let mut session = Session::open(Settings::load()?, "dev", model)?;
//! let orders = session.list(&EntityQuery::from("Order", "o").join_fetch("customer"))?;
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{Driver, Settings};
use crate::error::{ExecutionError, QueryError, QueryResult, SqlErrorKind, TranslationError};
use crate::mapping::{AttributeMapping, MappingModel};
use crate::query::{
    BuiltMutation, EntityDelete, EntityQuery, EntityUpdate, QueryOptions, Restriction,
};
use crate::results::{
    EntityLoader, InMemoryQueryCache, InstantiatorRegistry, QueryResultsCache, ScrollableResults,
    UniqueSemantic,
};
use crate::sql::ast::SelectStatement;
use crate::sql::{Dialect, JdbcParameterBindings, JdbcSelect, SqlAstTranslator};
use crate::value::{DomainValue, SqlValue};

use super::connection::Connection;
use super::executor::{QueryExecutor, SessionStatistics};
use super::persistence::{
    CollectionHandle, EntityHandle, EntityInstance, PersistenceContext, PersistentCollection,
};
use super::sqlite::SqliteConnection;

const MEMORY_URL: &str = ":memory:";

pub struct Session {
    connection: Box<dyn Connection>,
    model: MappingModel,
    settings: Settings,
    dialect: Dialect,
    registry: InstantiatorRegistry,
    cache: Option<Arc<dyn QueryResultsCache>>,
    pc: PersistenceContext,
    statistics: SessionStatistics,
}

impl Session {
    /// Create a session over `connection`. The dialect comes from the
    /// translation settings and a private cache is created when caching is
    /// enabled.
    pub fn new(connection: Box<dyn Connection>, model: MappingModel, settings: Settings) -> QueryResult<Self> {
        model.validate()?;
        let cache: Option<Arc<dyn QueryResultsCache>> = if settings.cache.enabled {
            Some(Arc::new(InMemoryQueryCache::new(settings.cache.max_entries)))
        } else {
            None
        };
        Ok(Self {
            connection,
            model,
            dialect: settings.translation.dialect,
            settings,
            registry: InstantiatorRegistry::new(),
            cache,
            pc: PersistenceContext::new(),
            statistics: SessionStatistics::default(),
        })
    }

    /// Open the named connection from `settings`.
    pub fn open(settings: Settings, connection: &str, model: MappingModel) -> QueryResult<Self> {
        let connection_settings = settings.get_connection(connection)?;
        let driver = connection_settings.driver_type()?;
        let url = connection_settings.resolved_url()?;

        let opened = match driver {
            Driver::Sqlite if url == MEMORY_URL => SqliteConnection::open_in_memory(),
            Driver::Sqlite => SqliteConnection::open(&url),
        }
        .map_err(|e| {
            ExecutionError::new(SqlErrorKind::ConnectionFailure, e.message.clone()).with_source(e)
        })?;
        info!(connection = %connection, driver = driver.as_str(), "opened session");

        Ok(Self::new(Box::new(opened), model, settings)?.with_dialect(driver.dialect()))
    }

    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: InstantiatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Share a query-results cache with other sessions.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn QueryResultsCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn split(&mut self) -> (QueryExecutor<'_>, &mut PersistenceContext) {
        let executor = QueryExecutor {
            connection: self.connection.as_ref(),
            model: &self.model,
            settings: &self.settings,
            dialect: self.dialect,
            registry: &self.registry,
            cache: self.cache.as_deref(),
            statistics: &self.statistics,
        };
        (executor, &mut self.pc)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn list(&mut self, query: &EntityQuery) -> QueryResult<Vec<DomainValue>> {
        let (executor, pc) = self.split();
        let built = executor.build_query(query)?;
        executor.list(pc, &built)
    }

    /// Execute a select statement built outside the query layer.
    pub fn list_statement(
        &mut self,
        statement: &SelectStatement,
        bindings: &JdbcParameterBindings,
        options: &QueryOptions,
    ) -> QueryResult<Vec<DomainValue>> {
        let select = SqlAstTranslator::new(self.dialect, &self.settings.translation).translate_select(statement)?;
        let (executor, pc) = self.split();
        executor.list_select(pc, &select, bindings, options)
    }

    /// The SQL and parameter binders `query` would execute with.
    pub fn translate(&self, query: &EntityQuery) -> QueryResult<JdbcSelect> {
        let built = query.build(&self.model, &self.settings.results, &self.registry)?;
        let select = SqlAstTranslator::new(self.dialect, &self.settings.translation).translate_select(&built.statement)?;
        Ok(select)
    }

    /// Execute `query` through a scrollable cursor. Batch fetching is
    /// disabled for the query's own associations.
    pub fn scroll(&mut self, query: &EntityQuery) -> QueryResult<ScrollableResults<'_>> {
        let query = query.clone().scroll();
        let (executor, pc) = self.split();
        let built = executor.build_query(&query)?;
        executor.scroll(pc, &built)
    }

    /// The managed instance of `entity` with identifier `id`.
    pub fn find(&mut self, entity: &str, id: impl Into<SqlValue>) -> QueryResult<Option<EntityHandle>> {
        let (executor, pc) = self.split();
        executor.find(pc, entity, id.into())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn update(&mut self, update: &EntityUpdate) -> QueryResult<usize> {
        let mutation = update.build(&self.model)?;
        self.execute(&mutation)
    }

    pub fn delete(&mut self, delete: &EntityDelete) -> QueryResult<usize> {
        let mutation = delete.build(&self.model)?;
        self.execute(&mutation)
    }

    pub fn execute(&mut self, mutation: &BuiltMutation) -> QueryResult<usize> {
        let (executor, _) = self.split();
        executor.execute(mutation)
    }

    // =========================================================================
    // Lazy initialization
    // =========================================================================

    /// Load an uninitialized entity reference, together with other queued
    /// references of the same entity up to its batch size.
    pub fn initialize(&mut self, handle: EntityHandle) -> QueryResult<()> {
        if self.pc.entity(handle).is_initialized() {
            return Ok(());
        }
        let key = self.pc.entity(handle).key.clone();
        let (executor, pc) = self.split();
        let size = executor.batch_size(&key.entity).max(1);
        let mut keys = vec![key.clone()];
        keys.extend(
            pc.take_batch(&key.entity, size - 1)
                .into_iter()
                .filter(|k| *k != key),
        );
        executor.load(pc, &keys)?;

        if self.pc.entity(handle).is_initialized() {
            Ok(())
        } else {
            Err(QueryError::EntityNotFound {
                entity: key.entity,
                id: key.id,
            })
        }
    }

    /// Load the elements of an uninitialized collection, in the collection's
    /// declared order.
    pub fn initialize_collection(&mut self, handle: CollectionHandle) -> QueryResult<()> {
        let collection = self.pc.collection(handle);
        if collection.initialized {
            return Ok(());
        }
        let role = collection.role.clone();
        let owner = collection.owner.clone();

        let (owner_entity, attribute_name) = role
            .rsplit_once('.')
            .ok_or_else(|| QueryError::IllegalState(format!("malformed collection role `{}`", role)))?;
        let attribute = match self.model.entity(owner_entity)?.attribute(attribute_name) {
            Some(AttributeMapping::Collection(attribute)) => attribute.clone(),
            _ => {
                return Err(TranslationError::UnknownAttribute {
                    entity: owner_entity.to_string(),
                    attribute: attribute_name.to_string(),
                }
                .into())
            }
        };

        let mut query = EntityQuery::from(attribute.element_entity.clone(), "e")
            .filter(Restriction::eq(&attribute.mapped_by, owner.id.clone()))
            .unique(UniqueSemantic::Filter);
        for (path, order) in &attribute.order_by {
            query = query.order_by(path, *order);
        }
        let elements = self.list(&query)?;
        debug!(role = %role, owner = %owner, elements = elements.len(), "initialized collection");

        let collection = self.pc.collection_mut(handle);
        collection.elements = elements;
        collection.initialized = true;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn entity(&self, handle: EntityHandle) -> &EntityInstance {
        self.pc.entity(handle)
    }

    pub fn collection(&self, handle: CollectionHandle) -> &PersistentCollection {
        self.pc.collection(handle)
    }

    pub fn persistence_context(&self) -> &PersistenceContext {
        &self.pc
    }

    pub fn statistics(&self) -> &SessionStatistics {
        &self.statistics
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn model(&self) -> &MappingModel {
        &self.model
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Detach every managed instance.
    pub fn clear(&mut self) {
        self.pc.clear();
    }
}
