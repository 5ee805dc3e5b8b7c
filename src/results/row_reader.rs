//! Row reading.
//!
//! [`StandardRowReader::read_row`] drives the initializer phases for one row:
//!
//! ```text
//!   resolve_key ──► resolve_instance ──► initialize ──► assemble ──► finish_up_row
//!   (all inits)     (all inits)          (hydrate)      (results)    (batch, reset)
//! ```
//!
//! State that outlives a row (entities and collections being loaded by this
//! result set) lives in [`JdbcValuesSourceProcessingState`].

use std::collections::BTreeMap;

use tracing::trace;

use crate::engine::persistence::{
    CollectionHandle, EntityHandle, EntityKey, EntityStatus, PersistenceContext,
};
use crate::error::QueryResult;
use crate::value::{DomainValue, ValueType};

use super::assembler::Assembler;
use super::graph::DomainResult;
use super::initializer::{InitializerGraph, InitializerStates};
use super::jdbc_values::JdbcValues;

/// Loads entities by key into a persistence context.
pub trait EntityLoader {
    /// Load and hydrate every entity in `keys`. Keys with no row stay
    /// uninitialized.
    fn load(&self, pc: &mut PersistenceContext, keys: &[EntityKey]) -> QueryResult<()>;

    /// Number of keys to load per statement for `entity`.
    fn batch_size(&self, entity: &str) -> usize;
}

/// Session state available to result processing.
pub struct ExecutionContext<'a> {
    pub pc: &'a mut PersistenceContext,
    pub loader: &'a dyn EntityLoader,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(pc: &'a mut PersistenceContext, loader: &'a dyn EntityLoader) -> Self {
        Self { pc, loader }
    }

    /// Load the still uninitialized entities among `keys`, in chunks of
    /// each entity's batch size.
    pub fn load_pending(&mut self, keys: Vec<EntityKey>) -> QueryResult<()> {
        let mut by_entity: BTreeMap<String, Vec<EntityKey>> = BTreeMap::new();
        for key in keys {
            let pending = self
                .pc
                .find(&key)
                .map_or(true, |h| self.pc.entity(h).status == EntityStatus::Uninitialized);
            if pending {
                let group = by_entity.entry(key.entity.clone()).or_default();
                if !group.contains(&key) {
                    group.push(key);
                }
            }
        }
        for (entity, keys) in by_entity {
            let size = self.loader.batch_size(&entity).max(1);
            for chunk in keys.chunks(size) {
                self.loader.load(self.pc, chunk)?;
            }
        }
        Ok(())
    }

    /// Drain the persistence context's batch queue.
    pub fn run_batch_loads(&mut self) -> QueryResult<()> {
        while let Some(entity) = self.pc.next_batch_entity().map(str::to_string) {
            let size = self.loader.batch_size(&entity).max(1);
            let keys = self.pc.take_batch(&entity, size);
            if !keys.is_empty() {
                trace!(entity = %entity, count = keys.len(), "batch loading");
                self.loader.load(self.pc, &keys)?;
            }
        }
        Ok(())
    }
}

/// State of one result set across all of its rows.
#[derive(Debug, Default)]
pub struct JdbcValuesSourceProcessingState {
    loading_entities: Vec<EntityHandle>,
    loading_collections: Vec<CollectionHandle>,
    /// Keys collected during the current row for `BatchInitialize` fetches.
    row_batch: Vec<EntityKey>,
}

impl JdbcValuesSourceProcessingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_loading_entity(&mut self, handle: EntityHandle) {
        self.loading_entities.push(handle);
    }

    /// Claim a collection for loading by this result set.
    pub fn claim_collection(&mut self, handle: CollectionHandle) {
        if !self.loading_collections.contains(&handle) {
            self.loading_collections.push(handle);
        }
    }

    pub fn is_loading_collection(&self, handle: CollectionHandle) -> bool {
        self.loading_collections.contains(&handle)
    }

    pub fn has_loading_collections(&self) -> bool {
        !self.loading_collections.is_empty()
    }

    pub fn defer_row_load(&mut self, key: EntityKey) {
        self.row_batch.push(key);
    }

    pub fn take_row_batch(&mut self) -> Vec<EntityKey> {
        std::mem::take(&mut self.row_batch)
    }

    /// Complete every load started by this result set: mark entities loaded,
    /// collections initialized, then run queued batch loads.
    pub fn finish(&mut self, ctx: &mut ExecutionContext<'_>) -> QueryResult<()> {
        for handle in self.loading_entities.drain(..) {
            ctx.pc.finish_loading(handle);
        }
        for handle in self.loading_collections.drain(..) {
            ctx.pc.collection_mut(handle).initialized = true;
        }
        let pending = std::mem::take(&mut self.row_batch);
        ctx.load_pending(pending)?;
        ctx.run_batch_loads()
    }
}

/// Everything an initializer can reach while processing the current row.
pub struct RowProcessingState<'r, 'c> {
    pub values: &'r dyn JdbcValues,
    pub processing: &'r mut JdbcValuesSourceProcessingState,
    pub ctx: &'r mut ExecutionContext<'c>,
}

/// Reads rows into domain values through an initializer graph.
#[derive(Debug)]
pub struct StandardRowReader {
    graph: InitializerGraph,
    states: InitializerStates,
    assemblers: Vec<Assembler>,
    result_types: Vec<ValueType>,
}

impl StandardRowReader {
    pub fn new(domain_results: &[DomainResult]) -> Self {
        let (graph, assemblers) = InitializerGraph::build(domain_results);
        let states = InitializerStates::new(graph.len());
        Self {
            graph,
            states,
            assemblers,
            result_types: domain_results.iter().map(DomainResult::result_type).collect(),
        }
    }

    /// Whether any initializer loads a collection from the rows.
    pub fn has_collection_initializers(&self) -> bool {
        self.graph.has_collection_initializers()
    }

    /// Whether the row value is a single entity.
    pub fn is_entity_result(&self) -> bool {
        matches!(self.result_types.as_slice(), [ValueType::Entity(_)])
    }

    /// Display name of the row type, for error messages.
    pub fn result_type_name(&self) -> String {
        match self.result_types.as_slice() {
            [single] => single.to_string(),
            many => format!(
                "({})",
                many.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// Read the current row. A single domain result is returned as is;
    /// several become a [`DomainValue::Tuple`].
    pub fn read_row(
        &mut self,
        values: &dyn JdbcValues,
        processing: &mut JdbcValuesSourceProcessingState,
        ctx: &mut ExecutionContext<'_>,
    ) -> QueryResult<DomainValue> {
        self.states.reset();
        let mut row = RowProcessingState {
            values,
            processing,
            ctx,
        };
        let result = self.process_row(&mut row);
        let finished = self.finish_up_row(&mut row);
        let value = result?;
        finished?;
        Ok(value)
    }

    fn process_row(&mut self, row: &mut RowProcessingState<'_, '_>) -> QueryResult<DomainValue> {
        for id in self.graph.ids() {
            self.graph.resolve_key(&mut self.states, row, id);
        }
        for id in self.graph.ids() {
            self.graph.resolve_instance(&mut self.states, row, id)?;
        }
        for id in self.graph.ids() {
            self.graph.initialize_instance(&mut self.states, row, id)?;
        }

        let mut results = Vec::with_capacity(self.assemblers.len());
        for assembler in &self.assemblers {
            results.push(assembler.assemble(&self.graph, &mut self.states, row)?);
        }
        Ok(match results.len() {
            1 => results.remove(0),
            _ => DomainValue::Tuple(results),
        })
    }

    fn finish_up_row(&mut self, row: &mut RowProcessingState<'_, '_>) -> QueryResult<()> {
        self.states.reset();
        let keys = row.processing.take_row_batch();
        if keys.is_empty() {
            return Ok(());
        }
        row.ctx.load_pending(keys)
    }
}
