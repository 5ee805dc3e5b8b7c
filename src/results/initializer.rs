//! Initializers - per-path units that resolve and hydrate instances.
//!
//! Specs are built once from the domain results and are immutable; the
//! mutable per-row state lives beside them in [`InitializerStates`], indexed
//! by the same [`InitializerId`]. There is exactly one initializer per
//! navigable path.

use std::collections::HashMap;

use crate::engine::persistence::{EntityHandle, EntityKey, EntityStatus};
use crate::error::QueryResult;
use crate::path::NavigablePath;
use crate::value::{DomainValue, EmbeddableValue, JdbcType, SqlValue};

use super::assembler::Assembler;
use super::graph::{
    BatchMode, DomainResult, EmbeddableGraph, EntityGraph, Fetch, KeyedFetch, PluralFetchKind,
};
use super::row_reader::RowProcessingState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InitializerId(pub usize);

/// Where an attribute's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeSource {
    Basic { name: String, position: usize },
    Initializer { name: String, id: InitializerId },
}

impl AttributeSource {
    fn name(&self) -> &str {
        match self {
            AttributeSource::Basic { name, .. } | AttributeSource::Initializer { name, .. } => name,
        }
    }
}

/// A to-one key read from the row.
#[derive(Debug, Clone, PartialEq)]
pub struct KeySource {
    pub entity: String,
    pub position: usize,
    pub jdbc_type: JdbcType,
}

impl From<&KeyedFetch> for KeySource {
    fn from(fetch: &KeyedFetch) -> Self {
        Self {
            entity: fetch.entity.clone(),
            position: fetch.fk_position,
            jdbc_type: fetch.fk_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InitializerKind {
    /// An entity hydrated from this row.
    Entity {
        key: KeySource,
        attributes: Vec<AttributeSource>,
    },
    Embeddable {
        type_name: String,
        attributes: Vec<AttributeSource>,
    },
    /// An entity loaded by a subsequent select.
    EntitySelect { key: KeySource, batch_mode: BatchMode },
    /// An entity left as a reference.
    EntityDelayed { key: KeySource },
    /// An entity already being initialized by an ancestor.
    Circular {
        key: KeySource,
        referenced: InitializerId,
    },
    /// A collection owned by the entity of `owner`. Joined collections carry
    /// their element initializer.
    Collection {
        role: String,
        owner: InitializerId,
        element: Option<InitializerId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitializerSpec {
    pub navigable_path: NavigablePath,
    pub parent: Option<InitializerId>,
    pub kind: InitializerKind,
}

/// Per-row state of one initializer.
#[derive(Debug, Clone, Default)]
struct InitializerState {
    key: Option<EntityKey>,
    instance: Option<DomainValue>,
    /// Set when this initializer claimed the instance for hydration.
    hydrate: Option<EntityHandle>,
}

#[derive(Debug, Default)]
pub struct InitializerStates {
    states: Vec<InitializerState>,
}

impl InitializerStates {
    pub fn new(len: usize) -> Self {
        Self {
            states: vec![InitializerState::default(); len],
        }
    }

    /// Return every initializer to idle.
    pub fn reset(&mut self) {
        for state in &mut self.states {
            *state = InitializerState::default();
        }
    }

    fn get(&self, id: InitializerId) -> &InitializerState {
        &self.states[id.0]
    }

    fn get_mut(&mut self, id: InitializerId) -> &mut InitializerState {
        &mut self.states[id.0]
    }
}

/// The initializer arena for one set of domain results.
#[derive(Debug, Default)]
pub struct InitializerGraph {
    specs: Vec<InitializerSpec>,
    by_path: HashMap<NavigablePath, InitializerId>,
}

impl InitializerGraph {
    /// Build the initializers and the assembler of each domain result.
    pub fn build(results: &[DomainResult]) -> (Self, Vec<Assembler>) {
        let mut graph = Self::default();
        let assemblers = results.iter().map(|r| graph.assembler_for(r)).collect();
        (graph, assemblers)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = InitializerId> {
        (0..self.specs.len()).map(InitializerId)
    }

    pub fn spec(&self, id: InitializerId) -> &InitializerSpec {
        &self.specs[id.0]
    }

    pub fn find(&self, path: &NavigablePath) -> Option<InitializerId> {
        self.by_path.get(path).copied()
    }

    pub fn has_collection_initializers(&self) -> bool {
        self.specs.iter().any(|s| {
            matches!(
                s.kind,
                InitializerKind::Collection {
                    element: Some(_),
                    ..
                }
            )
        })
    }

    // =========================================================================
    // Construction
    // =========================================================================

    fn assembler_for(&mut self, result: &DomainResult) -> Assembler {
        match result {
            DomainResult::Basic(basic) => Assembler::Basic {
                position: basic.position,
            },
            DomainResult::Entity(graph) => Assembler::Initializer(self.entity_initializer(graph, None)),
            DomainResult::Embeddable(embeddable) => {
                Assembler::Initializer(self.embeddable_initializer(embeddable, None, None))
            }
            DomainResult::DynamicInstantiation(instantiation) => Assembler::DynamicInstantiation {
                strategy: instantiation.strategy.clone(),
                arguments: instantiation
                    .arguments
                    .iter()
                    .map(|a| self.assembler_for(&a.result))
                    .collect(),
            },
        }
    }

    fn push(&mut self, path: &NavigablePath, parent: Option<InitializerId>, kind: InitializerKind) -> InitializerId {
        let id = InitializerId(self.specs.len());
        self.specs.push(InitializerSpec {
            navigable_path: path.clone(),
            parent,
            kind,
        });
        self.by_path.insert(path.clone(), id);
        id
    }

    fn entity_initializer(&mut self, graph: &EntityGraph, parent: Option<InitializerId>) -> InitializerId {
        if let Some(id) = self.find(&graph.navigable_path) {
            return id;
        }
        let key = KeySource {
            entity: graph.entity.clone(),
            position: graph.identifier_position,
            jdbc_type: graph.identifier_type,
        };
        // Registered before its fetches so circular fetches can find it.
        let id = self.push(
            &graph.navigable_path,
            parent,
            InitializerKind::Entity {
                key,
                attributes: Vec::new(),
            },
        );
        let sources = self.attribute_sources(&graph.fetches, id, id);
        if let InitializerKind::Entity { attributes, .. } = &mut self.specs[id.0].kind {
            *attributes = sources;
        }
        id
    }

    fn embeddable_initializer(
        &mut self,
        graph: &EmbeddableGraph,
        parent: Option<InitializerId>,
        owner: Option<InitializerId>,
    ) -> InitializerId {
        if let Some(id) = self.find(&graph.navigable_path) {
            return id;
        }
        let id = self.push(
            &graph.navigable_path,
            parent,
            InitializerKind::Embeddable {
                type_name: graph.type_name.clone(),
                attributes: Vec::new(),
            },
        );
        let sources = self.attribute_sources(&graph.fetches, id, owner.unwrap_or(id));
        if let InitializerKind::Embeddable { attributes, .. } = &mut self.specs[id.0].kind {
            *attributes = sources;
        }
        id
    }

    /// Sources for `fetches` of the initializer `parent`, whose owning
    /// entity initializer is `owner`.
    fn attribute_sources(&mut self, fetches: &[Fetch], parent: InitializerId, owner: InitializerId) -> Vec<AttributeSource> {
        let mut sources = Vec::with_capacity(fetches.len());
        for fetch in fetches {
            let name = fetch.attribute().to_string();
            let path = fetch.navigable_path();
            let source = match fetch {
                Fetch::Basic(basic) => AttributeSource::Basic {
                    name,
                    position: basic.position,
                },
                Fetch::Embeddable(embeddable) => AttributeSource::Initializer {
                    name,
                    id: self.embeddable_initializer(embeddable, Some(parent), Some(owner)),
                },
                Fetch::EntityJoined(graph) => AttributeSource::Initializer {
                    name,
                    id: self.entity_initializer(graph, Some(parent)),
                },
                Fetch::EntitySelect { fetch, batch_mode } => AttributeSource::Initializer {
                    name,
                    id: self.find(path).unwrap_or_else(|| {
                        self.push(
                            path,
                            Some(parent),
                            InitializerKind::EntitySelect {
                                key: fetch.into(),
                                batch_mode: *batch_mode,
                            },
                        )
                    }),
                },
                Fetch::EntityDelayed(fetch) => AttributeSource::Initializer {
                    name,
                    id: self.delayed_initializer(fetch, parent),
                },
                Fetch::Circular {
                    fetch,
                    referenced_path,
                } => {
                    let id = match (self.find(path), self.find(referenced_path)) {
                        (Some(existing), _) => existing,
                        (None, Some(referenced)) => self.push(
                            path,
                            Some(parent),
                            InitializerKind::Circular {
                                key: fetch.into(),
                                referenced,
                            },
                        ),
                        // The referenced entity is not part of these results.
                        (None, None) => self.delayed_initializer(fetch, parent),
                    };
                    AttributeSource::Initializer { name, id }
                }
                Fetch::Plural(plural) => {
                    let id = match self.find(path) {
                        Some(existing) => existing,
                        None => {
                            let id = self.push(
                                path,
                                Some(parent),
                                InitializerKind::Collection {
                                    role: plural.role.clone(),
                                    owner,
                                    element: None,
                                },
                            );
                            if let PluralFetchKind::Joined(element) = &plural.kind {
                                let element_id = self.entity_initializer(element, Some(id));
                                if let InitializerKind::Collection { element, .. } = &mut self.specs[id.0].kind {
                                    *element = Some(element_id);
                                }
                            }
                            id
                        }
                    };
                    AttributeSource::Initializer { name, id }
                }
            };
            sources.push(source);
        }
        sources
    }

    fn delayed_initializer(&mut self, fetch: &KeyedFetch, parent: InitializerId) -> InitializerId {
        if let Some(id) = self.find(&fetch.navigable_path) {
            return id;
        }
        self.push(
            &fetch.navigable_path,
            Some(parent),
            InitializerKind::EntityDelayed { key: fetch.into() },
        )
    }

    // =========================================================================
    // Row phases
    // =========================================================================

    /// Read the key of a keyed initializer from the row.
    pub fn resolve_key(&self, states: &mut InitializerStates, row: &RowProcessingState<'_, '_>, id: InitializerId) {
        let key = match &self.spec(id).kind {
            InitializerKind::Entity { key, .. }
            | InitializerKind::EntitySelect { key, .. }
            | InitializerKind::EntityDelayed { key }
            | InitializerKind::Circular { key, .. } => read_key(row, key),
            InitializerKind::Embeddable { .. } | InitializerKind::Collection { .. } => None,
        };
        states.get_mut(id).key = key;
    }

    /// Resolve the instance of `id` for the current row. Idempotent within a
    /// row; resolves the initializers it depends on first.
    pub fn resolve_instance(
        &self,
        states: &mut InitializerStates,
        row: &mut RowProcessingState<'_, '_>,
        id: InitializerId,
    ) -> QueryResult<DomainValue> {
        if let Some(instance) = &states.get(id).instance {
            return Ok(instance.clone());
        }
        let key = states.get(id).key.clone();

        let instance = match &self.spec(id).kind {
            InitializerKind::Entity { .. } => match key {
                None => DomainValue::Null,
                Some(key) => {
                    let handle = row.ctx.pc.get_or_create_reference(key);
                    if row.ctx.pc.start_loading(handle) {
                        row.processing.register_loading_entity(handle);
                        states.get_mut(id).hydrate = Some(handle);
                    }
                    DomainValue::Entity(handle)
                }
            },
            InitializerKind::EntityDelayed { .. } => match key {
                None => DomainValue::Null,
                Some(key) => DomainValue::Entity(row.ctx.pc.get_or_create_reference(key)),
            },
            InitializerKind::EntitySelect { batch_mode, .. } => match key {
                None => DomainValue::Null,
                Some(key) => {
                    let handle = row.ctx.pc.get_or_create_reference(key.clone());
                    if row.ctx.pc.entity(handle).status == EntityStatus::Uninitialized {
                        match batch_mode {
                            BatchMode::None => row.ctx.load_pending(vec![key])?,
                            BatchMode::BatchInitialize => row.processing.defer_row_load(key),
                            BatchMode::BatchLoad => row.ctx.pc.enqueue_batch_load(key),
                        }
                    }
                    DomainValue::Entity(handle)
                }
            },
            InitializerKind::Circular { referenced, .. } => match key {
                None => DomainValue::Null,
                Some(key) if states.get(*referenced).key.as_ref() == Some(&key) => {
                    self.resolve_instance(states, row, *referenced)?
                }
                Some(key) => DomainValue::Entity(row.ctx.pc.get_or_create_reference(key)),
            },
            InitializerKind::Embeddable {
                type_name,
                attributes,
            } => {
                let values = self.attribute_values(states, row, attributes)?;
                if values.iter().all(|(_, v)| v.is_null()) {
                    DomainValue::Null
                } else {
                    DomainValue::Embeddable(EmbeddableValue {
                        type_name: type_name.clone(),
                        attributes: values,
                    })
                }
            }
            InitializerKind::Collection {
                role,
                owner,
                element,
            } => match states.get(*owner).key.clone() {
                None => DomainValue::Null,
                Some(owner_key) => {
                    let handle = row.ctx.pc.get_or_create_collection(role, owner_key);
                    if element.is_some() && !row.ctx.pc.collection(handle).initialized {
                        row.processing.claim_collection(handle);
                    }
                    DomainValue::Collection(handle)
                }
            },
        };

        states.get_mut(id).instance = Some(instance.clone());
        Ok(instance)
    }

    /// Hydrate a claimed entity, or add this row's element to a collection
    /// being loaded.
    pub fn initialize_instance(
        &self,
        states: &mut InitializerStates,
        row: &mut RowProcessingState<'_, '_>,
        id: InitializerId,
    ) -> QueryResult<()> {
        match &self.spec(id).kind {
            InitializerKind::Entity { attributes, .. } => {
                if let Some(handle) = states.get_mut(id).hydrate.take() {
                    let values = self.attribute_values(states, row, attributes)?;
                    row.ctx.pc.hydrate(handle, values);
                }
            }
            InitializerKind::Collection {
                element: Some(element),
                ..
            } => {
                let Some(handle) = self.resolve_instance(states, row, id)?.as_collection() else {
                    return Ok(());
                };
                if !row.processing.is_loading_collection(handle) {
                    return Ok(());
                }
                let value = self.resolve_instance(states, row, *element)?;
                let collection = row.ctx.pc.collection_mut(handle);
                if !value.is_null() && !collection.elements.contains(&value) {
                    collection.elements.push(value);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn attribute_values(
        &self,
        states: &mut InitializerStates,
        row: &mut RowProcessingState<'_, '_>,
        attributes: &[AttributeSource],
    ) -> QueryResult<Vec<(String, DomainValue)>> {
        let mut values = Vec::with_capacity(attributes.len());
        for source in attributes {
            let value = match source {
                AttributeSource::Basic { position, .. } => {
                    DomainValue::from(row.values.value(*position).clone())
                }
                AttributeSource::Initializer { id, .. } => self.resolve_instance(states, row, *id)?,
            };
            values.push((source.name().to_string(), value));
        }
        Ok(values)
    }
}

fn read_key(row: &RowProcessingState<'_, '_>, key: &KeySource) -> Option<EntityKey> {
    match row.values.value(key.position) {
        SqlValue::Null => None,
        value => Some(EntityKey::new(key.entity.clone(), value.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::graph::{BasicFetch, PluralFetch};

    fn order_graph(root: &NavigablePath) -> EntityGraph {
        let customer = root.append("customer");
        EntityGraph {
            navigable_path: root.clone(),
            entity: "Order".into(),
            identifier_position: 0,
            identifier_type: JdbcType::Integer,
            fetches: vec![
                Fetch::Basic(BasicFetch {
                    navigable_path: root.append("total"),
                    position: 1,
                    jdbc_type: JdbcType::Double,
                }),
                Fetch::Circular {
                    fetch: KeyedFetch {
                        navigable_path: customer,
                        entity: "Customer".into(),
                        fk_position: 2,
                        fk_type: JdbcType::Integer,
                    },
                    referenced_path: NavigablePath::aliased("Customer", "c"),
                },
            ],
        }
    }

    #[test]
    fn test_one_initializer_per_path() {
        let root = NavigablePath::aliased("Order", "o");
        let results = vec![
            DomainResult::Entity(order_graph(&root)),
            DomainResult::Entity(order_graph(&root)),
        ];
        let (graph, assemblers) = InitializerGraph::build(&results);
        assert_eq!(assemblers[0], assemblers[1]);
        // Order, plus a delayed customer since no Customer initializer exists.
        assert_eq!(graph.len(), 2);
        assert!(matches!(
            graph.spec(InitializerId(1)).kind,
            InitializerKind::EntityDelayed { .. }
        ));
    }

    #[test]
    fn test_circular_references_ancestor_initializer() {
        let customer_path = NavigablePath::aliased("Customer", "c");
        let element = customer_path.append("orders").append(crate::path::ELEMENT_SEGMENT);
        let mut order = order_graph(&element);
        if let Fetch::Circular { fetch, .. } = &mut order.fetches[1] {
            fetch.navigable_path = element.append("customer");
        }
        let customer = EntityGraph {
            navigable_path: customer_path.clone(),
            entity: "Customer".into(),
            identifier_position: 3,
            identifier_type: JdbcType::Integer,
            fetches: vec![Fetch::Plural(PluralFetch {
                navigable_path: customer_path.append("orders"),
                role: "Customer.orders".into(),
                kind: PluralFetchKind::Joined(order),
            })],
        };
        let (graph, _) = InitializerGraph::build(&[DomainResult::Entity(customer)]);

        assert!(graph.has_collection_initializers());
        let circular = graph.find(&element.append("customer")).unwrap();
        assert!(matches!(
            graph.spec(circular).kind,
            InitializerKind::Circular { referenced, .. } if referenced == InitializerId(0)
        ));
    }
}
