//! Result graph - how a row is turned back into domain values.
//!
//! A [`DomainResult`] is one top-level value per row. Entities and
//! embeddables own [`Fetch`]es for their attributes; every node reads the
//! values array through positions assigned when its columns were selected.

use crate::path::NavigablePath;
use crate::value::{JdbcType, ValueType};

use super::instantiation::ResolvedInstantiation;

/// How an eagerly selected association is batched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Load each key as soon as it is resolved.
    None,
    /// Collect keys during the row and load them when the row is finished.
    BatchInitialize,
    /// Queue keys and load them in batches after the result set.
    BatchLoad,
}

/// An entity read through its identifier and attribute fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityGraph {
    pub navigable_path: NavigablePath,
    pub entity: String,
    pub identifier_position: usize,
    pub identifier_type: JdbcType,
    pub fetches: Vec<Fetch>,
}

impl EntityGraph {
    pub fn has_collection_fetches(&self) -> bool {
        self.fetches.iter().any(Fetch::has_collection_fetches)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicResult {
    pub position: usize,
    pub jdbc_type: JdbcType,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddableGraph {
    pub navigable_path: NavigablePath,
    pub type_name: String,
    pub fetches: Vec<Fetch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstantiationArgument {
    pub alias: Option<String>,
    pub result: DomainResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicInstantiationResult {
    pub strategy: ResolvedInstantiation,
    pub arguments: Vec<InstantiationArgument>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainResult {
    Basic(BasicResult),
    Entity(EntityGraph),
    Embeddable(EmbeddableGraph),
    DynamicInstantiation(DynamicInstantiationResult),
}

impl DomainResult {
    /// Type of the value this result produces.
    pub fn result_type(&self) -> ValueType {
        match self {
            DomainResult::Basic(b) => ValueType::Scalar(b.jdbc_type),
            DomainResult::Entity(e) => ValueType::Entity(e.entity.clone()),
            DomainResult::Embeddable(e) => ValueType::Embeddable(e.type_name.clone()),
            DomainResult::DynamicInstantiation(d) => d.strategy.result_type(),
        }
    }

    pub fn has_collection_fetches(&self) -> bool {
        match self {
            DomainResult::Basic(_) => false,
            DomainResult::Entity(e) => e.has_collection_fetches(),
            DomainResult::Embeddable(e) => e.fetches.iter().any(Fetch::has_collection_fetches),
            DomainResult::DynamicInstantiation(d) => {
                d.arguments.iter().any(|a| a.result.has_collection_fetches())
            }
        }
    }
}

// =============================================================================
// Fetches
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct BasicFetch {
    pub navigable_path: NavigablePath,
    pub position: usize,
    pub jdbc_type: JdbcType,
}

/// A to-one association read through the foreign key in the owner's row.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedFetch {
    pub navigable_path: NavigablePath,
    pub entity: String,
    pub fk_position: usize,
    pub fk_type: JdbcType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PluralFetchKind {
    /// Elements are joined into the owner's query.
    Joined(EntityGraph),
    /// An uninitialized collection, loaded on demand.
    Delayed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PluralFetch {
    pub navigable_path: NavigablePath,
    /// `Owner.attribute`
    pub role: String,
    pub kind: PluralFetchKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fetch {
    Basic(BasicFetch),
    Embeddable(EmbeddableGraph),
    /// Target joined into the query and hydrated from the same row.
    EntityJoined(EntityGraph),
    /// Target loaded by a subsequent select.
    EntitySelect { fetch: KeyedFetch, batch_mode: BatchMode },
    /// Target left as an uninitialized reference.
    EntityDelayed(KeyedFetch),
    /// Target is an entity already being fetched higher up the graph.
    Circular {
        fetch: KeyedFetch,
        referenced_path: NavigablePath,
    },
    Plural(PluralFetch),
}

impl Fetch {
    pub fn navigable_path(&self) -> &NavigablePath {
        match self {
            Fetch::Basic(f) => &f.navigable_path,
            Fetch::Embeddable(e) => &e.navigable_path,
            Fetch::EntityJoined(e) => &e.navigable_path,
            Fetch::EntitySelect { fetch, .. } => &fetch.navigable_path,
            Fetch::EntityDelayed(fetch) => &fetch.navigable_path,
            Fetch::Circular { fetch, .. } => &fetch.navigable_path,
            Fetch::Plural(p) => &p.navigable_path,
        }
    }

    /// Attribute name this fetch populates.
    pub fn attribute(&self) -> &str {
        self.navigable_path().local_name()
    }

    pub fn has_collection_fetches(&self) -> bool {
        match self {
            Fetch::Plural(p) => matches!(p.kind, PluralFetchKind::Joined(_)),
            Fetch::Embeddable(e) => e.fetches.iter().any(Fetch::has_collection_fetches),
            Fetch::EntityJoined(e) => e.has_collection_fetches(),
            _ => false,
        }
    }
}
