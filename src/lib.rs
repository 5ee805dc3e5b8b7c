//! # Strata
//!
//! SQL AST translation and result materialization for an object-relational
//! mapper.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │          EntityQuery / EntityUpdate / EntityDelete       │
//! │   (join fetches, restrictions, pagination, selections)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [result graph builder]
//! ┌─────────────────────────────────────────────────────────┐
//! │        SQL AST  +  DomainResult / Fetch graph            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [translator + dialect]
//! ┌─────────────────────────────────────────────────────────┐
//! │        SQL text, parameter binders, affected tables      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [connection]
//! ┌─────────────────────────────────────────────────────────┐
//! │   JdbcValues ──► initializers ──► assemblers ──► rows    │
//! │   (identity map, batch loads, unique-row semantics)      │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod path;
pub mod query;
pub mod results;
pub mod sql;
pub mod value;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::engine::{
        CollectionHandle, Connection, EntityHandle, EntityKey, MemoryConnection, Session,
        SqliteConnection,
    };
    pub use crate::error::{QueryError, QueryResult, TranslationError, TranslationResult};
    pub use crate::mapping::{
        CollectionAttribute, EmbeddedAttribute, EntityMapping, MappingModel, ToOneAttribute,
    };
    pub use crate::query::{EntityDelete, EntityQuery, EntityUpdate, Restriction, Selection};
    pub use crate::results::{
        InstantiationKind, InstantiationTarget, InstantiatorRegistry, UniqueSemantic,
    };
    pub use crate::sql::ast::{LockMode, NullPrecedence, SortOrder};
    pub use crate::sql::{Dialect, JdbcParameterBindings, SqlAstTranslator, SqlDialect};
    pub use crate::value::{DomainValue, JdbcType, SqlValue, ValueType};
}

pub use error::{QueryError, TranslationError};
pub use sql::Dialect;
