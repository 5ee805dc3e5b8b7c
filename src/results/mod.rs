//! Result materialization.
//!
//! Turns the rows of an executed select into domain values:
//!
//! - [`builder`] - builds the domain result graph and its SQL selections
//! - [`graph`] - domain results and fetches
//! - [`instantiation`] - dynamic instantiation targets and resolution
//! - [`initializer`] / [`assembler`] - per-row runtime over the graph
//! - [`row_reader`] - drives the initializer phases for one row
//! - [`jdbc_values`] - row sources (live result sets and cached rows)
//! - [`consumer`] / [`scroll`] - list and scrollable consumption
//! - [`cache`] - the query-results cache

pub mod assembler;
pub mod builder;
pub mod cache;
pub mod consumer;
pub mod graph;
pub mod initializer;
pub mod instantiation;
pub mod jdbc_values;
pub mod row_reader;
pub mod scroll;

pub use builder::{BuiltGraph, ResultGraphBuilder};
pub use cache::{InMemoryQueryCache, QueryKey, QueryResultsCache};
pub use consumer::{ListResultsConsumer, UniqueSemantic};
pub use graph::{BatchMode, DomainResult, Fetch};
pub use instantiation::{InstantiationKind, InstantiationTarget, InstantiatorRegistry, ResolvedInstantiation};
pub use jdbc_values::{CachedValues, JdbcValues, ResultSetValues};
pub use row_reader::{EntityLoader, ExecutionContext, StandardRowReader};
pub use scroll::ScrollableResults;
