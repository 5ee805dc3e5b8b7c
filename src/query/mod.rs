//! Logical query layer.
//!
//! Builds SQL AST statements directly from entity-level descriptions:
//!
//! - [`EntityQuery`] - selects with join fetches, restrictions, ordering,
//!   pagination, locking and dynamic instantiation
//! - [`EntityUpdate`] / [`EntityDelete`] - bulk mutations
//! - [`Restriction`] - predicates over attribute paths

mod mutation;
mod restriction;
mod select;

pub use mutation::{BuiltMutation, EntityDelete, EntityUpdate};
pub use restriction::{Operand, Restriction};
pub use select::{BuiltQuery, EntityQuery, QueryOptions, Selection};
