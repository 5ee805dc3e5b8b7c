//! SQL generation module.
//!
//! This module turns the SQL AST into dialect-specific SQL text:
//!
//! - [`ast`] - expression, predicate, from-clause and statement nodes
//! - [`walker`] - depth-first visitor over the AST
//! - [`pattern`] - function pattern rendering (`?1`, `?2...`)
//! - [`translator`] - the walker emitting SQL and parameter binders
//! - [`operation`] - translated operations ready to bind and execute
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod ast;
pub mod dialect;
pub mod operation;
pub mod pattern;
pub mod token;
pub mod translator;
pub mod walker;

#[cfg(test)]
pub mod test_utils;

pub use dialect::{Dialect, SqlDialect};
pub use operation::{
    JdbcMutation, JdbcOperation, JdbcParameterBindings, JdbcSelect, MutationKind,
    ParameterBinder, SelectionDescriptor,
};
pub use pattern::{PatternRenderer, PatternSink};
pub use token::{Token, TokenStream};
pub use translator::SqlAstTranslator;
pub use walker::{ParameterCollector, SqlAstWalker};
