//! Translated operations: SQL text plus everything needed to bind and read it.

use std::collections::{BTreeSet, HashMap};

use crate::error::{QueryError, QueryResult};
use crate::results::graph::DomainResult;
use crate::value::{JdbcType, SqlValue};

use super::ast::{JdbcParameter, ParameterId};

/// Supplies the value bound at one JDBC position.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterBinder {
    /// A query parameter; its value comes from [`JdbcParameterBindings`].
    Parameter(JdbcParameter),
    /// A literal rendered as a parameter marker.
    Literal { value: SqlValue, jdbc_type: JdbcType },
}

impl ParameterBinder {
    pub fn jdbc_type(&self) -> JdbcType {
        match self {
            ParameterBinder::Parameter(p) => p.jdbc_type,
            ParameterBinder::Literal { jdbc_type, .. } => *jdbc_type,
        }
    }

    pub fn value(&self, bindings: &JdbcParameterBindings) -> QueryResult<SqlValue> {
        match self {
            ParameterBinder::Parameter(p) => bindings
                .get(p.id)
                .cloned()
                .ok_or(QueryError::UnboundParameter(p.id.0)),
            ParameterBinder::Literal { value, .. } => Ok(value.clone()),
        }
    }
}

/// Values for the parameters of a query, by parameter id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JdbcParameterBindings {
    values: HashMap<ParameterId, SqlValue>,
}

impl JdbcParameterBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, id: ParameterId, value: impl Into<SqlValue>) {
        self.values.insert(id, value.into());
    }

    #[must_use]
    pub fn with(mut self, id: usize, value: impl Into<SqlValue>) -> Self {
        self.bind(ParameterId(id), value);
        self
    }

    pub fn get(&self, id: ParameterId) -> Option<&SqlValue> {
        self.values.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn bind_all(binders: &[ParameterBinder], bindings: &JdbcParameterBindings) -> QueryResult<Vec<SqlValue>> {
    binders.iter().map(|b| b.value(bindings)).collect()
}

/// Where a selected value lands in the values array and how to read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionDescriptor {
    pub position: usize,
    pub jdbc_type: JdbcType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JdbcSelect {
    pub sql: String,
    /// Binder `i` supplies JDBC position `i + 1`.
    pub parameter_binders: Vec<ParameterBinder>,
    pub affected_tables: BTreeSet<String>,
    pub selections: Vec<SelectionDescriptor>,
    pub domain_results: Vec<DomainResult>,
}

impl JdbcSelect {
    /// Resolve the positional parameter values.
    pub fn bind(&self, bindings: &JdbcParameterBindings) -> QueryResult<Vec<SqlValue>> {
        bind_all(&self.parameter_binders, bindings)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JdbcMutation {
    pub kind: MutationKind,
    pub sql: String,
    pub parameter_binders: Vec<ParameterBinder>,
    pub affected_tables: BTreeSet<String>,
}

impl JdbcMutation {
    pub fn bind(&self, bindings: &JdbcParameterBindings) -> QueryResult<Vec<SqlValue>> {
        bind_all(&self.parameter_binders, bindings)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JdbcOperation {
    Select(JdbcSelect),
    Mutation(JdbcMutation),
}

impl JdbcOperation {
    pub fn sql(&self) -> &str {
        match self {
            JdbcOperation::Select(s) => &s.sql,
            JdbcOperation::Mutation(m) => &m.sql,
        }
    }

    pub fn parameter_binders(&self) -> &[ParameterBinder] {
        match self {
            JdbcOperation::Select(s) => &s.parameter_binders,
            JdbcOperation::Mutation(m) => &m.parameter_binders,
        }
    }

    pub fn affected_tables(&self) -> &BTreeSet<String> {
        match self {
            JdbcOperation::Select(s) => &s.affected_tables,
            JdbcOperation::Mutation(m) => &m.affected_tables,
        }
    }
}
