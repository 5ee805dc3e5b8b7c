//! Top-level statements.

use crate::results::graph::DomainResult;
use crate::value::JdbcType;

use super::expr::{ColumnReference, Expression};
use super::from::TableReference;
use super::predicate::Predicate;
use super::select::QueryPart;

// =============================================================================
// Common Table Expressions
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CteColumn {
    pub name: String,
    pub jdbc_type: JdbcType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CteTable {
    pub name: String,
    pub columns: Vec<CteColumn>,
}

/// `name(columns) AS (query)`
#[derive(Debug, Clone, PartialEq)]
pub struct CteStatement {
    pub table: CteTable,
    pub query: QueryPart,
}

// =============================================================================
// Statements
// =============================================================================

/// A query plus the domain results describing how its rows are assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub ctes: Vec<CteStatement>,
    pub query: QueryPart,
    pub domain_results: Vec<DomainResult>,
}

impl SelectStatement {
    pub fn new(query: QueryPart, domain_results: Vec<DomainResult>) -> Self {
        Self {
            ctes: Vec::new(),
            query,
            domain_results,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Values(Vec<Vec<Expression>>),
    Select(QueryPart),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub ctes: Vec<CteStatement>,
    pub target: TableReference,
    pub columns: Vec<ColumnReference>,
    pub source: InsertSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: ColumnReference,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub ctes: Vec<CteStatement>,
    pub target: TableReference,
    pub assignments: Vec<Assignment>,
    pub restriction: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub ctes: Vec<CteStatement>,
    pub target: TableReference,
    pub restriction: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Statement {
    pub fn ctes(&self) -> &[CteStatement] {
        match self {
            Statement::Select(s) => &s.ctes,
            Statement::Insert(s) => &s.ctes,
            Statement::Update(s) => &s.ctes,
            Statement::Delete(s) => &s.ctes,
        }
    }
}
