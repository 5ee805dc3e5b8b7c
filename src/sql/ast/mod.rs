//! SQL AST - the immutable tree the translator renders.
//!
//! - [`expr`] - column references, parameters, literals, functions
//! - [`predicate`] - comparisons, junctions, filters
//! - [`from`] - table references, table groups and joins
//! - [`select`] - select clauses, query specs and set operations
//! - [`statement`] - select/insert/update/delete with CTEs

pub mod expr;
pub mod from;
pub mod predicate;
pub mod select;
pub mod statement;

pub use expr::{
    ArithmeticOperator, BinaryArithmeticExpression, CaseSearchedExpression, CaseSimpleExpression,
    CollateExpression, ColumnReference, DurationExpression, EntityTypeLiteral, Expression,
    FunctionExpression, JdbcLiteral, JdbcParameter, ParameterId, QueryLiteral, SqlTuple,
    TemporalUnit, UnaryOperation, UnaryOperator,
};
pub use from::{
    FromClause, SqlAliasBase, SqlAliasBaseGenerator, SqlAstJoinType, TableExpression, TableGroup,
    TableGroupJoin, TableReference, TableReferenceJoin,
};
pub use predicate::{
    BetweenPredicate, ComparisonOperator, ComparisonPredicate, ExistsPredicate, FilterFragment,
    FilterPredicate, InListPredicate, InSubQueryPredicate, Junction, JunctionNature,
    LikePredicate, NullnessPredicate, Predicate, SelfRenderingPredicate,
};
pub use select::{
    LockMode, NullPrecedence, QueryGroup, QueryPart, QuerySpec, SelectClause, SetOperator,
    SortOrder, SortSpecification, SqlSelection,
};
pub use statement::{
    Assignment, CteColumn, CteStatement, CteTable, DeleteStatement, InsertSource,
    InsertStatement, SelectStatement, Statement, UpdateStatement,
};
