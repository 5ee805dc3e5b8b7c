//! Query parts: select clauses, query specifications and set operations.

use super::expr::Expression;
use super::from::FromClause;
use super::predicate::Predicate;

// =============================================================================
// Select Clause
// =============================================================================

/// A selected expression and the position its value occupies in the
/// per-row values array.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlSelection {
    pub values_array_position: usize,
    pub expression: Expression,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectClause {
    pub distinct: bool,
    pub selections: Vec<SqlSelection>,
}

impl SelectClause {
    /// Append a selection and return its values array position.
    pub fn add(&mut self, expression: Expression) -> usize {
        let position = self.selections.len();
        self.selections.push(SqlSelection {
            values_array_position: position,
            expression,
        });
        position
    }
}

// =============================================================================
// Ordering
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullPrecedence {
    #[default]
    None,
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpecification {
    pub expression: Expression,
    pub order: SortOrder,
    pub nulls: NullPrecedence,
}

impl SortSpecification {
    pub fn asc(expression: Expression) -> Self {
        Self {
            expression,
            order: SortOrder::Ascending,
            nulls: NullPrecedence::None,
        }
    }

    pub fn desc(expression: Expression) -> Self {
        Self {
            expression,
            order: SortOrder::Descending,
            nulls: NullPrecedence::None,
        }
    }

    pub fn nulls(mut self, nulls: NullPrecedence) -> Self {
        self.nulls = nulls;
        self
    }
}

// =============================================================================
// Query Spec
// =============================================================================

/// Pessimistic lock requested for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    PessimisticRead,
    PessimisticWrite,
}

/// A single `SELECT ... FROM ...` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub from: FromClause,
    pub select: SelectClause,
    pub where_clause: Option<Predicate>,
    pub group_by: Vec<Expression>,
    pub having: Option<Predicate>,
    pub order_by: Vec<SortSpecification>,
    pub offset: Option<Expression>,
    pub fetch: Option<Expression>,
    pub lock: Option<LockMode>,
}

impl QuerySpec {
    pub fn new(from: FromClause) -> Self {
        Self {
            from,
            ..Default::default()
        }
    }

    /// AND a restriction into the WHERE clause.
    pub fn apply_predicate(&mut self, predicate: Predicate) {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.and_also(predicate),
            None => predicate,
        });
    }
}

// =============================================================================
// Set Operations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    IntersectAll,
    Except,
    ExceptAll,
}

/// Query parts combined by a set operator. Ordering and pagination apply to
/// the combined result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryGroup {
    pub set_operator: SetOperator,
    pub first: Box<QueryPart>,
    pub others: Vec<QueryPart>,
    pub order_by: Vec<SortSpecification>,
    pub offset: Option<Expression>,
    pub fetch: Option<Expression>,
}

impl QueryGroup {
    pub fn new(set_operator: SetOperator, first: QueryPart, others: Vec<QueryPart>) -> Self {
        Self {
            set_operator,
            first: Box::new(first),
            others,
            order_by: Vec::new(),
            offset: None,
            fetch: None,
        }
    }

    pub fn parts(&self) -> impl Iterator<Item = &QueryPart> {
        std::iter::once(self.first.as_ref()).chain(self.others.iter())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryPart {
    Spec(QuerySpec),
    Group(QueryGroup),
}

impl QueryPart {
    /// The leftmost query spec, whose select clause defines the shape of
    /// the whole part.
    pub fn first_query_spec(&self) -> &QuerySpec {
        match self {
            QueryPart::Spec(spec) => spec,
            QueryPart::Group(group) => group.first.first_query_spec(),
        }
    }

    pub fn order_by(&self) -> &[SortSpecification] {
        match self {
            QueryPart::Spec(spec) => &spec.order_by,
            QueryPart::Group(group) => &group.order_by,
        }
    }
}

impl From<QuerySpec> for QueryPart {
    fn from(spec: QuerySpec) -> Self {
        QueryPart::Spec(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::JdbcType;

    #[test]
    fn test_select_clause_positions() {
        let mut select = SelectClause::default();
        assert_eq!(select.add(Expression::column("o1_0", "id", JdbcType::Integer)), 0);
        assert_eq!(select.add(Expression::column("o1_0", "name", JdbcType::Varchar)), 1);
        assert_eq!(select.selections[1].values_array_position, 1);
    }

    #[test]
    fn test_first_query_spec_of_group() {
        let mut first = QuerySpec::default();
        first.select.add(Expression::literal(1));
        let group = QueryPart::Group(QueryGroup::new(
            SetOperator::UnionAll,
            first.into(),
            vec![QuerySpec::default().into()],
        ));
        assert_eq!(group.first_query_spec().select.selections.len(), 1);
        if let QueryPart::Group(g) = &group {
            assert_eq!(g.parts().count(), 2);
        }
    }
}
