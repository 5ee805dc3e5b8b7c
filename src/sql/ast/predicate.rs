//! Predicate nodes.

use super::expr::{Expression, JdbcParameter};
use super::select::QueryPart;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonOperator {
    /// The operator that holds when this one does not.
    pub fn negate(&self) -> Self {
        match self {
            ComparisonOperator::Equal => ComparisonOperator::NotEqual,
            ComparisonOperator::NotEqual => ComparisonOperator::Equal,
            ComparisonOperator::LessThan => ComparisonOperator::GreaterThanOrEqual,
            ComparisonOperator::LessThanOrEqual => ComparisonOperator::GreaterThan,
            ComparisonOperator::GreaterThan => ComparisonOperator::LessThanOrEqual,
            ComparisonOperator::GreaterThanOrEqual => ComparisonOperator::LessThan,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonPredicate {
    pub lhs: Expression,
    pub operator: ComparisonOperator,
    pub rhs: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BetweenPredicate {
    pub expression: Expression,
    pub lower: Expression,
    pub upper: Expression,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InListPredicate {
    pub expression: Expression,
    pub list: Vec<Expression>,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InSubQueryPredicate {
    pub expression: Expression,
    pub sub_query: Box<QueryPart>,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExistsPredicate {
    pub sub_query: Box<QueryPart>,
    pub negated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JunctionNature {
    Conjunction,
    Disjunction,
}

/// AND/OR over sub-predicates.
///
/// An empty conjunction is `true` and an empty disjunction is `false`.
#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    pub nature: JunctionNature,
    pub predicates: Vec<Predicate>,
}

impl Junction {
    pub fn conjunction(predicates: Vec<Predicate>) -> Self {
        Self {
            nature: JunctionNature::Conjunction,
            predicates,
        }
    }

    pub fn disjunction(predicates: Vec<Predicate>) -> Self {
        Self {
            nature: JunctionNature::Disjunction,
            predicates,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn add(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LikePredicate {
    pub expression: Expression,
    pub pattern: Expression,
    pub escape: Option<Expression>,
    pub negated: bool,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NullnessPredicate {
    pub expression: Expression,
    pub negated: bool,
}

/// A boolean-valued expression used as a predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfRenderingPredicate {
    pub expression: Expression,
}

/// A named filter fragment: trusted SQL with `?` markers for its
/// parameters, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterFragment {
    pub sql: String,
    pub parameters: Vec<JdbcParameter>,
}

/// Filter fragments enabled for a table, rendered as a conjunction.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPredicate {
    pub fragments: Vec<FilterFragment>,
}

/// A SQL predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison(ComparisonPredicate),
    Between(BetweenPredicate),
    InList(InListPredicate),
    InSubQuery(InSubQueryPredicate),
    Exists(ExistsPredicate),
    Junction(Junction),
    Like(LikePredicate),
    Negated(Box<Predicate>),
    Nullness(NullnessPredicate),
    Grouped(Box<Predicate>),
    SelfRendering(SelfRenderingPredicate),
    Filter(FilterPredicate),
}

impl Predicate {
    pub fn comparison(lhs: Expression, operator: ComparisonOperator, rhs: Expression) -> Self {
        Predicate::Comparison(ComparisonPredicate { lhs, operator, rhs })
    }

    pub fn eq(lhs: Expression, rhs: Expression) -> Self {
        Self::comparison(lhs, ComparisonOperator::Equal, rhs)
    }

    pub fn is_null(expression: Expression) -> Self {
        Predicate::Nullness(NullnessPredicate {
            expression,
            negated: false,
        })
    }

    pub fn is_not_null(expression: Expression) -> Self {
        Predicate::Nullness(NullnessPredicate {
            expression,
            negated: true,
        })
    }

    pub fn in_list(expression: Expression, list: Vec<Expression>) -> Self {
        Predicate::InList(InListPredicate {
            expression,
            list,
            negated: false,
        })
    }

    pub fn in_sub_query(expression: Expression, sub_query: QueryPart) -> Self {
        Predicate::InSubQuery(InSubQueryPredicate {
            expression,
            sub_query: Box::new(sub_query),
            negated: false,
        })
    }

    pub fn and(predicates: Vec<Predicate>) -> Self {
        Predicate::Junction(Junction::conjunction(predicates))
    }

    pub fn or(predicates: Vec<Predicate>) -> Self {
        Predicate::Junction(Junction::disjunction(predicates))
    }

    pub fn negate(predicate: Predicate) -> Self {
        Predicate::Negated(Box::new(predicate))
    }

    /// Whether this predicate is a junction without children.
    pub fn is_empty_junction(&self) -> bool {
        matches!(self, Predicate::Junction(j) if j.is_empty())
    }

    /// Combine `self` and `other` into one conjunction, flattening an
    /// existing conjunction on the left.
    pub fn and_also(self, other: Predicate) -> Predicate {
        match self {
            Predicate::Junction(mut j) if j.nature == JunctionNature::Conjunction => {
                j.add(other);
                Predicate::Junction(j)
            }
            left => Predicate::and(vec![left, other]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::JdbcType;

    #[test]
    fn test_and_also_flattens_conjunctions() {
        let a = Predicate::is_null(Expression::column("a1_0", "x", JdbcType::Integer));
        let b = Predicate::is_null(Expression::column("a1_0", "y", JdbcType::Integer));
        let c = Predicate::is_null(Expression::column("a1_0", "z", JdbcType::Integer));
        match a.and_also(b).and_also(c) {
            Predicate::Junction(j) => {
                assert_eq!(j.nature, JunctionNature::Conjunction);
                assert_eq!(j.predicates.len(), 3);
            }
            other => panic!("expected junction, got {:?}", other),
        }
    }

    #[test]
    fn test_negate_operator() {
        assert_eq!(
            ComparisonOperator::LessThan.negate(),
            ComparisonOperator::GreaterThanOrEqual
        );
        assert_eq!(ComparisonOperator::Equal.negate(), ComparisonOperator::NotEqual);
    }
}
