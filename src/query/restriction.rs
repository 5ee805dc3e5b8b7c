//! Restrictions over attribute paths.
//!
//! Paths are dotted and relative to the query root (`status`,
//! `customer.name`, `address.city`). They are resolved to SQL expressions by
//! a [`ResultGraphBuilder`], which adds whatever joins the path needs.

use crate::error::TranslationResult;
use crate::path::NavigablePath;
use crate::results::ResultGraphBuilder;
use crate::sql::ast::{
    BetweenPredicate, ComparisonOperator, Expression, InListPredicate, JdbcLiteral, LikePredicate,
    Predicate,
};
use crate::value::{JdbcType, SqlValue};

/// The right-hand side of a restriction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A value bound as a parameter.
    Value(SqlValue),
    /// A query parameter, bound at execution by id.
    Parameter(usize),
    /// Another attribute path.
    Path(String),
}

impl Operand {
    pub fn param(id: usize) -> Self {
        Operand::Parameter(id)
    }

    pub fn path(path: impl Into<String>) -> Self {
        Operand::Path(path.into())
    }

    /// The operand as an expression typed like `lhs`.
    pub(crate) fn resolve(
        &self,
        builder: &mut ResultGraphBuilder<'_>,
        root: &NavigablePath,
        jdbc_type: JdbcType,
    ) -> TranslationResult<Expression> {
        Ok(match self {
            Operand::Value(value) => Expression::JdbcLiteral(JdbcLiteral {
                value: value.clone(),
                jdbc_type,
            }),
            Operand::Parameter(id) => Expression::parameter(*id, jdbc_type),
            Operand::Path(path) => builder.resolve_expression(root, path)?,
        })
    }
}

macro_rules! operand_from_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Operand {
                fn from(value: $t) -> Self {
                    Operand::Value(value.into())
                }
            }
        )*
    };
}

operand_from_value!(SqlValue, i64, i32, f64, bool, &str, String);

#[derive(Debug, Clone, PartialEq)]
pub enum Restriction {
    Compare {
        path: String,
        operator: ComparisonOperator,
        value: Operand,
    },
    Like {
        path: String,
        pattern: Operand,
        case_sensitive: bool,
    },
    IsNull(String),
    IsNotNull(String),
    In {
        path: String,
        values: Vec<Operand>,
    },
    Between {
        path: String,
        lower: Operand,
        upper: Operand,
    },
    And(Vec<Restriction>),
    Or(Vec<Restriction>),
    Not(Box<Restriction>),
}

fn compare(path: &str, operator: ComparisonOperator, value: impl Into<Operand>) -> Restriction {
    Restriction::Compare {
        path: path.to_string(),
        operator,
        value: value.into(),
    }
}

impl Restriction {
    pub fn eq(path: &str, value: impl Into<Operand>) -> Self {
        compare(path, ComparisonOperator::Equal, value)
    }

    pub fn ne(path: &str, value: impl Into<Operand>) -> Self {
        compare(path, ComparisonOperator::NotEqual, value)
    }

    pub fn lt(path: &str, value: impl Into<Operand>) -> Self {
        compare(path, ComparisonOperator::LessThan, value)
    }

    pub fn le(path: &str, value: impl Into<Operand>) -> Self {
        compare(path, ComparisonOperator::LessThanOrEqual, value)
    }

    pub fn gt(path: &str, value: impl Into<Operand>) -> Self {
        compare(path, ComparisonOperator::GreaterThan, value)
    }

    pub fn ge(path: &str, value: impl Into<Operand>) -> Self {
        compare(path, ComparisonOperator::GreaterThanOrEqual, value)
    }

    pub fn like(path: &str, pattern: impl Into<Operand>) -> Self {
        Restriction::Like {
            path: path.to_string(),
            pattern: pattern.into(),
            case_sensitive: true,
        }
    }

    /// Case-insensitive `like`.
    pub fn ilike(path: &str, pattern: impl Into<Operand>) -> Self {
        Restriction::Like {
            path: path.to_string(),
            pattern: pattern.into(),
            case_sensitive: false,
        }
    }

    pub fn is_null(path: &str) -> Self {
        Restriction::IsNull(path.to_string())
    }

    pub fn is_not_null(path: &str) -> Self {
        Restriction::IsNotNull(path.to_string())
    }

    pub fn in_list<T: Into<Operand>>(path: &str, values: impl IntoIterator<Item = T>) -> Self {
        Restriction::In {
            path: path.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn between(path: &str, lower: impl Into<Operand>, upper: impl Into<Operand>) -> Self {
        Restriction::Between {
            path: path.to_string(),
            lower: lower.into(),
            upper: upper.into(),
        }
    }

    pub fn and(restrictions: Vec<Restriction>) -> Self {
        Restriction::And(restrictions)
    }

    pub fn or(restrictions: Vec<Restriction>) -> Self {
        Restriction::Or(restrictions)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(restriction: Restriction) -> Self {
        Restriction::Not(Box::new(restriction))
    }

    /// Resolve into a predicate against `root`.
    pub(crate) fn to_predicate(
        &self,
        builder: &mut ResultGraphBuilder<'_>,
        root: &NavigablePath,
    ) -> TranslationResult<Predicate> {
        Ok(match self {
            Restriction::Compare {
                path,
                operator,
                value,
            } => {
                let lhs = builder.resolve_expression(root, path)?;
                let rhs = value.resolve(builder, root, lhs.jdbc_type())?;
                Predicate::comparison(lhs, *operator, rhs)
            }
            Restriction::Like {
                path,
                pattern,
                case_sensitive,
            } => {
                let expression = builder.resolve_expression(root, path)?;
                let pattern = pattern.resolve(builder, root, JdbcType::Varchar)?;
                Predicate::Like(LikePredicate {
                    expression,
                    pattern,
                    escape: None,
                    negated: false,
                    case_sensitive: *case_sensitive,
                })
            }
            Restriction::IsNull(path) => Predicate::is_null(builder.resolve_expression(root, path)?),
            Restriction::IsNotNull(path) => {
                Predicate::is_not_null(builder.resolve_expression(root, path)?)
            }
            Restriction::In { path, values } => {
                let expression = builder.resolve_expression(root, path)?;
                let jdbc_type = expression.jdbc_type();
                let list = values
                    .iter()
                    .map(|v| v.resolve(builder, root, jdbc_type))
                    .collect::<TranslationResult<Vec<_>>>()?;
                Predicate::InList(InListPredicate {
                    expression,
                    list,
                    negated: false,
                })
            }
            Restriction::Between { path, lower, upper } => {
                let expression = builder.resolve_expression(root, path)?;
                let jdbc_type = expression.jdbc_type();
                Predicate::Between(BetweenPredicate {
                    lower: lower.resolve(builder, root, jdbc_type)?,
                    upper: upper.resolve(builder, root, jdbc_type)?,
                    expression,
                    negated: false,
                })
            }
            Restriction::And(restrictions) => Predicate::and(
                restrictions
                    .iter()
                    .map(|r| r.to_predicate(builder, root))
                    .collect::<TranslationResult<Vec<_>>>()?,
            ),
            Restriction::Or(restrictions) => Predicate::or(
                restrictions
                    .iter()
                    .map(|r| r.to_predicate(builder, root))
                    .collect::<TranslationResult<Vec<_>>>()?,
            ),
            Restriction::Not(inner) => Predicate::negate(inner.to_predicate(builder, root)?),
        })
    }
}
