//! Expression nodes.
//!
//! Every expression reports the [`JdbcType`] used to bind, extract and
//! format it. Nodes are immutable once constructed.

use crate::sql::pattern::PatternRenderer;
use crate::value::{JdbcType, SqlValue};

use super::predicate::Predicate;
use super::select::QueryPart;

/// Identifies a parameter independently of the position it is bound to.
///
/// The same parameter may be rendered more than once; each rendering is
/// bound to its own JDBC position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterId(pub usize);

/// A column of a table reference in scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReference {
    /// Alias of the table reference, `None` for an unqualified column.
    pub qualifier: Option<String>,
    pub column: String,
    pub jdbc_type: JdbcType,
}

impl ColumnReference {
    pub fn new(qualifier: impl Into<String>, column: impl Into<String>, jdbc_type: JdbcType) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            column: column.into(),
            jdbc_type,
        }
    }

    pub fn unqualified(column: impl Into<String>, jdbc_type: JdbcType) -> Self {
        Self {
            qualifier: None,
            column: column.into(),
            jdbc_type,
        }
    }
}

/// A positional parameter whose value is supplied at execution time.
#[derive(Debug, Clone, PartialEq)]
pub struct JdbcParameter {
    pub id: ParameterId,
    pub jdbc_type: JdbcType,
}

/// A literal bound as a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct JdbcLiteral {
    pub value: SqlValue,
    pub jdbc_type: JdbcType,
}

/// A literal rendered inline into the SQL text.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryLiteral {
    pub value: SqlValue,
    pub jdbc_type: JdbcType,
}

/// A composite value, `(a, b)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlTuple {
    pub expressions: Vec<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryArithmeticExpression {
    pub lhs: Box<Expression>,
    pub operator: ArithmeticOperator,
    pub rhs: Box<Expression>,
    pub jdbc_type: JdbcType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseSearchedExpression {
    pub when_fragments: Vec<(Predicate, Expression)>,
    pub otherwise: Option<Box<Expression>>,
    pub jdbc_type: JdbcType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseSimpleExpression {
    pub operand: Box<Expression>,
    pub when_fragments: Vec<(Expression, Expression)>,
    pub otherwise: Option<Box<Expression>>,
    pub jdbc_type: JdbcType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryOperation {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
}

/// A function call that renders itself.
///
/// Rendering uses the function's own pattern when present, otherwise the
/// dialect's template for `name`, otherwise the generic `NAME(args)` form.
/// A `None` argument is absent: optional trailing arguments are omitted.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpression {
    pub name: String,
    pub arguments: Vec<Option<Expression>>,
    pub renderer: Option<PatternRenderer>,
    pub return_type: JdbcType,
}

impl FunctionExpression {
    pub fn new(name: impl Into<String>, arguments: Vec<Expression>, return_type: JdbcType) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into_iter().map(Some).collect(),
            renderer: None,
            return_type,
        }
    }

    /// Render with an explicit pattern instead of the dialect's template.
    pub fn with_renderer(mut self, renderer: PatternRenderer) -> Self {
        self.renderer = Some(renderer);
        self
    }
}

/// The discriminator literal of an entity type (`type(e) = Order`).
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTypeLiteral {
    pub entity: String,
    pub discriminator: SqlValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollateExpression {
    pub expression: Box<Expression>,
    pub collation: String,
}

/// Temporal units used by durations and `extract`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalUnit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl TemporalUnit {
    pub fn name(&self) -> &'static str {
        match self {
            TemporalUnit::Year => "year",
            TemporalUnit::Month => "month",
            TemporalUnit::Week => "week",
            TemporalUnit::Day => "day",
            TemporalUnit::Hour => "hour",
            TemporalUnit::Minute => "minute",
            TemporalUnit::Second => "second",
        }
    }

    /// Length of the unit in seconds, `None` for calendar units.
    pub fn seconds(&self) -> Option<i64> {
        match self {
            TemporalUnit::Year | TemporalUnit::Month => None,
            TemporalUnit::Week => Some(604_800),
            TemporalUnit::Day => Some(86_400),
            TemporalUnit::Hour => Some(3_600),
            TemporalUnit::Minute => Some(60),
            TemporalUnit::Second => Some(1),
        }
    }
}

/// A magnitude in some unit, rendered as a number of seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationExpression {
    pub magnitude: Box<Expression>,
    pub unit: TemporalUnit,
}

/// A SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    ColumnReference(ColumnReference),
    Parameter(JdbcParameter),
    JdbcLiteral(JdbcLiteral),
    QueryLiteral(QueryLiteral),
    Tuple(SqlTuple),
    BinaryArithmetic(BinaryArithmeticExpression),
    CaseSearched(CaseSearchedExpression),
    CaseSimple(CaseSimpleExpression),
    Unary(UnaryOperation),
    Function(FunctionExpression),
    Star,
    Distinct(Box<Expression>),
    EntityTypeLiteral(EntityTypeLiteral),
    Collate(CollateExpression),
    Duration(DurationExpression),
    DurationUnit(TemporalUnit),
    ExtractUnit(TemporalUnit),
    SubQuery(Box<QueryPart>),
}

impl Expression {
    pub fn column(qualifier: &str, column: &str, jdbc_type: JdbcType) -> Self {
        Expression::ColumnReference(ColumnReference::new(qualifier, column, jdbc_type))
    }

    pub fn parameter(id: usize, jdbc_type: JdbcType) -> Self {
        Expression::Parameter(JdbcParameter {
            id: ParameterId(id),
            jdbc_type,
        })
    }

    /// A literal bound as a parameter.
    pub fn bound(value: impl Into<SqlValue>) -> Self {
        let value = value.into();
        Expression::JdbcLiteral(JdbcLiteral {
            jdbc_type: value.jdbc_type(),
            value,
        })
    }

    /// A literal rendered inline.
    pub fn literal(value: impl Into<SqlValue>) -> Self {
        let value = value.into();
        Expression::QueryLiteral(QueryLiteral {
            jdbc_type: value.jdbc_type(),
            value,
        })
    }

    pub fn tuple(expressions: Vec<Expression>) -> Self {
        Expression::Tuple(SqlTuple { expressions })
    }

    pub fn arithmetic(lhs: Expression, operator: ArithmeticOperator, rhs: Expression) -> Self {
        let jdbc_type = match (lhs.jdbc_type(), rhs.jdbc_type()) {
            (JdbcType::Integer, JdbcType::Integer) => JdbcType::Integer,
            _ => JdbcType::Double,
        };
        Expression::BinaryArithmetic(BinaryArithmeticExpression {
            lhs: Box::new(lhs),
            operator,
            rhs: Box::new(rhs),
            jdbc_type,
        })
    }

    pub fn function(name: &str, arguments: Vec<Expression>, return_type: JdbcType) -> Self {
        Expression::Function(FunctionExpression::new(name, arguments, return_type))
    }

    pub fn sub_query(query: QueryPart) -> Self {
        Expression::SubQuery(Box::new(query))
    }

    /// The type used to bind, extract and format this expression.
    pub fn jdbc_type(&self) -> JdbcType {
        match self {
            Expression::ColumnReference(c) => c.jdbc_type,
            Expression::Parameter(p) => p.jdbc_type,
            Expression::JdbcLiteral(l) => l.jdbc_type,
            Expression::QueryLiteral(l) => l.jdbc_type,
            Expression::Tuple(_) => JdbcType::Object,
            Expression::BinaryArithmetic(b) => b.jdbc_type,
            Expression::CaseSearched(c) => c.jdbc_type,
            Expression::CaseSimple(c) => c.jdbc_type,
            Expression::Unary(u) => u.operand.jdbc_type(),
            Expression::Function(f) => f.return_type,
            Expression::Star => JdbcType::Object,
            Expression::Distinct(e) => e.jdbc_type(),
            Expression::EntityTypeLiteral(l) => l.discriminator.jdbc_type(),
            Expression::Collate(c) => c.expression.jdbc_type(),
            Expression::Duration(_) => JdbcType::Integer,
            Expression::DurationUnit(_) | Expression::ExtractUnit(_) => JdbcType::Object,
            Expression::SubQuery(q) => q
                .first_query_spec()
                .select
                .selections
                .first()
                .map(|s| s.expression.jdbc_type())
                .unwrap_or(JdbcType::Object),
        }
    }
}

impl From<ColumnReference> for Expression {
    fn from(c: ColumnReference) -> Self {
        Expression::ColumnReference(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_type_widening() {
        let int = Expression::column("o1_0", "qty", JdbcType::Integer);
        let dbl = Expression::column("o1_0", "price", JdbcType::Double);
        assert_eq!(
            Expression::arithmetic(int.clone(), ArithmeticOperator::Add, int.clone()).jdbc_type(),
            JdbcType::Integer
        );
        assert_eq!(
            Expression::arithmetic(int, ArithmeticOperator::Multiply, dbl).jdbc_type(),
            JdbcType::Double
        );
    }

    #[test]
    fn test_literal_types_follow_value() {
        assert_eq!(Expression::bound("x").jdbc_type(), JdbcType::Varchar);
        assert_eq!(Expression::literal(true).jdbc_type(), JdbcType::Boolean);
    }

    #[test]
    fn test_temporal_unit_seconds() {
        assert_eq!(TemporalUnit::Day.seconds(), Some(86_400));
        assert_eq!(TemporalUnit::Month.seconds(), None);
    }
}
