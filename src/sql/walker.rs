//! Depth-first traversal of the SQL AST.
//!
//! Every node kind has a `visit_*` method on [`SqlAstWalker`]. The default
//! bodies descend into children through the `walk_*` functions, so analysis
//! walkers override only the nodes they care about while the translator
//! overrides all of them. Node enums dispatch through `accept`.

use crate::error::TranslationResult;

use super::ast::*;

pub trait SqlAstWalker {
    // =========================================================================
    // Statements
    // =========================================================================

    fn visit_select_statement(&mut self, statement: &SelectStatement) -> TranslationResult<()> {
        walk_ctes(self, &statement.ctes)?;
        self.visit_query_part(&statement.query)
    }

    fn visit_insert_statement(&mut self, statement: &InsertStatement) -> TranslationResult<()> {
        walk_ctes(self, &statement.ctes)?;
        self.visit_table_reference(&statement.target)?;
        for column in &statement.columns {
            self.visit_column_reference(column)?;
        }
        match &statement.source {
            InsertSource::Values(rows) => {
                for row in rows {
                    for value in row {
                        self.visit_expression(value)?;
                    }
                }
                Ok(())
            }
            InsertSource::Select(query) => self.visit_query_part(query),
        }
    }

    fn visit_update_statement(&mut self, statement: &UpdateStatement) -> TranslationResult<()> {
        walk_ctes(self, &statement.ctes)?;
        self.visit_table_reference(&statement.target)?;
        for assignment in &statement.assignments {
            self.visit_column_reference(&assignment.column)?;
            self.visit_expression(&assignment.value)?;
        }
        if let Some(restriction) = &statement.restriction {
            self.visit_predicate(restriction)?;
        }
        Ok(())
    }

    fn visit_delete_statement(&mut self, statement: &DeleteStatement) -> TranslationResult<()> {
        walk_ctes(self, &statement.ctes)?;
        self.visit_table_reference(&statement.target)?;
        if let Some(restriction) = &statement.restriction {
            self.visit_predicate(restriction)?;
        }
        Ok(())
    }

    fn visit_cte_statement(&mut self, cte: &CteStatement) -> TranslationResult<()> {
        self.visit_query_part(&cte.query)
    }

    // =========================================================================
    // Query Parts
    // =========================================================================

    fn visit_query_part(&mut self, part: &QueryPart) -> TranslationResult<()> {
        part.accept(self)
    }

    fn visit_query_spec(&mut self, spec: &QuerySpec) -> TranslationResult<()> {
        walk_query_spec(self, spec)
    }

    fn visit_query_group(&mut self, group: &QueryGroup) -> TranslationResult<()> {
        for part in group.parts() {
            self.visit_query_part(part)?;
        }
        walk_sort_and_pagination(self, &group.order_by, &group.offset, &group.fetch)
    }

    fn visit_select_clause(&mut self, clause: &SelectClause) -> TranslationResult<()> {
        for selection in &clause.selections {
            self.visit_sql_selection(selection)?;
        }
        Ok(())
    }

    fn visit_sql_selection(&mut self, selection: &SqlSelection) -> TranslationResult<()> {
        self.visit_expression(&selection.expression)
    }

    fn visit_sort_specification(&mut self, sort: &SortSpecification) -> TranslationResult<()> {
        self.visit_expression(&sort.expression)
    }

    // =========================================================================
    // FROM
    // =========================================================================

    fn visit_from_clause(&mut self, from: &FromClause) -> TranslationResult<()> {
        for root in &from.roots {
            self.visit_table_group(root)?;
        }
        Ok(())
    }

    fn visit_table_group(&mut self, group: &TableGroup) -> TranslationResult<()> {
        self.visit_table_reference(&group.primary)?;
        for join in &group.table_reference_joins {
            self.visit_table_reference_join(join)?;
        }
        for join in &group.joins {
            self.visit_table_group_join(join)?;
        }
        Ok(())
    }

    fn visit_table_group_join(&mut self, join: &TableGroupJoin) -> TranslationResult<()> {
        self.visit_table_group(&join.joined_group)?;
        if let Some(predicate) = &join.predicate {
            self.visit_predicate(predicate)?;
        }
        Ok(())
    }

    fn visit_table_reference(&mut self, reference: &TableReference) -> TranslationResult<()> {
        match &reference.table {
            TableExpression::Named(_) => Ok(()),
            TableExpression::Derived(query) => self.visit_query_part(query),
        }
    }

    fn visit_table_reference_join(&mut self, join: &TableReferenceJoin) -> TranslationResult<()> {
        self.visit_table_reference(&join.reference)?;
        if let Some(predicate) = &join.predicate {
            self.visit_predicate(predicate)?;
        }
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn visit_expression(&mut self, expression: &Expression) -> TranslationResult<()> {
        expression.accept(self)
    }

    fn visit_column_reference(&mut self, _column: &ColumnReference) -> TranslationResult<()> {
        Ok(())
    }

    fn visit_parameter(&mut self, _parameter: &JdbcParameter) -> TranslationResult<()> {
        Ok(())
    }

    fn visit_jdbc_literal(&mut self, _literal: &JdbcLiteral) -> TranslationResult<()> {
        Ok(())
    }

    fn visit_query_literal(&mut self, _literal: &QueryLiteral) -> TranslationResult<()> {
        Ok(())
    }

    fn visit_tuple(&mut self, tuple: &SqlTuple) -> TranslationResult<()> {
        for e in &tuple.expressions {
            self.visit_expression(e)?;
        }
        Ok(())
    }

    fn visit_binary_arithmetic(&mut self, e: &BinaryArithmeticExpression) -> TranslationResult<()> {
        self.visit_expression(&e.lhs)?;
        self.visit_expression(&e.rhs)
    }

    fn visit_case_searched(&mut self, e: &CaseSearchedExpression) -> TranslationResult<()> {
        for (when, then) in &e.when_fragments {
            self.visit_predicate(when)?;
            self.visit_expression(then)?;
        }
        if let Some(otherwise) = &e.otherwise {
            self.visit_expression(otherwise)?;
        }
        Ok(())
    }

    fn visit_case_simple(&mut self, e: &CaseSimpleExpression) -> TranslationResult<()> {
        self.visit_expression(&e.operand)?;
        for (when, then) in &e.when_fragments {
            self.visit_expression(when)?;
            self.visit_expression(then)?;
        }
        if let Some(otherwise) = &e.otherwise {
            self.visit_expression(otherwise)?;
        }
        Ok(())
    }

    fn visit_unary_operation(&mut self, e: &UnaryOperation) -> TranslationResult<()> {
        self.visit_expression(&e.operand)
    }

    fn visit_function(&mut self, function: &FunctionExpression) -> TranslationResult<()> {
        for arg in function.arguments.iter().flatten() {
            self.visit_expression(arg)?;
        }
        Ok(())
    }

    fn visit_star(&mut self) -> TranslationResult<()> {
        Ok(())
    }

    fn visit_distinct(&mut self, expression: &Expression) -> TranslationResult<()> {
        self.visit_expression(expression)
    }

    fn visit_entity_type_literal(&mut self, _literal: &EntityTypeLiteral) -> TranslationResult<()> {
        Ok(())
    }

    fn visit_collate(&mut self, e: &CollateExpression) -> TranslationResult<()> {
        self.visit_expression(&e.expression)
    }

    fn visit_duration(&mut self, e: &DurationExpression) -> TranslationResult<()> {
        self.visit_expression(&e.magnitude)
    }

    fn visit_duration_unit(&mut self, _unit: TemporalUnit) -> TranslationResult<()> {
        Ok(())
    }

    fn visit_extract_unit(&mut self, _unit: TemporalUnit) -> TranslationResult<()> {
        Ok(())
    }

    fn visit_sub_query(&mut self, query: &QueryPart) -> TranslationResult<()> {
        self.visit_query_part(query)
    }

    // =========================================================================
    // Predicates
    // =========================================================================

    fn visit_predicate(&mut self, predicate: &Predicate) -> TranslationResult<()> {
        predicate.accept(self)
    }

    fn visit_comparison(&mut self, p: &ComparisonPredicate) -> TranslationResult<()> {
        self.visit_expression(&p.lhs)?;
        self.visit_expression(&p.rhs)
    }

    fn visit_between(&mut self, p: &BetweenPredicate) -> TranslationResult<()> {
        self.visit_expression(&p.expression)?;
        self.visit_expression(&p.lower)?;
        self.visit_expression(&p.upper)
    }

    fn visit_in_list(&mut self, p: &InListPredicate) -> TranslationResult<()> {
        self.visit_expression(&p.expression)?;
        for e in &p.list {
            self.visit_expression(e)?;
        }
        Ok(())
    }

    fn visit_in_sub_query(&mut self, p: &InSubQueryPredicate) -> TranslationResult<()> {
        self.visit_expression(&p.expression)?;
        self.visit_query_part(&p.sub_query)
    }

    fn visit_exists(&mut self, p: &ExistsPredicate) -> TranslationResult<()> {
        self.visit_query_part(&p.sub_query)
    }

    fn visit_junction(&mut self, junction: &Junction) -> TranslationResult<()> {
        for p in &junction.predicates {
            self.visit_predicate(p)?;
        }
        Ok(())
    }

    fn visit_like(&mut self, p: &LikePredicate) -> TranslationResult<()> {
        self.visit_expression(&p.expression)?;
        self.visit_expression(&p.pattern)?;
        if let Some(escape) = &p.escape {
            self.visit_expression(escape)?;
        }
        Ok(())
    }

    fn visit_negated(&mut self, predicate: &Predicate) -> TranslationResult<()> {
        self.visit_predicate(predicate)
    }

    fn visit_nullness(&mut self, p: &NullnessPredicate) -> TranslationResult<()> {
        self.visit_expression(&p.expression)
    }

    fn visit_grouped(&mut self, predicate: &Predicate) -> TranslationResult<()> {
        self.visit_predicate(predicate)
    }

    fn visit_self_rendering(&mut self, p: &SelfRenderingPredicate) -> TranslationResult<()> {
        self.visit_expression(&p.expression)
    }

    fn visit_filter(&mut self, filter: &FilterPredicate) -> TranslationResult<()> {
        for fragment in &filter.fragments {
            for parameter in &fragment.parameters {
                self.visit_parameter(parameter)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Walk Functions
// =============================================================================

pub fn walk_ctes<W: SqlAstWalker + ?Sized>(walker: &mut W, ctes: &[CteStatement]) -> TranslationResult<()> {
    for cte in ctes {
        walker.visit_cte_statement(cte)?;
    }
    Ok(())
}

/// Visit a query spec's clauses in rendering order.
pub fn walk_query_spec<W: SqlAstWalker + ?Sized>(walker: &mut W, spec: &QuerySpec) -> TranslationResult<()> {
    walker.visit_select_clause(&spec.select)?;
    walker.visit_from_clause(&spec.from)?;
    if let Some(predicate) = &spec.where_clause {
        walker.visit_predicate(predicate)?;
    }
    for e in &spec.group_by {
        walker.visit_expression(e)?;
    }
    if let Some(predicate) = &spec.having {
        walker.visit_predicate(predicate)?;
    }
    walk_sort_and_pagination(walker, &spec.order_by, &spec.offset, &spec.fetch)
}

pub fn walk_sort_and_pagination<W: SqlAstWalker + ?Sized>(
    walker: &mut W,
    order_by: &[SortSpecification],
    offset: &Option<Expression>,
    fetch: &Option<Expression>,
) -> TranslationResult<()> {
    for sort in order_by {
        walker.visit_sort_specification(sort)?;
    }
    if let Some(offset) = offset {
        walker.visit_expression(offset)?;
    }
    if let Some(fetch) = fetch {
        walker.visit_expression(fetch)?;
    }
    Ok(())
}

// =============================================================================
// Dispatch
// =============================================================================

impl QueryPart {
    pub fn accept<W: SqlAstWalker + ?Sized>(&self, walker: &mut W) -> TranslationResult<()> {
        match self {
            QueryPart::Spec(spec) => walker.visit_query_spec(spec),
            QueryPart::Group(group) => walker.visit_query_group(group),
        }
    }
}

impl Expression {
    pub fn accept<W: SqlAstWalker + ?Sized>(&self, walker: &mut W) -> TranslationResult<()> {
        match self {
            Expression::ColumnReference(c) => walker.visit_column_reference(c),
            Expression::Parameter(p) => walker.visit_parameter(p),
            Expression::JdbcLiteral(l) => walker.visit_jdbc_literal(l),
            Expression::QueryLiteral(l) => walker.visit_query_literal(l),
            Expression::Tuple(t) => walker.visit_tuple(t),
            Expression::BinaryArithmetic(b) => walker.visit_binary_arithmetic(b),
            Expression::CaseSearched(c) => walker.visit_case_searched(c),
            Expression::CaseSimple(c) => walker.visit_case_simple(c),
            Expression::Unary(u) => walker.visit_unary_operation(u),
            Expression::Function(f) => walker.visit_function(f),
            Expression::Star => walker.visit_star(),
            Expression::Distinct(e) => walker.visit_distinct(e),
            Expression::EntityTypeLiteral(l) => walker.visit_entity_type_literal(l),
            Expression::Collate(c) => walker.visit_collate(c),
            Expression::Duration(d) => walker.visit_duration(d),
            Expression::DurationUnit(u) => walker.visit_duration_unit(*u),
            Expression::ExtractUnit(u) => walker.visit_extract_unit(*u),
            Expression::SubQuery(q) => walker.visit_sub_query(q),
        }
    }
}

impl Predicate {
    pub fn accept<W: SqlAstWalker + ?Sized>(&self, walker: &mut W) -> TranslationResult<()> {
        match self {
            Predicate::Comparison(p) => walker.visit_comparison(p),
            Predicate::Between(p) => walker.visit_between(p),
            Predicate::InList(p) => walker.visit_in_list(p),
            Predicate::InSubQuery(p) => walker.visit_in_sub_query(p),
            Predicate::Exists(p) => walker.visit_exists(p),
            Predicate::Junction(j) => walker.visit_junction(j),
            Predicate::Like(p) => walker.visit_like(p),
            Predicate::Negated(p) => walker.visit_negated(p),
            Predicate::Nullness(p) => walker.visit_nullness(p),
            Predicate::Grouped(p) => walker.visit_grouped(p),
            Predicate::SelfRendering(p) => walker.visit_self_rendering(p),
            Predicate::Filter(f) => walker.visit_filter(f),
        }
    }
}

// =============================================================================
// Parameter Collector
// =============================================================================

/// Collects the parameters of a tree in traversal order.
///
/// Bound literals are counted but not collected: they carry their value.
#[derive(Debug, Default)]
pub struct ParameterCollector {
    pub parameters: Vec<JdbcParameter>,
    pub bound_literals: usize,
}

impl ParameterCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct parameter ids, in first-seen order.
    pub fn distinct_ids(&self) -> Vec<ParameterId> {
        let mut ids: Vec<ParameterId> = Vec::new();
        for p in &self.parameters {
            if !ids.contains(&p.id) {
                ids.push(p.id);
            }
        }
        ids
    }
}

impl SqlAstWalker for ParameterCollector {
    fn visit_parameter(&mut self, parameter: &JdbcParameter) -> TranslationResult<()> {
        self.parameters.push(parameter.clone());
        Ok(())
    }

    fn visit_jdbc_literal(&mut self, _literal: &JdbcLiteral) -> TranslationResult<()> {
        self.bound_literals += 1;
        Ok(())
    }
}
