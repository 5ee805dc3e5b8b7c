//! SQL AST translator - renders statements into dialect-specific SQL.
//!
//! The translator is a [`SqlAstWalker`] appending to a [`TokenStream`].
//! Every parameter marker it emits records a [`ParameterBinder`] in the same
//! order, so binder `i` always supplies JDBC position `i + 1`. Every named
//! table it renders is recorded as affected, except CTE names.
//!
//! A translator is consumed by the `translate_*` call that uses it.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::config::TranslationSettings;
use crate::error::{TranslationError, TranslationResult};
use crate::value::{JdbcType, SqlValue};

use super::ast::*;
use super::dialect::{Dialect, PaginationStyle, SqlDialect};
use super::operation::{
    JdbcMutation, JdbcOperation, JdbcSelect, MutationKind, ParameterBinder, SelectionDescriptor,
};
use super::pattern::{split_parameter_markers, PatternRenderer, PatternSink};
use super::token::{Token, TokenStream};
use super::walker::SqlAstWalker;

/// The table targeted by a DML statement. Columns qualified by its alias
/// render qualified by the table name, as the target carries no alias.
#[derive(Debug, Clone)]
struct DmlTarget {
    alias: String,
    table: String,
}

pub struct SqlAstTranslator {
    dialect: Dialect,
    strict_function_arguments: bool,
    ts: TokenStream,
    parameter_binders: Vec<ParameterBinder>,
    affected_tables: BTreeSet<String>,
    cte_names: HashSet<String>,
    /// Aliases of the table references in scope, innermost query last.
    scopes: Vec<HashSet<String>>,
    dml_target: Option<DmlTarget>,
    /// Lock hint appended to every table reference of the current query.
    table_hint: Option<&'static str>,
}

impl SqlAstTranslator {
    pub fn new(dialect: Dialect, settings: &TranslationSettings) -> Self {
        Self {
            dialect,
            strict_function_arguments: settings.strict_function_arguments,
            ts: TokenStream::new(),
            parameter_binders: Vec::new(),
            affected_tables: BTreeSet::new(),
            cte_names: HashSet::new(),
            scopes: Vec::new(),
            dml_target: None,
            table_hint: None,
        }
    }

    // =========================================================================
    // Entry Points
    // =========================================================================

    pub fn translate(self, statement: &Statement) -> TranslationResult<JdbcOperation> {
        Ok(match statement {
            Statement::Select(s) => JdbcOperation::Select(self.translate_select(s)?),
            Statement::Insert(s) => JdbcOperation::Mutation(self.translate_insert(s)?),
            Statement::Update(s) => JdbcOperation::Mutation(self.translate_update(s)?),
            Statement::Delete(s) => JdbcOperation::Mutation(self.translate_delete(s)?),
        })
    }

    pub fn translate_select(mut self, statement: &SelectStatement) -> TranslationResult<JdbcSelect> {
        self.visit_select_statement(statement)?;
        let selections = statement
            .query
            .first_query_spec()
            .select
            .selections
            .iter()
            .map(|s| SelectionDescriptor {
                position: s.values_array_position,
                jdbc_type: s.expression.jdbc_type(),
            })
            .collect();
        Ok(JdbcSelect {
            sql: self.ts.serialize(self.dialect),
            parameter_binders: self.parameter_binders,
            affected_tables: self.affected_tables,
            selections,
            domain_results: statement.domain_results.clone(),
        })
    }

    pub fn translate_insert(mut self, statement: &InsertStatement) -> TranslationResult<JdbcMutation> {
        self.visit_insert_statement(statement)?;
        Ok(self.into_mutation(MutationKind::Insert))
    }

    pub fn translate_update(mut self, statement: &UpdateStatement) -> TranslationResult<JdbcMutation> {
        self.visit_update_statement(statement)?;
        Ok(self.into_mutation(MutationKind::Update))
    }

    pub fn translate_delete(mut self, statement: &DeleteStatement) -> TranslationResult<JdbcMutation> {
        self.visit_delete_statement(statement)?;
        Ok(self.into_mutation(MutationKind::Delete))
    }

    fn into_mutation(self, kind: MutationKind) -> JdbcMutation {
        JdbcMutation {
            kind,
            sql: self.ts.serialize(self.dialect),
            parameter_binders: self.parameter_binders,
            affected_tables: self.affected_tables,
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn unsupported(&self, feature: impl Into<String>) -> TranslationError {
        TranslationError::UnsupportedFeature {
            dialect: self.dialect.name().to_string(),
            feature: feature.into(),
        }
    }

    fn push_parameter(&mut self, binder: ParameterBinder) {
        self.ts.push(Token::Parameter);
        self.parameter_binders.push(binder);
    }

    fn render_ctes(&mut self, ctes: &[CteStatement]) -> TranslationResult<()> {
        if ctes.is_empty() {
            return Ok(());
        }
        for cte in ctes {
            self.cte_names.insert(cte.table.name.clone());
        }
        self.ts.push(Token::With).space();
        for (i, cte) in ctes.iter().enumerate() {
            if i > 0 {
                self.ts.comma().space();
            }
            self.visit_cte_statement(cte)?;
        }
        self.ts.space();
        Ok(())
    }

    /// Render a mutation target. It carries no alias, so its alias enters
    /// scope standing for the table name.
    fn render_dml_target(&mut self, target: &TableReference) -> TranslationResult<()> {
        let TableExpression::Named(table) = &target.table else {
            return Err(self.unsupported("derived tables as mutation targets"));
        };
        self.affected_tables.insert(table.clone());
        self.ts.push(Token::Ident(table.clone()));
        self.dml_target = Some(DmlTarget {
            alias: target.alias.clone(),
            table: table.clone(),
        });
        self.scopes.push(HashSet::from([target.alias.clone()]));
        Ok(())
    }

    fn end_dml_target(&mut self) {
        self.scopes.pop();
        self.dml_target = None;
    }

    fn render_comma_separated(&mut self, expressions: &[Expression]) -> TranslationResult<()> {
        for (i, e) in expressions.iter().enumerate() {
            if i > 0 {
                self.ts.comma();
            }
            self.visit_expression(e)?;
        }
        Ok(())
    }

    /// Render a predicate at clause level; empty junctions render nothing.
    fn render_clause_predicate(&mut self, keyword: Token, predicate: &Option<Predicate>) -> TranslationResult<()> {
        if let Some(predicate) = predicate {
            if !predicate.is_empty_junction() {
                self.ts.space().push(keyword).space();
                self.visit_predicate(predicate)?;
            }
        }
        Ok(())
    }

    fn render_order_by(&mut self, order_by: &[SortSpecification]) -> TranslationResult<()> {
        if order_by.is_empty() {
            return Ok(());
        }
        self.ts.space().push(Token::OrderBy).space();
        for (i, sort) in order_by.iter().enumerate() {
            if i > 0 {
                self.ts.comma();
            }
            self.visit_sort_specification(sort)?;
        }
        Ok(())
    }

    fn render_pagination(
        &mut self,
        has_order_by: bool,
        offset: &Option<Expression>,
        fetch: &Option<Expression>,
    ) -> TranslationResult<()> {
        if offset.is_none() && fetch.is_none() {
            return Ok(());
        }
        match self.dialect.pagination_style() {
            PaginationStyle::LimitOffset => {
                if let Some(fetch) = fetch {
                    self.ts.space().push(Token::Limit).space();
                    self.visit_expression(fetch)?;
                } else if let Some(unbounded) = self.dialect.unbounded_limit() {
                    self.ts.space().push(Token::Limit).space().raw(unbounded);
                }
                if let Some(offset) = offset {
                    self.ts.space().push(Token::Offset).space();
                    self.visit_expression(offset)?;
                }
            }
            PaginationStyle::OffsetFetch => {
                if !has_order_by && self.dialect.requires_order_by_for_offset() {
                    self.ts.space().push(Token::OrderBy).space().raw("(SELECT NULL)");
                }
                self.ts.space().push(Token::Offset).space();
                match offset {
                    Some(offset) => self.visit_expression(offset)?,
                    None => {
                        self.ts.push(Token::LitInt(0));
                    }
                }
                self.ts.space().push(Token::Rows);
                if let Some(fetch) = fetch {
                    self.ts
                        .space()
                        .push(Token::Fetch)
                        .space()
                        .push(Token::Next)
                        .space();
                    self.visit_expression(fetch)?;
                    self.ts.space().push(Token::Rows).space().push(Token::Only);
                }
            }
        }
        Ok(())
    }

    fn render_lock(&mut self, spec: &QuerySpec) -> TranslationResult<()> {
        let Some(mode) = spec.lock else {
            return Ok(());
        };
        if !self.dialect.supports_locking() || self.dialect.table_lock_hint(mode).is_some() {
            return Ok(());
        }
        self.ts.space().raw(self.dialect.lock_clause(mode));
        if spec.from.has_outer_joins() && !self.dialect.supports_outer_join_for_update() {
            if !self.dialect.supports_for_update_of() {
                return Err(self.unsupported("pessimistic locks on queries with outer joins"));
            }
            self.ts.space().raw("OF").space();
            for (i, root) in spec.from.roots.iter().enumerate() {
                if i > 0 {
                    self.ts.comma();
                }
                self.ts.push(Token::Ident(root.primary.alias.clone()));
            }
        }
        Ok(())
    }

    fn render_query_spec_clauses(&mut self, spec: &QuerySpec) -> TranslationResult<()> {
        self.visit_select_clause(&spec.select)?;
        self.visit_from_clause(&spec.from)?;
        self.render_clause_predicate(Token::Where, &spec.where_clause)?;
        if !spec.group_by.is_empty() {
            self.ts.space().push(Token::GroupBy).space();
            self.render_comma_separated(&spec.group_by)?;
        }
        self.render_clause_predicate(Token::Having, &spec.having)?;
        self.render_order_by(&spec.order_by)?;
        self.render_pagination(!spec.order_by.is_empty(), &spec.offset, &spec.fetch)?;
        self.render_lock(spec)
    }

    fn collect_aliases(group: &TableGroup, aliases: &mut HashSet<String>) {
        aliases.insert(group.primary.alias.clone());
        for join in &group.table_reference_joins {
            aliases.insert(join.reference.alias.clone());
        }
        for join in &group.joins {
            Self::collect_aliases(&join.joined_group, aliases);
        }
    }

    fn render_join_type(&mut self, join_type: SqlAstJoinType) {
        match join_type {
            SqlAstJoinType::Inner => {}
            SqlAstJoinType::Left => {
                self.ts.push(Token::Left).space();
            }
            SqlAstJoinType::Right => {
                self.ts.push(Token::Right).space();
            }
            SqlAstJoinType::Full => {
                self.ts.push(Token::Full).space();
            }
            SqlAstJoinType::Cross => {
                self.ts.push(Token::Cross).space();
            }
        }
        self.ts.push(Token::Join).space();
    }

    fn render_join_predicate(&mut self, join_type: SqlAstJoinType, predicate: &Option<Predicate>) -> TranslationResult<()> {
        if join_type == SqlAstJoinType::Cross {
            return Ok(());
        }
        self.ts.space().push(Token::On).space();
        match predicate {
            Some(p) if !p.is_empty_junction() => self.visit_predicate(p),
            _ => {
                self.ts.raw("1=1");
                Ok(())
            }
        }
    }

    /// Render the nodes of a group whose primary reference was rendered.
    fn render_table_group_joins(&mut self, group: &TableGroup) -> TranslationResult<()> {
        for join in &group.table_reference_joins {
            self.visit_table_reference_join(join)?;
        }
        for join in &group.joins {
            self.visit_table_group_join(join)?;
        }
        Ok(())
    }

    fn render_query_literal(&mut self, value: &SqlValue, jdbc_type: JdbcType) -> TranslationResult<()> {
        let token = match value {
            SqlValue::Null => Token::LitNull,
            SqlValue::Bool(b) => Token::LitBool(*b),
            SqlValue::Int(n) => Token::LitInt(*n),
            SqlValue::Float(f) if !f.is_finite() => {
                return Err(TranslationError::InvalidLiteral(format!(
                    "{} cannot be rendered inline",
                    f
                )))
            }
            SqlValue::Float(f) => Token::LitFloat(*f),
            SqlValue::Text(s) if jdbc_type == JdbcType::Date => Token::LitDate(s.clone()),
            SqlValue::Text(s) => Token::LitString(s.clone()),
            SqlValue::Bytes(_) => {
                return Err(TranslationError::InvalidLiteral(
                    "binary values must be bound as parameters".into(),
                ))
            }
        };
        self.ts.push(token);
        Ok(())
    }

    fn comparison_token(operator: ComparisonOperator) -> Token {
        match operator {
            ComparisonOperator::Equal => Token::Eq,
            ComparisonOperator::NotEqual => Token::Ne,
            ComparisonOperator::LessThan => Token::Lt,
            ComparisonOperator::LessThanOrEqual => Token::Lte,
            ComparisonOperator::GreaterThan => Token::Gt,
            ComparisonOperator::GreaterThanOrEqual => Token::Gte,
        }
    }

    /// `(a, b) = (x, y)` as `(a=x AND b=y)` for dialects without row values.
    fn render_expanded_tuple_comparison(
        &mut self,
        lhs: &SqlTuple,
        operator: ComparisonOperator,
        rhs: &SqlTuple,
    ) -> TranslationResult<()> {
        let separator = match operator {
            ComparisonOperator::Equal => Token::And,
            ComparisonOperator::NotEqual => Token::Or,
            _ => return Err(self.unsupported("ordered row value comparisons")),
        };
        if lhs.expressions.len() != rhs.expressions.len() {
            return Err(self.unsupported("row value comparisons of different arity"));
        }
        self.ts.lparen();
        for (i, (l, r)) in lhs.expressions.iter().zip(&rhs.expressions).enumerate() {
            if i > 0 {
                self.ts.space().push(separator.clone()).space();
            }
            self.visit_expression(l)?;
            self.ts.push(Self::comparison_token(operator));
            self.visit_expression(r)?;
        }
        self.ts.rparen();
        Ok(())
    }

    fn render_query_part_operand(&mut self, part: &QueryPart) -> TranslationResult<()> {
        let wrap = match part {
            QueryPart::Spec(spec) => {
                !spec.order_by.is_empty() || spec.offset.is_some() || spec.fetch.is_some()
            }
            QueryPart::Group(_) => true,
        };
        if wrap {
            self.ts.lparen();
            self.visit_query_part(part)?;
            self.ts.rparen();
        } else {
            self.visit_query_part(part)?;
        }
        Ok(())
    }

    /// Sort items of a query group refer to the first part's select list by
    /// position.
    fn render_group_sort(&mut self, group: &QueryGroup, sort: &SortSpecification) -> TranslationResult<()> {
        let position = group
            .first
            .first_query_spec()
            .select
            .selections
            .iter()
            .position(|s| s.expression == sort.expression);
        let Some(p) = position else {
            return self.visit_sort_specification(sort);
        };
        // the CASE emulation cannot reference a select list position
        if sort.nulls != NullPrecedence::None && !self.dialect.supports_nulls_ordering() {
            return Err(self.unsupported("null precedence on set operation sort items"));
        }
        self.ts.push(Token::LitInt(p as i64 + 1));
        self.render_sort_direction(sort);
        Ok(())
    }

    /// `DESC` and native null precedence following a sort key.
    fn render_sort_direction(&mut self, sort: &SortSpecification) {
        if sort.order == SortOrder::Descending {
            self.ts.space().push(Token::Desc);
        }
        if !self.dialect.supports_nulls_ordering() {
            return;
        }
        match sort.nulls {
            NullPrecedence::None => {}
            NullPrecedence::First => {
                self.ts.space().push(Token::NullsFirst);
            }
            NullPrecedence::Last => {
                self.ts.space().push(Token::NullsLast);
            }
        }
    }
}

// =============================================================================
// Walker
// =============================================================================

impl SqlAstWalker for SqlAstTranslator {
    fn visit_select_statement(&mut self, statement: &SelectStatement) -> TranslationResult<()> {
        self.render_ctes(&statement.ctes)?;
        self.visit_query_part(&statement.query)
    }

    fn visit_insert_statement(&mut self, statement: &InsertStatement) -> TranslationResult<()> {
        self.render_ctes(&statement.ctes)?;
        self.ts
            .push(Token::Insert)
            .space()
            .push(Token::Into)
            .space();
        self.render_dml_target(&statement.target)?;
        if !statement.columns.is_empty() {
            self.ts.space().lparen();
            for (i, column) in statement.columns.iter().enumerate() {
                if i > 0 {
                    self.ts.comma();
                }
                self.ts.push(Token::Ident(column.column.clone()));
            }
            self.ts.rparen();
        }
        self.ts.space();
        match &statement.source {
            InsertSource::Values(rows) => {
                self.ts.push(Token::Values).space();
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        self.ts.comma();
                    }
                    self.ts.lparen();
                    self.render_comma_separated(row)?;
                    self.ts.rparen();
                }
            }
            InsertSource::Select(query) => self.visit_query_part(query)?,
        }
        self.end_dml_target();
        Ok(())
    }

    fn visit_update_statement(&mut self, statement: &UpdateStatement) -> TranslationResult<()> {
        self.render_ctes(&statement.ctes)?;
        self.ts.push(Token::Update).space();
        self.render_dml_target(&statement.target)?;
        self.ts.space().push(Token::Set).space();
        for (i, assignment) in statement.assignments.iter().enumerate() {
            if i > 0 {
                self.ts.comma();
            }
            self.ts.push(Token::Ident(assignment.column.column.clone()));
            self.ts.push(Token::Eq);
            self.visit_expression(&assignment.value)?;
        }
        self.render_clause_predicate(Token::Where, &statement.restriction)?;
        self.end_dml_target();
        Ok(())
    }

    fn visit_delete_statement(&mut self, statement: &DeleteStatement) -> TranslationResult<()> {
        self.render_ctes(&statement.ctes)?;
        self.ts.push(Token::Delete).space().push(Token::From).space();
        self.render_dml_target(&statement.target)?;
        self.render_clause_predicate(Token::Where, &statement.restriction)?;
        self.end_dml_target();
        Ok(())
    }

    fn visit_cte_statement(&mut self, cte: &CteStatement) -> TranslationResult<()> {
        self.ts.push(Token::Ident(cte.table.name.clone()));
        if !cte.table.columns.is_empty() {
            self.ts.space().lparen();
            for (i, column) in cte.table.columns.iter().enumerate() {
                if i > 0 {
                    self.ts.comma();
                }
                self.ts.push(Token::Ident(column.name.clone()));
            }
            self.ts.rparen();
        }
        self.ts.space().push(Token::As).space().lparen();
        self.visit_query_part(&cte.query)?;
        self.ts.rparen();
        Ok(())
    }

    fn visit_query_spec(&mut self, spec: &QuerySpec) -> TranslationResult<()> {
        let mut aliases = HashSet::new();
        for root in &spec.from.roots {
            Self::collect_aliases(root, &mut aliases);
        }
        self.scopes.push(aliases);

        let hint = match spec.lock {
            Some(mode) if self.dialect.supports_locking() => self.dialect.table_lock_hint(mode),
            Some(_) => {
                debug!(dialect = %self.dialect, "dialect has no pessimistic locks, lock mode ignored");
                None
            }
            None => None,
        };
        let outer_hint = std::mem::replace(&mut self.table_hint, hint);

        let result = self.render_query_spec_clauses(spec);

        self.table_hint = outer_hint;
        self.scopes.pop();
        result
    }

    fn visit_query_group(&mut self, group: &QueryGroup) -> TranslationResult<()> {
        let operator = match group.set_operator {
            SetOperator::Union => "UNION",
            SetOperator::UnionAll => "UNION ALL",
            SetOperator::Intersect => "INTERSECT",
            SetOperator::IntersectAll => "INTERSECT ALL",
            SetOperator::Except => "EXCEPT",
            SetOperator::ExceptAll => "EXCEPT ALL",
        };
        for (i, part) in group.parts().enumerate() {
            if i > 0 {
                self.ts.space().raw(operator).space();
            }
            self.render_query_part_operand(part)?;
        }
        if !group.order_by.is_empty() {
            self.ts.space().push(Token::OrderBy).space();
            for (i, sort) in group.order_by.iter().enumerate() {
                if i > 0 {
                    self.ts.comma();
                }
                self.render_group_sort(group, sort)?;
            }
        }
        self.render_pagination(!group.order_by.is_empty(), &group.offset, &group.fetch)
    }

    fn visit_select_clause(&mut self, clause: &SelectClause) -> TranslationResult<()> {
        self.ts.push(Token::Select).space();
        if clause.distinct {
            self.ts.push(Token::Distinct).space();
        }
        if clause.selections.is_empty() {
            self.ts.push(Token::LitInt(1));
            return Ok(());
        }
        for (i, selection) in clause.selections.iter().enumerate() {
            if i > 0 {
                self.ts.comma();
            }
            self.visit_sql_selection(selection)?;
        }
        Ok(())
    }

    fn visit_sort_specification(&mut self, sort: &SortSpecification) -> TranslationResult<()> {
        if sort.nulls != NullPrecedence::None && !self.dialect.supports_nulls_ordering() {
            let (null_rank, other_rank) = match sort.nulls {
                NullPrecedence::First => (0, 1),
                _ => (1, 0),
            };
            self.ts
                .push(Token::Case)
                .space()
                .push(Token::When)
                .space();
            self.visit_expression(&sort.expression)?;
            self.ts
                .space()
                .push(Token::IsNull)
                .space()
                .push(Token::Then)
                .space()
                .push(Token::LitInt(null_rank))
                .space()
                .push(Token::Else)
                .space()
                .push(Token::LitInt(other_rank))
                .space()
                .push(Token::End)
                .comma();
        }
        self.visit_expression(&sort.expression)?;
        self.render_sort_direction(sort);
        Ok(())
    }

    fn visit_from_clause(&mut self, from: &FromClause) -> TranslationResult<()> {
        if from.roots.is_empty() {
            return Ok(());
        }
        self.ts.space().push(Token::From).space();
        for (i, root) in from.roots.iter().enumerate() {
            if i > 0 {
                self.ts.comma().space();
            }
            self.visit_table_group(root)?;
        }
        Ok(())
    }

    fn visit_table_group(&mut self, group: &TableGroup) -> TranslationResult<()> {
        self.visit_table_reference(&group.primary)?;
        self.render_table_group_joins(group)
    }

    fn visit_table_group_join(&mut self, join: &TableGroupJoin) -> TranslationResult<()> {
        self.ts.space();
        self.render_join_type(join.join_type);
        self.visit_table_reference(&join.joined_group.primary)?;
        self.render_join_predicate(join.join_type, &join.predicate)?;
        self.render_table_group_joins(&join.joined_group)
    }

    fn visit_table_reference(&mut self, reference: &TableReference) -> TranslationResult<()> {
        match &reference.table {
            TableExpression::Named(name) => {
                if !self.cte_names.contains(name) {
                    self.affected_tables.insert(name.clone());
                }
                self.ts.push(Token::Ident(name.clone()));
            }
            TableExpression::Derived(query) => {
                self.ts.lparen();
                self.visit_query_part(query)?;
                self.ts.rparen();
            }
        }

        self.ts
            .space()
            .push(Token::As)
            .space()
            .push(Token::Ident(reference.alias.clone()));
        if let Some(hint) = self.table_hint {
            self.ts.space().raw(hint);
        }
        Ok(())
    }

    fn visit_table_reference_join(&mut self, join: &TableReferenceJoin) -> TranslationResult<()> {
        self.ts.space();
        self.render_join_type(join.join_type);
        self.visit_table_reference(&join.reference)?;
        self.render_join_predicate(join.join_type, &join.predicate)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn visit_column_reference(&mut self, column: &ColumnReference) -> TranslationResult<()> {
        if let Some(qualifier) = &column.qualifier {
            if !self.scopes.iter().rev().any(|s| s.contains(qualifier)) {
                return Err(TranslationError::UnresolvedColumnReference {
                    qualifier: qualifier.clone(),
                    column: column.column.clone(),
                });
            }
            let rendered = match &self.dml_target {
                Some(target) if &target.alias == qualifier => target.table.clone(),
                _ => qualifier.clone(),
            };
            self.ts.push(Token::Ident(rendered)).push(Token::Dot);
        }
        self.ts.push(Token::Ident(column.column.clone()));
        Ok(())
    }

    fn visit_parameter(&mut self, parameter: &JdbcParameter) -> TranslationResult<()> {
        self.push_parameter(ParameterBinder::Parameter(parameter.clone()));
        Ok(())
    }

    fn visit_jdbc_literal(&mut self, literal: &JdbcLiteral) -> TranslationResult<()> {
        self.push_parameter(ParameterBinder::Literal {
            value: literal.value.clone(),
            jdbc_type: literal.jdbc_type,
        });
        Ok(())
    }

    fn visit_query_literal(&mut self, literal: &QueryLiteral) -> TranslationResult<()> {
        self.render_query_literal(&literal.value, literal.jdbc_type)
    }

    fn visit_tuple(&mut self, tuple: &SqlTuple) -> TranslationResult<()> {
        self.ts.lparen();
        self.render_comma_separated(&tuple.expressions)?;
        self.ts.rparen();
        Ok(())
    }

    fn visit_binary_arithmetic(&mut self, e: &BinaryArithmeticExpression) -> TranslationResult<()> {
        let operator = match e.operator {
            ArithmeticOperator::Add => Token::Plus,
            ArithmeticOperator::Subtract => Token::Minus,
            ArithmeticOperator::Multiply => Token::Mul,
            ArithmeticOperator::Divide => Token::Div,
            ArithmeticOperator::Modulo => Token::Mod,
        };
        self.ts.lparen();
        self.visit_expression(&e.lhs)?;
        self.ts.push(operator);
        self.visit_expression(&e.rhs)?;
        self.ts.rparen();
        Ok(())
    }

    fn visit_case_searched(&mut self, e: &CaseSearchedExpression) -> TranslationResult<()> {
        self.ts.push(Token::Case);
        for (when, then) in &e.when_fragments {
            self.ts.space().push(Token::When).space();
            self.visit_predicate(when)?;
            self.ts.space().push(Token::Then).space();
            self.visit_expression(then)?;
        }
        if let Some(otherwise) = &e.otherwise {
            self.ts.space().push(Token::Else).space();
            self.visit_expression(otherwise)?;
        }
        self.ts.space().push(Token::End);
        Ok(())
    }

    fn visit_case_simple(&mut self, e: &CaseSimpleExpression) -> TranslationResult<()> {
        self.ts.push(Token::Case).space();
        self.visit_expression(&e.operand)?;
        for (when, then) in &e.when_fragments {
            self.ts.space().push(Token::When).space();
            self.visit_expression(when)?;
            self.ts.space().push(Token::Then).space();
            self.visit_expression(then)?;
        }
        if let Some(otherwise) = &e.otherwise {
            self.ts.space().push(Token::Else).space();
            self.visit_expression(otherwise)?;
        }
        self.ts.space().push(Token::End);
        Ok(())
    }

    fn visit_unary_operation(&mut self, e: &UnaryOperation) -> TranslationResult<()> {
        self.ts.push(match e.operator {
            UnaryOperator::Plus => Token::Plus,
            UnaryOperator::Minus => Token::Minus,
        });
        self.visit_expression(&e.operand)
    }

    fn visit_function(&mut self, function: &FunctionExpression) -> TranslationResult<()> {
        let renderer = match &function.renderer {
            Some(renderer) => Some(renderer.clone()),
            None => self
                .dialect
                .function_pattern(&function.name)
                .map(|p| PatternRenderer::new(&p))
                .transpose()?,
        };
        match renderer {
            Some(renderer) => {
                let strict = self.strict_function_arguments;
                renderer.render(&function.arguments, self, strict)
            }
            None => {
                self.ts.push(Token::FunctionName(function.name.clone())).lparen();
                for (i, arg) in function.arguments.iter().flatten().enumerate() {
                    if i > 0 {
                        self.ts.comma();
                    }
                    self.visit_expression(arg)?;
                }
                self.ts.rparen();
                Ok(())
            }
        }
    }

    fn visit_star(&mut self) -> TranslationResult<()> {
        self.ts.push(Token::Star);
        Ok(())
    }

    fn visit_distinct(&mut self, expression: &Expression) -> TranslationResult<()> {
        self.ts.push(Token::Distinct).space();
        self.visit_expression(expression)
    }

    fn visit_entity_type_literal(&mut self, literal: &EntityTypeLiteral) -> TranslationResult<()> {
        let jdbc_type = literal.discriminator.jdbc_type();
        self.render_query_literal(&literal.discriminator, jdbc_type)
    }

    fn visit_collate(&mut self, e: &CollateExpression) -> TranslationResult<()> {
        self.visit_expression(&e.expression)?;
        self.ts
            .space()
            .push(Token::Collate)
            .space()
            .push(Token::Ident(e.collation.clone()));
        Ok(())
    }

    fn visit_duration(&mut self, e: &DurationExpression) -> TranslationResult<()> {
        let Some(factor) = e.unit.seconds() else {
            return Err(self.unsupported(format!("durations in {}s", e.unit.name())));
        };
        self.ts.lparen();
        self.visit_expression(&e.magnitude)?;
        if factor != 1 {
            self.ts.push(Token::Mul).push(Token::LitInt(factor));
        }
        self.ts.rparen();
        Ok(())
    }

    fn visit_duration_unit(&mut self, unit: TemporalUnit) -> TranslationResult<()> {
        self.ts.raw(unit.name());
        Ok(())
    }

    fn visit_extract_unit(&mut self, unit: TemporalUnit) -> TranslationResult<()> {
        self.ts.raw(unit.name());
        Ok(())
    }

    fn visit_sub_query(&mut self, query: &QueryPart) -> TranslationResult<()> {
        self.ts.lparen();
        self.visit_query_part(query)?;
        self.ts.rparen();
        Ok(())
    }

    // =========================================================================
    // Predicates
    // =========================================================================

    fn visit_comparison(&mut self, p: &ComparisonPredicate) -> TranslationResult<()> {
        if !self.dialect.supports_row_value_constructor() {
            match (&p.lhs, &p.rhs) {
                (Expression::Tuple(lhs), Expression::Tuple(rhs)) => {
                    return self.render_expanded_tuple_comparison(lhs, p.operator, rhs);
                }
                (Expression::Tuple(_), _) | (_, Expression::Tuple(_)) => {
                    return Err(self.unsupported("row value comparisons"));
                }
                _ => {}
            }
        }
        self.visit_expression(&p.lhs)?;
        self.ts.push(Self::comparison_token(p.operator));
        self.visit_expression(&p.rhs)
    }

    fn visit_between(&mut self, p: &BetweenPredicate) -> TranslationResult<()> {
        self.visit_expression(&p.expression)?;
        self.ts.space();
        if p.negated {
            self.ts.push(Token::Not).space();
        }
        self.ts.push(Token::Between).space();
        self.visit_expression(&p.lower)?;
        self.ts.space().push(Token::And).space();
        self.visit_expression(&p.upper)
    }

    fn visit_in_list(&mut self, p: &InListPredicate) -> TranslationResult<()> {
        if p.list.is_empty() {
            self.ts.raw(if p.negated { "1=1" } else { "1=0" });
            return Ok(());
        }
        self.visit_expression(&p.expression)?;
        self.ts.space();
        if p.negated {
            self.ts.push(Token::Not).space();
        }
        self.ts.push(Token::In).space().lparen();
        self.render_comma_separated(&p.list)?;
        self.ts.rparen();
        Ok(())
    }

    fn visit_in_sub_query(&mut self, p: &InSubQueryPredicate) -> TranslationResult<()> {
        self.visit_expression(&p.expression)?;
        self.ts.space();
        if p.negated {
            self.ts.push(Token::Not).space();
        }
        self.ts.push(Token::In).space().lparen();
        self.visit_query_part(&p.sub_query)?;
        self.ts.rparen();
        Ok(())
    }

    fn visit_exists(&mut self, p: &ExistsPredicate) -> TranslationResult<()> {
        if p.negated {
            self.ts.push(Token::Not).space();
        }
        self.ts.push(Token::Exists).space().lparen();
        self.visit_query_part(&p.sub_query)?;
        self.ts.rparen();
        Ok(())
    }

    fn visit_junction(&mut self, junction: &Junction) -> TranslationResult<()> {
        match junction.predicates.as_slice() {
            [] => {
                self.ts.raw(match junction.nature {
                    JunctionNature::Conjunction => "1=1",
                    JunctionNature::Disjunction => "1=0",
                });
                Ok(())
            }
            [single] => self.visit_predicate(single),
            predicates => {
                let separator = match junction.nature {
                    JunctionNature::Conjunction => Token::And,
                    JunctionNature::Disjunction => Token::Or,
                };
                for (i, predicate) in predicates.iter().enumerate() {
                    if i > 0 {
                        self.ts.space().push(separator.clone()).space();
                    }
                    let wrap = rendered_junction(predicate)
                        .is_some_and(|inner| inner.nature != junction.nature);
                    if wrap {
                        self.ts.lparen();
                        self.visit_predicate(predicate)?;
                        self.ts.rparen();
                    } else {
                        self.visit_predicate(predicate)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn visit_like(&mut self, p: &LikePredicate) -> TranslationResult<()> {
        let wrap_lower = |t: &mut Self, e: &Expression| -> TranslationResult<()> {
            if p.case_sensitive {
                t.visit_expression(e)
            } else {
                t.ts.push(Token::FunctionName("lower".into())).lparen();
                t.visit_expression(e)?;
                t.ts.rparen();
                Ok(())
            }
        };
        wrap_lower(self, &p.expression)?;
        self.ts.space();
        if p.negated {
            self.ts.push(Token::Not).space();
        }
        self.ts.push(Token::Like).space();
        wrap_lower(self, &p.pattern)?;
        if let Some(escape) = &p.escape {
            self.ts.space().push(Token::Escape).space();
            self.visit_expression(escape)?;
        }
        Ok(())
    }

    fn visit_negated(&mut self, predicate: &Predicate) -> TranslationResult<()> {
        self.ts.push(Token::Not).space().lparen();
        self.visit_predicate(predicate)?;
        self.ts.rparen();
        Ok(())
    }

    fn visit_nullness(&mut self, p: &NullnessPredicate) -> TranslationResult<()> {
        let check = if p.negated {
            Token::IsNotNull
        } else {
            Token::IsNull
        };
        if let Expression::Tuple(tuple) = &p.expression {
            // every component must be (not) null
            self.ts.lparen();
            for (i, e) in tuple.expressions.iter().enumerate() {
                if i > 0 {
                    self.ts.space().push(Token::And).space();
                }
                self.visit_expression(e)?;
                self.ts.space().push(check.clone());
            }
            self.ts.rparen();
            return Ok(());
        }
        self.visit_expression(&p.expression)?;
        self.ts.space().push(check);
        Ok(())
    }

    fn visit_grouped(&mut self, predicate: &Predicate) -> TranslationResult<()> {
        self.ts.lparen();
        self.visit_predicate(predicate)?;
        self.ts.rparen();
        Ok(())
    }

    fn visit_self_rendering(&mut self, p: &SelfRenderingPredicate) -> TranslationResult<()> {
        self.visit_expression(&p.expression)
    }

    fn visit_filter(&mut self, filter: &FilterPredicate) -> TranslationResult<()> {
        let wrap = filter.fragments.len() > 1;
        for (i, fragment) in filter.fragments.iter().enumerate() {
            let chunks = split_parameter_markers(&fragment.sql);
            if chunks.len() != fragment.parameters.len() + 1 {
                return Err(TranslationError::InvalidPattern {
                    pattern: fragment.sql.clone(),
                    reason: format!(
                        "filter fragment has {} markers but {} parameters",
                        chunks.len() - 1,
                        fragment.parameters.len()
                    ),
                });
            }
            if i > 0 {
                self.ts.space().push(Token::And).space();
            }
            if wrap {
                self.ts.lparen();
            }
            for (chunk, parameter) in chunks.iter().zip(&fragment.parameters) {
                self.ts.raw(*chunk);
                self.visit_parameter(parameter)?;
            }
            if let Some(last) = chunks.last() {
                self.ts.raw(*last);
            }
            if wrap {
                self.ts.rparen();
            }
        }
        Ok(())
    }
}

/// The junction a predicate renders as once single-member junctions are
/// unwrapped, when it joins more than one predicate.
fn rendered_junction(predicate: &Predicate) -> Option<&Junction> {
    match predicate {
        Predicate::Junction(junction) => match junction.predicates.as_slice() {
            [single] => rendered_junction(single),
            [] => None,
            _ => Some(junction),
        },
        _ => None,
    }
}

impl PatternSink<Expression> for SqlAstTranslator {
    fn append_sql(&mut self, sql: &str) {
        self.ts.raw(sql);
    }

    fn render_argument(&mut self, argument: &Expression) -> TranslationResult<()> {
        self.visit_expression(argument)
    }
}
