//! Bulk mutations.
//!
//! Updates and deletes restricted through attribute paths. A mutation whose
//! restriction stays on the entity's primary table renders as a single
//! statement. Deletes that need joins, or that must also clear secondary
//! tables, are staged through a CTE selecting the matching identifiers:
//!
//! ```text
//! WITH "ids" ("id") AS (SELECT "o1_0"."id" FROM "orders" AS "o1_0" JOIN ... WHERE ...)
//! DELETE FROM "order_notes" WHERE "order_notes"."order_id" IN (SELECT "ids"."id" FROM "ids" AS "ids")
//! WITH "ids" ("id") AS (...) DELETE FROM "orders" WHERE "orders"."id" IN (...)
//! ```
//!
//! Secondary tables are cleared first; each statement repeats the CTE.

use crate::config::ResultSettings;
use crate::error::{TranslationError, TranslationResult};
use crate::mapping::{EntityMapping, MappingModel};
use crate::path::NavigablePath;
use crate::results::{InstantiatorRegistry, ResultGraphBuilder};
use crate::sql::ast::{
    Assignment, CteColumn, CteStatement, CteTable, DeleteStatement, Expression, FromClause,
    Predicate, QueryPart, QuerySpec, Statement, TableGroup, TableReference, UpdateStatement,
};
use crate::sql::JdbcParameterBindings;
use crate::value::SqlValue;

use super::restriction::{Operand, Restriction};

const ID_CTE: &str = "ids";

/// Statements of one mutation, executed in order, plus their parameter
/// values.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltMutation {
    pub entity: String,
    pub statements: Vec<Statement>,
    pub bindings: JdbcParameterBindings,
}

/// The restricted root of a mutation.
struct MutationRoot {
    entity: EntityMapping,
    group: TableGroup,
    restriction: Option<Predicate>,
    assignments: Vec<Assignment>,
}

fn resolve_root(
    model: &MappingModel,
    entity: &str,
    restrictions: &[Restriction],
    assignments: &[(String, Operand)],
) -> TranslationResult<MutationRoot> {
    let settings = ResultSettings::default();
    let registry = InstantiatorRegistry::new();
    let mut builder = ResultGraphBuilder::new(model, &settings, &registry);
    let root = builder.add_root(entity, "root")?;

    let mut resolved = Vec::with_capacity(assignments.len());
    for (path, value) in assignments {
        let Expression::ColumnReference(column) = builder.resolve_expression(&root, path)? else {
            return Err(TranslationError::InvalidMutation {
                entity: entity.to_string(),
                reason: format!("`{}` does not map to a single column", path),
            });
        };
        let value = value.resolve(&mut builder, &root, column.jdbc_type)?;
        resolved.push(Assignment { column, value });
    }

    let mut predicates = Vec::with_capacity(restrictions.len());
    for restriction in restrictions {
        predicates.push(restriction.to_predicate(&mut builder, &root)?);
    }

    let mapping = builder.group_entity(&root)?.clone();
    let built = builder.finish();
    let group = built
        .from
        .roots
        .into_iter()
        .next()
        .ok_or_else(|| TranslationError::InvalidMutation {
            entity: entity.to_string(),
            reason: "no root table".into(),
        })?;

    Ok(MutationRoot {
        entity: mapping,
        group,
        restriction: conjunction(predicates),
        assignments: resolved,
    })
}

fn conjunction(mut predicates: Vec<Predicate>) -> Option<Predicate> {
    match predicates.len() {
        0 => None,
        1 => predicates.pop(),
        _ => Some(Predicate::and(predicates)),
    }
}

fn is_single_table(group: &TableGroup) -> bool {
    group.joins.is_empty() && group.table_reference_joins.is_empty()
}

// =============================================================================
// Update
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct EntityUpdate {
    entity: String,
    assignments: Vec<(String, Operand)>,
    restrictions: Vec<Restriction>,
    bindings: JdbcParameterBindings,
}

impl EntityUpdate {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            assignments: Vec::new(),
            restrictions: Vec::new(),
            bindings: JdbcParameterBindings::new(),
        }
    }

    #[must_use]
    pub fn set(mut self, path: &str, value: impl Into<Operand>) -> Self {
        self.assignments.push((path.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn filter(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    #[must_use]
    pub fn bind(mut self, id: usize, value: impl Into<SqlValue>) -> Self {
        self.bindings = self.bindings.with(id, value);
        self
    }

    /// Build the update. Assignments and restrictions must stay on the
    /// primary table.
    pub fn build(&self, model: &MappingModel) -> TranslationResult<BuiltMutation> {
        if self.assignments.is_empty() {
            return Err(TranslationError::InvalidMutation {
                entity: self.entity.clone(),
                reason: "an update needs at least one assignment".into(),
            });
        }
        let root = resolve_root(model, &self.entity, &self.restrictions, &self.assignments)?;
        if !is_single_table(&root.group) {
            return Err(TranslationError::InvalidMutation {
                entity: self.entity.clone(),
                reason: "updates can only reference columns of the primary table".into(),
            });
        }
        let statement = UpdateStatement {
            ctes: Vec::new(),
            target: root.group.primary,
            assignments: root.assignments,
            restriction: root.restriction,
        };
        Ok(BuiltMutation {
            entity: self.entity.clone(),
            statements: vec![Statement::Update(statement)],
            bindings: self.bindings.clone(),
        })
    }
}

// =============================================================================
// Delete
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct EntityDelete {
    entity: String,
    restrictions: Vec<Restriction>,
    bindings: JdbcParameterBindings,
    staged: bool,
}

impl EntityDelete {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            restrictions: Vec::new(),
            bindings: JdbcParameterBindings::new(),
            staged: false,
        }
    }

    #[must_use]
    pub fn filter(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    #[must_use]
    pub fn bind(mut self, id: usize, value: impl Into<SqlValue>) -> Self {
        self.bindings = self.bindings.with(id, value);
        self
    }

    /// Always stage the matching identifiers through a CTE.
    #[must_use]
    pub fn staged(mut self) -> Self {
        self.staged = true;
        self
    }

    pub fn build(&self, model: &MappingModel) -> TranslationResult<BuiltMutation> {
        let root = resolve_root(model, &self.entity, &self.restrictions, &[])?;
        let statements = if self.staged
            || !is_single_table(&root.group)
            || !root.entity.secondary_tables.is_empty()
        {
            staged_deletes(root)?
        } else {
            vec![Statement::Delete(DeleteStatement {
                ctes: Vec::new(),
                target: root.group.primary,
                restriction: root.restriction,
            })]
        };
        Ok(BuiltMutation {
            entity: self.entity.clone(),
            statements,
            bindings: self.bindings.clone(),
        })
    }
}

fn staged_deletes(root: MutationRoot) -> TranslationResult<Vec<Statement>> {
    let MutationRoot {
        entity,
        group,
        restriction,
        ..
    } = root;
    if !group.table_reference_joins.is_empty() {
        return Err(TranslationError::InvalidMutation {
            entity: entity.name.clone(),
            reason: "restrictions on secondary table columns cannot be staged".into(),
        });
    }

    let id = &entity.identifier;
    let mut spec = QuerySpec::new(FromClause::default());
    spec.select
        .add(Expression::column(group.alias(), &id.column, id.jdbc_type));
    spec.from.roots.push(group);
    spec.where_clause = restriction;
    let cte = CteStatement {
        table: CteTable {
            name: ID_CTE.into(),
            columns: vec![CteColumn {
                name: id.column.clone(),
                jdbc_type: id.jdbc_type,
            }],
        },
        query: QueryPart::Spec(spec),
    };

    let staged_ids = || {
        let mut ids = QuerySpec::new(FromClause::default());
        ids.select
            .add(Expression::column(ID_CTE, &id.column, id.jdbc_type));
        ids.from.roots.push(TableGroup::new(
            NavigablePath::new(ID_CTE),
            TableReference::named(ID_CTE, ID_CTE),
        ));
        QueryPart::Spec(ids)
    };
    let delete_from = |table: &str, column: &str| {
        Statement::Delete(DeleteStatement {
            ctes: vec![cte.clone()],
            target: TableReference::named(table, table),
            restriction: Some(Predicate::in_sub_query(
                Expression::column(table, column, id.jdbc_type),
                staged_ids(),
            )),
        })
    };

    let mut statements: Vec<Statement> = entity
        .secondary_tables
        .iter()
        .map(|s| delete_from(&s.table, &s.key_column))
        .collect();
    statements.push(delete_from(&entity.table, &id.column));
    Ok(statements)
}
