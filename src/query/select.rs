//! Entity queries.
//!
//! [`EntityQuery`] is the logical query layer: it names a root entity, the
//! associations to join fetch, restrictions, ordering and pagination, and
//! builds a [`SelectStatement`] whose domain results describe how rows are
//! turned back into entities.
//!
//! # Example
//!
//! ```ignore
//! let query = EntityQuery::from("Order", "o")
//!     .join_fetch("customer")
//!     .filter(Restriction::eq("status", "OPEN"))
//!     .order_by("total", SortOrder::Descending)
//!     .limit(10);
//! ```

use std::time::Duration;

use crate::config::ResultSettings;
use crate::error::TranslationResult;
use crate::mapping::MappingModel;
use crate::path::NavigablePath;
use crate::results::{DomainResult, InstantiationKind, InstantiatorRegistry, ResultGraphBuilder, UniqueSemantic};
use crate::sql::ast::{
    Expression, LockMode, NullPrecedence, QueryPart, QuerySpec, SelectStatement, SortOrder,
    SortSpecification, SqlAstJoinType,
};
use crate::sql::JdbcParameterBindings;
use crate::value::SqlValue;

use super::restriction::Restriction;

/// A selected item.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// The root entity.
    Root,
    /// An attribute path below the root, optionally aliased.
    Attribute { path: String, alias: Option<String> },
    /// `new Target(...)`, a list or a map over the argument selections.
    Instantiation {
        kind: InstantiationKind,
        arguments: Vec<Selection>,
    },
}

impl Selection {
    pub fn attribute(path: &str) -> Self {
        Selection::Attribute {
            path: path.to_string(),
            alias: None,
        }
    }

    pub fn aliased(path: &str, alias: &str) -> Self {
        Selection::Attribute {
            path: path.to_string(),
            alias: Some(alias.to_string()),
        }
    }

    fn alias(&self) -> Option<String> {
        match self {
            Selection::Attribute { alias, .. } => alias.clone(),
            _ => None,
        }
    }
}

/// Execution options carried alongside a built query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub unique_semantic: UniqueSemantic,
    /// Whether rows may be served from the query-results cache.
    pub cacheable: bool,
    /// Consume through a scrollable cursor, which disables batch fetching.
    pub scroll: bool,
    pub timeout: Option<Duration>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            unique_semantic: UniqueSemantic::Allow,
            cacheable: false,
            scroll: false,
            timeout: None,
        }
    }
}

/// A built query ready for translation and execution.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub statement: SelectStatement,
    pub bindings: JdbcParameterBindings,
    pub options: QueryOptions,
}

#[derive(Debug, Clone, PartialEq)]
struct OrderItem {
    path: String,
    order: SortOrder,
    nulls: NullPrecedence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityQuery {
    entity: String,
    alias: String,
    join_fetches: Vec<(String, SqlAstJoinType)>,
    restrictions: Vec<Restriction>,
    order_by: Vec<OrderItem>,
    offset: Option<u64>,
    limit: Option<u64>,
    distinct: bool,
    selections: Vec<Selection>,
    lock: Option<LockMode>,
    bindings: JdbcParameterBindings,
    options: QueryOptions,
}

impl EntityQuery {
    pub fn from(entity: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            alias: alias.into(),
            join_fetches: Vec::new(),
            restrictions: Vec::new(),
            order_by: Vec::new(),
            offset: None,
            limit: None,
            distinct: false,
            selections: Vec::new(),
            lock: None,
            bindings: JdbcParameterBindings::new(),
            options: QueryOptions::default(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// `left join fetch` of a path relative to the root.
    #[must_use]
    pub fn join_fetch(mut self, path: &str) -> Self {
        self.join_fetches.push((path.to_string(), SqlAstJoinType::Left));
        self
    }

    /// `inner join fetch`: rows without the association are dropped.
    #[must_use]
    pub fn inner_join_fetch(mut self, path: &str) -> Self {
        self.join_fetches.push((path.to_string(), SqlAstJoinType::Inner));
        self
    }

    /// AND a restriction into the query.
    #[must_use]
    pub fn filter(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    #[must_use]
    pub fn order_by(mut self, path: &str, order: SortOrder) -> Self {
        self.order_by.push(OrderItem {
            path: path.to_string(),
            order,
            nulls: NullPrecedence::None,
        });
        self
    }

    #[must_use]
    pub fn order_by_nulls(mut self, path: &str, order: SortOrder, nulls: NullPrecedence) -> Self {
        self.order_by.push(OrderItem {
            path: path.to_string(),
            order,
            nulls,
        });
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Select `selection` instead of, or in addition to, the root entity.
    #[must_use]
    pub fn select(mut self, selection: Selection) -> Self {
        self.selections.push(selection);
        self
    }

    /// `select new <kind>(arguments...)`.
    #[must_use]
    pub fn select_instantiation(self, kind: InstantiationKind, arguments: Vec<Selection>) -> Self {
        self.select(Selection::Instantiation { kind, arguments })
    }

    #[must_use]
    pub fn lock(mut self, mode: LockMode) -> Self {
        self.lock = Some(mode);
        self
    }

    #[must_use]
    pub fn bind(mut self, id: usize, value: impl Into<SqlValue>) -> Self {
        self.bindings = self.bindings.with(id, value);
        self
    }

    #[must_use]
    pub fn unique(mut self, semantic: UniqueSemantic) -> Self {
        self.options.unique_semantic = semantic;
        self
    }

    #[must_use]
    pub fn cacheable(mut self) -> Self {
        self.options.cacheable = true;
        self
    }

    #[must_use]
    pub fn scroll(mut self) -> Self {
        self.options.scroll = true;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Build the select statement and its domain results.
    pub fn build(
        &self,
        model: &MappingModel,
        settings: &ResultSettings,
        registry: &InstantiatorRegistry,
    ) -> TranslationResult<BuiltQuery> {
        let mut builder = ResultGraphBuilder::new(model, settings, registry);
        for (path, join_type) in &self.join_fetches {
            builder.join_fetch(path.clone(), *join_type);
        }
        builder.set_scroll(self.options.scroll);
        builder.set_distinct(self.distinct);
        let root = builder.add_root(&self.entity, &self.alias)?;

        // Fetch joins first, so restrictions reuse them.
        let domain_results = if self.selections.is_empty() {
            vec![builder.entity_result(&root)?]
        } else {
            self.selections
                .iter()
                .map(|s| build_selection(&mut builder, &root, s))
                .collect::<TranslationResult<Vec<_>>>()?
        };

        let mut predicates = Vec::with_capacity(self.restrictions.len());
        for restriction in &self.restrictions {
            predicates.push(restriction.to_predicate(&mut builder, &root)?);
        }

        let mut order_by = Vec::with_capacity(self.order_by.len());
        for item in &self.order_by {
            let expression = builder.resolve_expression(&root, &item.path)?;
            order_by.push(SortSpecification {
                expression,
                order: item.order,
                nulls: item.nulls,
            });
        }

        let built = builder.finish();
        let mut spec = QuerySpec::new(built.from);
        spec.select = built.select;
        for predicate in predicates {
            spec.apply_predicate(predicate);
        }
        order_by.extend(built.order_by);
        spec.order_by = order_by;
        spec.offset = self.offset.map(pagination_parameter);
        spec.fetch = self.limit.map(pagination_parameter);
        spec.lock = self.lock;

        Ok(BuiltQuery {
            statement: SelectStatement::new(QueryPart::Spec(spec), domain_results),
            bindings: self.bindings.clone(),
            options: self.options.clone(),
        })
    }
}

/// Pagination is bound, so statements differing only in their page share
/// SQL text.
fn pagination_parameter(value: u64) -> Expression {
    Expression::bound(i64::try_from(value).unwrap_or(i64::MAX))
}

fn build_selection(
    builder: &mut ResultGraphBuilder<'_>,
    root: &NavigablePath,
    selection: &Selection,
) -> TranslationResult<DomainResult> {
    match selection {
        Selection::Root => builder.entity_result(root),
        Selection::Attribute { path, alias } => builder.path_result(root, path, alias.clone()),
        Selection::Instantiation { kind, arguments } => {
            let mut built = Vec::with_capacity(arguments.len());
            for argument in arguments {
                built.push((argument.alias(), build_selection(builder, root, argument)?));
            }
            builder.instantiation_result(kind, built)
        }
    }
}
