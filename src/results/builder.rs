//! Result graph construction.
//!
//! [`ResultGraphBuilder`] walks the mapping model from one or more query
//! roots and produces, in a single pass:
//!
//! ```text
//!   mapping model ──► ResultGraphBuilder ──┬─► FromClause   (table groups, joins)
//!                                          ├─► SelectClause (memoized columns)
//!                                          ├─► order-by     (collection ordering)
//!                                          └─► DomainResult (fetch graph)
//! ```
//!
//! Columns are selected once per `(table alias, column)`, so two fetches that
//! read the same column share a values array position.

use std::collections::HashMap;

use tracing::debug;

use crate::config::ResultSettings;
use crate::error::{TranslationError, TranslationResult};
use crate::mapping::{
    AttributeMapping, BasicAttribute, EmbeddableInstantiation, EmbeddedAttribute, EntityMapping,
    FetchStyle, FetchTiming, MappingModel, ToOneAttribute,
};
use crate::path::{NavigablePath, ELEMENT_SEGMENT};
use crate::sql::ast::{
    Expression, FromClause, Predicate, SelectClause, SortSpecification, SqlAliasBase,
    SqlAliasBaseGenerator, SqlAstJoinType, TableGroup, TableGroupJoin, TableReference,
    TableReferenceJoin,
};
use crate::value::JdbcType;

use super::graph::{
    BasicFetch, BasicResult, BatchMode, DomainResult, DynamicInstantiationResult, EmbeddableGraph,
    EntityGraph, Fetch, InstantiationArgument, KeyedFetch, PluralFetch, PluralFetchKind,
};
use super::instantiation::{InstantiationKind, InstantiatorRegistry};

/// The SQL side of a built graph.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltGraph {
    pub from: FromClause,
    pub select: SelectClause,
    /// Ordering contributed by joined collections, applied after the
    /// query's own ordering.
    pub order_by: Vec<SortSpecification>,
}

/// A dotted attribute path resolved against the mapping model.
enum ResolvedPath<'m> {
    Identifier {
        group: NavigablePath,
        entity: &'m EntityMapping,
    },
    Basic {
        group: NavigablePath,
        attribute: &'m BasicAttribute,
    },
    Embedded {
        group: NavigablePath,
        path: NavigablePath,
        attribute: &'m EmbeddedAttribute,
    },
    /// A to-one association, or its identifier read through the foreign key.
    ToOne {
        group: NavigablePath,
        path: NavigablePath,
        attribute: &'m ToOneAttribute,
        target: &'m EntityMapping,
    },
}

/// The entity (or embeddable within it) whose attributes are being fetched.
struct FetchParent<'m> {
    group: NavigablePath,
    entity: &'m EntityMapping,
    value_path: NavigablePath,
    depth: usize,
    custom_instantiation: bool,
}

/// Entity type and path of each entity on the way down to a fetch.
type FetchChain = Vec<(String, NavigablePath)>;

pub struct ResultGraphBuilder<'a> {
    model: &'a MappingModel,
    settings: &'a ResultSettings,
    registry: &'a InstantiatorRegistry,
    alias_generator: SqlAliasBaseGenerator,
    alias_bases: HashMap<NavigablePath, SqlAliasBase>,
    group_entities: HashMap<NavigablePath, &'a EntityMapping>,
    from: FromClause,
    select: SelectClause,
    selections: HashMap<(String, String), usize>,
    join_fetches: HashMap<String, SqlAstJoinType>,
    order_by: Vec<SortSpecification>,
    scroll: bool,
}

impl<'a> ResultGraphBuilder<'a> {
    pub fn new(
        model: &'a MappingModel,
        settings: &'a ResultSettings,
        registry: &'a InstantiatorRegistry,
    ) -> Self {
        Self {
            model,
            settings,
            registry,
            alias_generator: SqlAliasBaseGenerator::new(),
            alias_bases: HashMap::new(),
            group_entities: HashMap::new(),
            from: FromClause::default(),
            select: SelectClause::default(),
            selections: HashMap::new(),
            join_fetches: HashMap::new(),
            order_by: Vec::new(),
            scroll: false,
        }
    }

    /// Request a join fetch of `path`, relative to the query root
    /// (`customer`, `orders.customer`).
    pub fn join_fetch(&mut self, path: impl Into<String>, join_type: SqlAstJoinType) {
        self.join_fetches.insert(path.into(), join_type);
    }

    /// Scrolling disables batch fetching.
    pub fn set_scroll(&mut self, scroll: bool) {
        self.scroll = scroll;
    }

    pub fn set_distinct(&mut self, distinct: bool) {
        self.select.distinct = distinct;
    }

    /// Add a query root and return its path.
    pub fn add_root(&mut self, entity: &str, alias: &str) -> TranslationResult<NavigablePath> {
        let mapping = self.model.entity(entity)?;
        let path = NavigablePath::aliased(&mapping.name, alias);
        let mut base = self.alias_generator.create_base(&mapping.name);
        let table_alias = base.generate_new_alias();
        self.from.roots.push(TableGroup::new(
            path.clone(),
            TableReference::named(&mapping.table, table_alias),
        ));
        self.alias_bases.insert(path.clone(), base);
        self.group_entities.insert(path.clone(), mapping);
        Ok(path)
    }

    /// The entity at `root`, with every attribute fetched per its mapping.
    pub fn entity_result(&mut self, root: &NavigablePath) -> TranslationResult<DomainResult> {
        let entity = self.group_entity(root)?;
        let graph = self.build_entity_graph(root, entity, 0, &Vec::new())?;
        Ok(DomainResult::Entity(graph))
    }

    /// A result for the attribute path `dotted` below `root`.
    pub fn path_result(
        &mut self,
        root: &NavigablePath,
        dotted: &str,
        alias: Option<String>,
    ) -> TranslationResult<DomainResult> {
        match self.resolve_path(root, dotted)? {
            ResolvedPath::Identifier { group, entity } => {
                let id = &entity.identifier;
                let position = self.select_column(&group, None, &id.column, id.jdbc_type)?;
                Ok(basic_result(position, id.jdbc_type, alias))
            }
            ResolvedPath::Basic { group, attribute } => {
                let position = self.select_column(
                    &group,
                    attribute.table.as_deref(),
                    &attribute.column,
                    attribute.jdbc_type,
                )?;
                Ok(basic_result(position, attribute.jdbc_type, alias))
            }
            ResolvedPath::Embedded {
                group,
                path,
                attribute,
            } => {
                let entity = self.group_entity(&group)?;
                let parent = FetchParent {
                    group: group.clone(),
                    entity,
                    depth: path.depth(),
                    value_path: path.clone(),
                    custom_instantiation: attribute.instantiation == EmbeddableInstantiation::Custom,
                };
                let chain = vec![(entity.name.clone(), group)];
                let fetches = self.build_fetches(&parent, &attribute.attributes, &chain)?;
                Ok(DomainResult::Embeddable(EmbeddableGraph {
                    navigable_path: path,
                    type_name: attribute.type_name.clone(),
                    fetches,
                }))
            }
            ResolvedPath::ToOne {
                group,
                path,
                attribute,
                target,
            } => {
                let owner = self.group_entity(&group)?;
                self.ensure_to_one_join(&group, &path, attribute, target, SqlAstJoinType::Inner)?;
                let chain = vec![(owner.name.clone(), group)];
                let graph = self.build_entity_graph(&path, target, path.depth(), &chain)?;
                Ok(DomainResult::Entity(graph))
            }
        }
    }

    /// A dynamic instantiation over already built argument results.
    pub fn instantiation_result(
        &self,
        kind: &InstantiationKind,
        arguments: Vec<(Option<String>, DomainResult)>,
    ) -> TranslationResult<DomainResult> {
        let typed: Vec<_> = arguments
            .iter()
            .map(|(alias, result)| (alias.clone(), result.result_type()))
            .collect();
        let strategy = self.registry.resolve(kind, &typed)?;
        Ok(DomainResult::DynamicInstantiation(DynamicInstantiationResult {
            strategy,
            arguments: arguments
                .into_iter()
                .map(|(alias, result)| InstantiationArgument { alias, result })
                .collect(),
        }))
    }

    /// The SQL expression for an attribute path, for use in restrictions and
    /// ordering. Associations compare through their foreign key; embeddables
    /// become a tuple of their columns.
    pub fn resolve_expression(&mut self, root: &NavigablePath, dotted: &str) -> TranslationResult<Expression> {
        match self.resolve_path(root, dotted)? {
            ResolvedPath::Identifier { group, entity } => {
                let id = &entity.identifier;
                self.column_expression(&group, None, &id.column, id.jdbc_type)
            }
            ResolvedPath::Basic { group, attribute } => self.column_expression(
                &group,
                attribute.table.as_deref(),
                &attribute.column,
                attribute.jdbc_type,
            ),
            ResolvedPath::ToOne {
                group,
                attribute,
                target,
                ..
            } => self.column_expression(
                &group,
                None,
                &attribute.fk_column,
                target.identifier.jdbc_type,
            ),
            ResolvedPath::Embedded {
                group, attribute, ..
            } => {
                let mut columns = Vec::new();
                self.embedded_columns(&group, &attribute.attributes, &mut columns)?;
                Ok(Expression::tuple(columns))
            }
        }
    }

    /// The entity mapped at a table group path.
    pub fn group_entity(&self, group: &NavigablePath) -> TranslationResult<&'a EntityMapping> {
        self.group_entities
            .get(group)
            .copied()
            .ok_or_else(|| TranslationError::InvalidFetch {
                path: group.to_string(),
                reason: "no table group is registered for this path".into(),
            })
    }

    pub fn finish(self) -> BuiltGraph {
        BuiltGraph {
            from: self.from,
            select: self.select,
            order_by: self.order_by,
        }
    }

    // =========================================================================
    // Fetch graph
    // =========================================================================

    fn build_entity_graph(
        &mut self,
        path: &NavigablePath,
        entity: &'a EntityMapping,
        depth: usize,
        ancestors: &FetchChain,
    ) -> TranslationResult<EntityGraph> {
        let id = &entity.identifier;
        let identifier_position = self.select_column(path, None, &id.column, id.jdbc_type)?;

        let mut chain = ancestors.clone();
        chain.push((entity.name.clone(), path.clone()));
        let parent = FetchParent {
            group: path.clone(),
            entity,
            value_path: path.clone(),
            depth,
            custom_instantiation: false,
        };
        let fetches = self.build_fetches(&parent, &entity.attributes, &chain)?;

        Ok(EntityGraph {
            navigable_path: path.clone(),
            entity: entity.name.clone(),
            identifier_position,
            identifier_type: id.jdbc_type,
            fetches,
        })
    }

    fn build_fetches(
        &mut self,
        parent: &FetchParent<'a>,
        attributes: &'a [AttributeMapping],
        chain: &FetchChain,
    ) -> TranslationResult<Vec<Fetch>> {
        let mut fetches = Vec::with_capacity(attributes.len());
        for attribute in attributes {
            let fetch = match attribute {
                AttributeMapping::Basic(basic) => {
                    let position = self.select_column(
                        &parent.group,
                        basic.table.as_deref(),
                        &basic.column,
                        basic.jdbc_type,
                    )?;
                    Fetch::Basic(BasicFetch {
                        navigable_path: parent.value_path.append(&basic.name),
                        position,
                        jdbc_type: basic.jdbc_type,
                    })
                }
                AttributeMapping::Embedded(embedded) => {
                    let child = FetchParent {
                        group: parent.group.clone(),
                        entity: parent.entity,
                        value_path: parent.value_path.append(&embedded.name),
                        depth: parent.depth,
                        custom_instantiation: parent.custom_instantiation
                            || embedded.instantiation == EmbeddableInstantiation::Custom,
                    };
                    let fetches = self.build_fetches(&child, &embedded.attributes, chain)?;
                    Fetch::Embeddable(EmbeddableGraph {
                        navigable_path: child.value_path,
                        type_name: embedded.type_name.clone(),
                        fetches,
                    })
                }
                AttributeMapping::ToOne(to_one) => self.to_one_fetch(parent, to_one, chain)?,
                AttributeMapping::Collection(collection) => {
                    let path = parent.value_path.append(&collection.name);
                    let role = format!("{}.{}", parent.entity.name, collection.name);
                    match self.join_fetches.get(&fetch_key(&path)).copied() {
                        None => Fetch::Plural(PluralFetch {
                            navigable_path: path,
                            role,
                            kind: PluralFetchKind::Delayed,
                        }),
                        Some(join_type) => {
                            let graph = self.joined_collection(parent, &path, collection, join_type, chain)?;
                            Fetch::Plural(PluralFetch {
                                navigable_path: path,
                                role,
                                kind: PluralFetchKind::Joined(graph),
                            })
                        }
                    }
                }
            };
            fetches.push(fetch);
        }
        Ok(fetches)
    }

    fn to_one_fetch(
        &mut self,
        parent: &FetchParent<'a>,
        attribute: &'a ToOneAttribute,
        chain: &FetchChain,
    ) -> TranslationResult<Fetch> {
        let path = parent.value_path.append(&attribute.name);
        let target = self.model.entity(&attribute.target)?;

        if let Some(join_type) = self.join_fetches.get(&fetch_key(&path)).copied() {
            return self.joined_to_one(parent, &path, attribute, target, join_type, chain);
        }

        if let Some((_, ancestor)) = chain.iter().rev().find(|(name, _)| *name == target.name) {
            let referenced_path = ancestor.clone();
            return Ok(Fetch::Circular {
                fetch: self.keyed_fetch(parent, path, attribute, target)?,
                referenced_path,
            });
        }

        match (attribute.timing, attribute.style) {
            (FetchTiming::Delayed, _) => Ok(Fetch::EntityDelayed(
                self.keyed_fetch(parent, path, attribute, target)?,
            )),
            (FetchTiming::Immediate, FetchStyle::Join) => {
                if parent.depth + 1 > self.settings.max_fetch_depth {
                    debug!(path = %path, "maximum fetch depth reached, delaying association");
                    return Ok(Fetch::EntityDelayed(
                        self.keyed_fetch(parent, path, attribute, target)?,
                    ));
                }
                self.joined_to_one(parent, &path, attribute, target, SqlAstJoinType::Left, chain)
            }
            (FetchTiming::Immediate, FetchStyle::Select) => {
                let batch_mode = self.batch_mode(parent, attribute, target);
                Ok(Fetch::EntitySelect {
                    fetch: self.keyed_fetch(parent, path, attribute, target)?,
                    batch_mode,
                })
            }
        }
    }

    fn keyed_fetch(
        &mut self,
        parent: &FetchParent<'a>,
        path: NavigablePath,
        attribute: &ToOneAttribute,
        target: &EntityMapping,
    ) -> TranslationResult<KeyedFetch> {
        let fk_type = target.identifier.jdbc_type;
        let fk_position = self.select_column(&parent.group, None, &attribute.fk_column, fk_type)?;
        Ok(KeyedFetch {
            navigable_path: path,
            entity: target.name.clone(),
            fk_position,
            fk_type,
        })
    }

    fn joined_to_one(
        &mut self,
        parent: &FetchParent<'a>,
        path: &NavigablePath,
        attribute: &ToOneAttribute,
        target: &'a EntityMapping,
        join_type: SqlAstJoinType,
        chain: &FetchChain,
    ) -> TranslationResult<Fetch> {
        self.ensure_to_one_join(&parent.group, path, attribute, target, join_type)?;
        let graph = self.build_entity_graph(path, target, parent.depth + 1, chain)?;
        Ok(Fetch::EntityJoined(graph))
    }

    fn joined_collection(
        &mut self,
        parent: &FetchParent<'a>,
        path: &NavigablePath,
        collection: &'a crate::mapping::CollectionAttribute,
        join_type: SqlAstJoinType,
        chain: &FetchChain,
    ) -> TranslationResult<EntityGraph> {
        let element = self.model.entity(&collection.element_entity)?;
        let back = match element.attribute(&collection.mapped_by) {
            Some(AttributeMapping::ToOne(back)) => back,
            _ => {
                return Err(TranslationError::UnknownAttribute {
                    entity: element.name.clone(),
                    attribute: collection.mapped_by.clone(),
                })
            }
        };
        let owner_id = &parent.entity.identifier;
        let element_path = path.append(ELEMENT_SEGMENT);
        self.ensure_join(&parent.group, &element_path, element, join_type, |owner, alias| {
            Predicate::eq(
                Expression::column(alias, &back.fk_column, owner_id.jdbc_type),
                Expression::column(owner, &owner_id.column, owner_id.jdbc_type),
            )
        })?;

        let graph = self.build_entity_graph(&element_path, element, parent.depth + 1, chain)?;
        for (order_path, order) in &collection.order_by {
            let expression = self.resolve_expression(&element_path, order_path)?;
            self.order_by.push(SortSpecification {
                expression,
                order: *order,
                nulls: Default::default(),
            });
        }
        Ok(graph)
    }

    fn batch_mode(&self, parent: &FetchParent<'a>, attribute: &ToOneAttribute, target: &EntityMapping) -> BatchMode {
        let size = target
            .batch_size
            .unwrap_or(self.settings.default_batch_size);
        if size <= 1 || self.scroll {
            return BatchMode::None;
        }
        if parent.custom_instantiation || attribute.part_of_identifier || parent.entity.has_subclasses {
            BatchMode::BatchInitialize
        } else {
            BatchMode::BatchLoad
        }
    }

    // =========================================================================
    // Table groups and selections
    // =========================================================================

    fn ensure_to_one_join(
        &mut self,
        owner_group: &NavigablePath,
        path: &NavigablePath,
        attribute: &ToOneAttribute,
        target: &'a EntityMapping,
        join_type: SqlAstJoinType,
    ) -> TranslationResult<()> {
        let id = &target.identifier;
        self.ensure_join(owner_group, path, target, join_type, |owner, alias| {
            Predicate::eq(
                Expression::column(owner, &attribute.fk_column, id.jdbc_type),
                Expression::column(alias, &id.column, id.jdbc_type),
            )
        })
    }

    /// Join `target` at `path` below `owner_group` unless a join for the
    /// path exists. `predicate` receives the owner and joined aliases.
    fn ensure_join<F>(
        &mut self,
        owner_group: &NavigablePath,
        path: &NavigablePath,
        target: &'a EntityMapping,
        join_type: SqlAstJoinType,
        predicate: F,
    ) -> TranslationResult<()>
    where
        F: FnOnce(&str, &str) -> Predicate,
    {
        if self.from.find_table_group(path).is_some() {
            return Ok(());
        }
        let mut base = self.alias_generator.create_base(&target.name);
        let alias = base.generate_new_alias();
        let owner = self
            .from
            .find_table_group_mut(owner_group)
            .ok_or_else(|| missing_group(owner_group))?;
        let on = predicate(owner.alias(), &alias);
        owner.resolve_join(path, || {
            Ok(TableGroupJoin {
                join_type,
                joined_group: TableGroup::new(path.clone(), TableReference::named(&target.table, alias)),
                predicate: Some(on),
            })
        })?;
        self.alias_bases.insert(path.clone(), base);
        self.group_entities.insert(path.clone(), target);
        Ok(())
    }

    /// Alias of `table` in the group at `group`, joining a secondary table on
    /// first use.
    fn table_alias(&mut self, group: &NavigablePath, table: Option<&str>) -> TranslationResult<String> {
        let entity = self.group_entity(group)?;
        let table_group = self
            .from
            .find_table_group_mut(group)
            .ok_or_else(|| missing_group(group))?;
        let Some(table) = table else {
            return Ok(table_group.alias().to_string());
        };
        if let Some(reference) = table_group.resolve_table_reference(table) {
            return Ok(reference.alias.clone());
        }

        let secondary = entity.secondary(table).ok_or_else(|| {
            TranslationError::InvalidMapping(format!(
                "{} has no secondary table {}",
                entity.name, table
            ))
        })?;
        let alias = self
            .alias_bases
            .get_mut(group)
            .ok_or_else(|| missing_group(group))?
            .generate_new_alias();
        let id = &entity.identifier;
        let on = Predicate::eq(
            Expression::column(&alias, &secondary.key_column, id.jdbc_type),
            Expression::column(table_group.alias(), &id.column, id.jdbc_type),
        );
        let reference = table_group.resolve_table_reference_join(table, || TableReferenceJoin {
            join_type: SqlAstJoinType::Left,
            reference: TableReference::named(table, alias),
            predicate: Some(on),
        });
        Ok(reference.alias.clone())
    }

    fn column_expression(
        &mut self,
        group: &NavigablePath,
        table: Option<&str>,
        column: &str,
        jdbc_type: JdbcType,
    ) -> TranslationResult<Expression> {
        let alias = self.table_alias(group, table)?;
        Ok(Expression::column(&alias, column, jdbc_type))
    }

    /// Select a column once and return its values array position.
    fn select_column(
        &mut self,
        group: &NavigablePath,
        table: Option<&str>,
        column: &str,
        jdbc_type: JdbcType,
    ) -> TranslationResult<usize> {
        let alias = self.table_alias(group, table)?;
        let key = (alias, column.to_string());
        if let Some(position) = self.selections.get(&key) {
            return Ok(*position);
        }
        let position = self
            .select
            .add(Expression::column(&key.0, column, jdbc_type));
        self.selections.insert(key, position);
        Ok(position)
    }

    fn embedded_columns(
        &mut self,
        group: &NavigablePath,
        attributes: &'a [AttributeMapping],
        columns: &mut Vec<Expression>,
    ) -> TranslationResult<()> {
        for attribute in attributes {
            match attribute {
                AttributeMapping::Basic(basic) => columns.push(self.column_expression(
                    group,
                    basic.table.as_deref(),
                    &basic.column,
                    basic.jdbc_type,
                )?),
                AttributeMapping::Embedded(nested) => {
                    self.embedded_columns(group, &nested.attributes, columns)?
                }
                AttributeMapping::ToOne(to_one) => {
                    let target = self.model.entity(&to_one.target)?;
                    columns.push(self.column_expression(
                        group,
                        None,
                        &to_one.fk_column,
                        target.identifier.jdbc_type,
                    )?);
                }
                AttributeMapping::Collection(_) => {}
            }
        }
        Ok(())
    }

    // =========================================================================
    // Path resolution
    // =========================================================================

    /// Resolve `dotted` below the group at `root`. Intermediate to-one
    /// associations are joined (reusing fetch joins); collections can only
    /// be navigated when join fetched.
    fn resolve_path(&mut self, root: &NavigablePath, dotted: &str) -> TranslationResult<ResolvedPath<'a>> {
        let mut group = root.clone();
        let mut entity = self.group_entity(root)?;
        let mut attributes: &'a [AttributeMapping] = &entity.attributes;
        let mut value_path = root.clone();
        let mut at_entity_level = true;

        let segments: Vec<&str> = dotted.split('.').filter(|s| !s.is_empty()).collect();
        let mut idx = 0;
        while idx < segments.len() {
            let segment = segments[idx];
            let last = idx + 1 == segments.len();

            if at_entity_level && segment == entity.identifier.name {
                if !last {
                    return Err(unknown(entity, segments[idx + 1]));
                }
                return Ok(ResolvedPath::Identifier { group, entity });
            }

            let attribute = attributes
                .iter()
                .find(|a| a.name() == segment)
                .ok_or_else(|| unknown(entity, segment))?;

            match attribute {
                AttributeMapping::Basic(basic) => {
                    if !last {
                        return Err(unknown(entity, segments[idx + 1]));
                    }
                    return Ok(ResolvedPath::Basic {
                        group,
                        attribute: basic,
                    });
                }
                AttributeMapping::Embedded(embedded) => {
                    value_path = value_path.append(&embedded.name);
                    if last {
                        return Ok(ResolvedPath::Embedded {
                            group,
                            path: value_path,
                            attribute: embedded,
                        });
                    }
                    attributes = &embedded.attributes;
                    at_entity_level = false;
                }
                AttributeMapping::ToOne(to_one) => {
                    let target = self.model.entity(&to_one.target)?;
                    let path = value_path.append(&to_one.name);
                    let joined = self.from.find_table_group(&path).is_some();
                    let fk_only = idx + 2 == segments.len()
                        && segments[idx + 1] == target.identifier.name
                        && !joined;
                    if last || fk_only {
                        return Ok(ResolvedPath::ToOne {
                            group,
                            path,
                            attribute: to_one,
                            target,
                        });
                    }
                    self.ensure_to_one_join(&group, &path, to_one, target, SqlAstJoinType::Inner)?;
                    group = path.clone();
                    value_path = path;
                    entity = target;
                    attributes = &target.attributes;
                    at_entity_level = true;
                }
                AttributeMapping::Collection(collection) => {
                    let element_path = value_path.append(&collection.name).append(ELEMENT_SEGMENT);
                    if last || self.from.find_table_group(&element_path).is_none() {
                        return Err(TranslationError::InvalidFetch {
                            path: element_path.to_string(),
                            reason: "collection paths can only be navigated when join fetched".into(),
                        });
                    }
                    entity = self.group_entity(&element_path)?;
                    attributes = &entity.attributes;
                    group = element_path.clone();
                    value_path = element_path;
                    at_entity_level = true;
                }
            }
            idx += 1;
        }

        Err(TranslationError::InvalidFetch {
            path: root.to_string(),
            reason: "empty attribute path".into(),
        })
    }
}

/// Join-fetch lookup key: the path relative to its root, without element
/// segments (`orders.{element}.customer` -> `orders.customer`).
fn fetch_key(path: &NavigablePath) -> String {
    path.relative_path()
        .split('.')
        .filter(|s| *s != ELEMENT_SEGMENT)
        .collect::<Vec<_>>()
        .join(".")
}

fn basic_result(position: usize, jdbc_type: JdbcType, alias: Option<String>) -> DomainResult {
    DomainResult::Basic(BasicResult {
        position,
        jdbc_type,
        alias,
    })
}

fn unknown(entity: &EntityMapping, attribute: &str) -> TranslationError {
    TranslationError::UnknownAttribute {
        entity: entity.name.clone(),
        attribute: attribute.to_string(),
    }
}

fn missing_group(path: &NavigablePath) -> TranslationError {
    TranslationError::InvalidFetch {
        path: path.to_string(),
        reason: "no table group is registered for this path".into(),
    }
}
