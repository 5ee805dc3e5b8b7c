//! FROM clause nodes: table references, table groups and their joins.
//!
//! A [`TableGroup`] is the set of table references backing one navigable
//! path (an entity's primary table plus its secondary tables). Groups nest
//! through [`TableGroupJoin`]s; joins created late (while building fetches)
//! are memoized by path through [`TableGroup::resolve_join`].

use std::collections::HashMap;

use crate::error::TranslationResult;
use crate::path::NavigablePath;

use super::predicate::Predicate;
use super::select::QueryPart;

// =============================================================================
// Aliases
// =============================================================================

/// Hands out alias stems (`o1`, `o2`, `c1`) per acronym.
#[derive(Debug, Clone, Default)]
pub struct SqlAliasBaseGenerator {
    counts: HashMap<String, usize>,
}

impl SqlAliasBaseGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new alias base for an entity or table name.
    pub fn create_base(&mut self, name: &str) -> SqlAliasBase {
        let acronym = name
            .chars()
            .find(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .unwrap_or('t')
            .to_string();
        let count = self.counts.entry(acronym.clone()).or_insert(0);
        *count += 1;
        SqlAliasBase {
            stem: format!("{}{}", acronym, count),
            next: 0,
        }
    }
}

/// An alias stem producing `stem_0`, `stem_1`, ... for the table references
/// of one table group.
#[derive(Debug, Clone)]
pub struct SqlAliasBase {
    stem: String,
    next: usize,
}

impl SqlAliasBase {
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn generate_new_alias(&mut self) -> String {
        let alias = format!("{}_{}", self.stem, self.next);
        self.next += 1;
        alias
    }
}

// =============================================================================
// Table References
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum TableExpression {
    Named(String),
    /// A derived table, `(select ...) alias`.
    Derived(Box<QueryPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableReference {
    pub table: TableExpression,
    pub alias: String,
}

impl TableReference {
    pub fn named(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: TableExpression::Named(table.into()),
            alias: alias.into(),
        }
    }

    pub fn derived(query: QueryPart, alias: impl Into<String>) -> Self {
        Self {
            table: TableExpression::Derived(Box::new(query)),
            alias: alias.into(),
        }
    }

    /// Table name for named references.
    pub fn table_name(&self) -> Option<&str> {
        match &self.table {
            TableExpression::Named(name) => Some(name),
            TableExpression::Derived(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlAstJoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl SqlAstJoinType {
    /// Whether rows of the joined side may be absent.
    pub fn is_outer(&self) -> bool {
        matches!(
            self,
            SqlAstJoinType::Left | SqlAstJoinType::Right | SqlAstJoinType::Full
        )
    }
}

/// A secondary table joined to a group's primary table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableReferenceJoin {
    pub join_type: SqlAstJoinType,
    pub reference: TableReference,
    pub predicate: Option<Predicate>,
}

// =============================================================================
// Table Groups
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TableGroup {
    pub navigable_path: NavigablePath,
    pub primary: TableReference,
    pub table_reference_joins: Vec<TableReferenceJoin>,
    pub joins: Vec<TableGroupJoin>,
}

impl TableGroup {
    pub fn new(navigable_path: NavigablePath, primary: TableReference) -> Self {
        Self {
            navigable_path,
            primary,
            table_reference_joins: Vec::new(),
            joins: Vec::new(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.primary.alias
    }

    /// Find the reference for `table` among the primary and secondary tables.
    pub fn resolve_table_reference(&self, table: &str) -> Option<&TableReference> {
        if self.primary.table_name() == Some(table) {
            return Some(&self.primary);
        }
        self.table_reference_joins
            .iter()
            .map(|j| &j.reference)
            .find(|r| r.table_name() == Some(table))
    }

    /// Return the reference for secondary `table`, joining it with `creator`
    /// on first use.
    pub fn resolve_table_reference_join<F>(&mut self, table: &str, creator: F) -> &TableReference
    where
        F: FnOnce() -> TableReferenceJoin,
    {
        let existing = self
            .table_reference_joins
            .iter()
            .position(|j| j.reference.table_name() == Some(table));
        let idx = match existing {
            Some(idx) => idx,
            None => {
                self.table_reference_joins.push(creator());
                self.table_reference_joins.len() - 1
            }
        };
        &self.table_reference_joins[idx].reference
    }

    /// Return the group joined at `path`, creating the join with `creator`
    /// the first time the path is seen.
    pub fn resolve_join<F>(&mut self, path: &NavigablePath, creator: F) -> TranslationResult<&mut TableGroup>
    where
        F: FnOnce() -> TranslationResult<TableGroupJoin>,
    {
        let existing = self
            .joins
            .iter()
            .position(|j| &j.joined_group.navigable_path == path);
        let idx = match existing {
            Some(idx) => idx,
            None => {
                self.joins.push(creator()?);
                self.joins.len() - 1
            }
        };
        Ok(&mut self.joins[idx].joined_group)
    }

    pub fn find_table_group(&self, path: &NavigablePath) -> Option<&TableGroup> {
        if &self.navigable_path == path {
            return Some(self);
        }
        self.joins
            .iter()
            .find_map(|j| j.joined_group.find_table_group(path))
    }

    pub fn find_table_group_mut(&mut self, path: &NavigablePath) -> Option<&mut TableGroup> {
        if &self.navigable_path == path {
            return Some(self);
        }
        self.joins
            .iter_mut()
            .find_map(|j| j.joined_group.find_table_group_mut(path))
    }

    /// Whether any table of this group or a nested group is outer joined.
    pub fn has_outer_joins(&self) -> bool {
        self.table_reference_joins
            .iter()
            .any(|j| j.join_type.is_outer())
            || self
                .joins
                .iter()
                .any(|j| j.join_type.is_outer() || j.joined_group.has_outer_joins())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableGroupJoin {
    pub join_type: SqlAstJoinType,
    pub joined_group: TableGroup,
    pub predicate: Option<Predicate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FromClause {
    pub roots: Vec<TableGroup>,
}

impl FromClause {
    pub fn new(roots: Vec<TableGroup>) -> Self {
        Self { roots }
    }

    pub fn find_table_group(&self, path: &NavigablePath) -> Option<&TableGroup> {
        self.roots.iter().find_map(|r| r.find_table_group(path))
    }

    pub fn find_table_group_mut(&mut self, path: &NavigablePath) -> Option<&mut TableGroup> {
        self.roots
            .iter_mut()
            .find_map(|r| r.find_table_group_mut(path))
    }

    pub fn has_outer_joins(&self) -> bool {
        self.roots.iter().any(TableGroup::has_outer_joins)
    }
}
