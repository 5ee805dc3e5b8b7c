//! Navigable paths - hierarchical identifiers for positions in a query's
//! logical shape.
//!
//! A path is rooted at a query root (`Order`, optionally aliased `Order(o)`)
//! and grows by appending attribute names (`Order(o).customer.orders`).
//! Paths key table groups, selection caches and initializers, so equality is
//! defined purely by the full string form.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Segment naming an entity identifier.
pub const IDENTIFIER_SEGMENT: &str = "{id}";
/// Segment naming a collection's element.
pub const ELEMENT_SEGMENT: &str = "{element}";
/// Segment naming a collection's index/key.
pub const INDEX_SEGMENT: &str = "{index}";
/// Segment naming a foreign key.
pub const FOREIGN_KEY_SEGMENT: &str = "{fk}";

/// A dotted, hierarchical identifier.
#[derive(Clone)]
pub struct NavigablePath {
    parent: Option<Arc<NavigablePath>>,
    local_name: String,
    alias: Option<String>,
    full_path: String,
}

impl NavigablePath {
    /// Create a root path.
    pub fn new(root: impl Into<String>) -> Self {
        let local_name = root.into();
        Self {
            parent: None,
            full_path: local_name.clone(),
            local_name,
            alias: None,
        }
    }

    /// Create an aliased root path, rendered as `Root(alias)`.
    pub fn aliased(root: impl Into<String>, alias: impl Into<String>) -> Self {
        let local_name = root.into();
        let alias = alias.into();
        Self {
            parent: None,
            full_path: format!("{}({})", local_name, alias),
            local_name,
            alias: Some(alias),
        }
    }

    /// Append a segment.
    pub fn append(&self, segment: impl Into<String>) -> Self {
        let local_name = segment.into();
        Self {
            parent: Some(Arc::new(self.clone())),
            full_path: format!("{}.{}", self.full_path, local_name),
            local_name,
            alias: None,
        }
    }

    /// Append a dotted continuation (`address.city`) one segment at a time.
    pub fn append_all(&self, dotted: &str) -> Self {
        dotted
            .split('.')
            .filter(|s| !s.is_empty())
            .fold(self.clone(), |path, segment| path.append(segment))
    }

    pub fn parent(&self) -> Option<&NavigablePath> {
        self.parent.as_deref()
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Number of segments below the root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(p) = current {
            depth += 1;
            current = p.parent();
        }
        depth
    }

    /// The root of this path.
    pub fn root(&self) -> &NavigablePath {
        let mut current = self;
        while let Some(p) = current.parent() {
            current = p;
        }
        current
    }

    /// Whether `self` is `other` or one of its ancestors.
    pub fn is_parent_or_equal(&self, other: &NavigablePath) -> bool {
        let mut current = Some(other);
        while let Some(p) = current {
            if p == self {
                return true;
            }
            current = p.parent();
        }
        false
    }

    /// The path relative to the root, without the root segment
    /// (`Order(o).customer.name` -> `customer.name`).
    pub fn relative_path(&self) -> String {
        let root_len = self.root().full_path.len();
        self.full_path
            .get(root_len + 1..)
            .unwrap_or_default()
            .to_string()
    }
}

impl PartialEq for NavigablePath {
    fn eq(&self, other: &Self) -> bool {
        self.full_path == other.full_path
    }
}

impl Eq for NavigablePath {}

impl Hash for NavigablePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_path.hash(state);
    }
}

impl fmt::Display for NavigablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path)
    }
}

impl fmt::Debug for NavigablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NavigablePath({})", self.full_path)
    }
}
