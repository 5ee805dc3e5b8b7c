//! Entity and attribute mappings.

use crate::sql::ast::SortOrder;
use crate::value::{JdbcType, SqlValue};

// =============================================================================
// Attributes
// =============================================================================

/// When an association is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchTiming {
    /// With its owner.
    #[default]
    Immediate,
    /// On first access.
    Delayed,
}

/// How an immediately loaded association is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStyle {
    /// Joined into the owner's query.
    Join,
    /// Loaded by a subsequent select.
    #[default]
    Select,
}

/// How an embeddable is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddableInstantiation {
    /// Default construction then attribute injection.
    #[default]
    Standard,
    /// A user-supplied instantiator needing every value up front.
    Custom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierMapping {
    pub name: String,
    pub column: String,
    pub jdbc_type: JdbcType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicAttribute {
    pub name: String,
    pub column: String,
    pub jdbc_type: JdbcType,
    /// Secondary table holding the column, `None` for the primary table.
    pub table: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedAttribute {
    pub name: String,
    pub type_name: String,
    pub attributes: Vec<AttributeMapping>,
    pub instantiation: EmbeddableInstantiation,
}

impl EmbeddedAttribute {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            attributes: Vec::new(),
            instantiation: EmbeddableInstantiation::Standard,
        }
    }

    #[must_use]
    pub fn basic(mut self, name: &str, column: &str, jdbc_type: JdbcType) -> Self {
        self.attributes.push(AttributeMapping::Basic(BasicAttribute {
            name: name.into(),
            column: column.into(),
            jdbc_type,
            table: None,
        }));
        self
    }

    #[must_use]
    pub fn to_one(mut self, attribute: ToOneAttribute) -> Self {
        self.attributes.push(AttributeMapping::ToOne(attribute));
        self
    }

    #[must_use]
    pub fn custom_instantiation(mut self) -> Self {
        self.instantiation = EmbeddableInstantiation::Custom;
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeMapping> {
        self.attributes.iter().find(|a| a.name() == name)
    }
}

/// A many-to-one or one-to-one association through a foreign key column in
/// the owner's table.
#[derive(Debug, Clone, PartialEq)]
pub struct ToOneAttribute {
    pub name: String,
    pub target: String,
    pub fk_column: String,
    pub timing: FetchTiming,
    pub style: FetchStyle,
    /// Whether the association is part of its owner's identifier.
    pub part_of_identifier: bool,
}

impl ToOneAttribute {
    pub fn new(name: impl Into<String>, target: impl Into<String>, fk_column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            fk_column: fk_column.into(),
            timing: FetchTiming::Immediate,
            style: FetchStyle::Select,
            part_of_identifier: false,
        }
    }

    #[must_use]
    pub fn lazy(mut self) -> Self {
        self.timing = FetchTiming::Delayed;
        self
    }

    /// Eagerly join the association into its owner's query.
    #[must_use]
    pub fn joined(mut self) -> Self {
        self.timing = FetchTiming::Immediate;
        self.style = FetchStyle::Join;
        self
    }

    #[must_use]
    pub fn part_of_identifier(mut self) -> Self {
        self.part_of_identifier = true;
        self
    }
}

/// A one-to-many collection owned through `mapped_by`, the to-one attribute
/// of the element entity pointing back to the owner.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionAttribute {
    pub name: String,
    pub element_entity: String,
    pub mapped_by: String,
    /// Element ordering by attribute path (`address.city` reaches into an
    /// embeddable).
    pub order_by: Vec<(String, SortOrder)>,
}

impl CollectionAttribute {
    pub fn new(name: impl Into<String>, element_entity: impl Into<String>, mapped_by: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            element_entity: element_entity.into(),
            mapped_by: mapped_by.into(),
            order_by: Vec::new(),
        }
    }

    #[must_use]
    pub fn order_by(mut self, path: &str, order: SortOrder) -> Self {
        self.order_by.push((path.into(), order));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeMapping {
    Basic(BasicAttribute),
    Embedded(EmbeddedAttribute),
    ToOne(ToOneAttribute),
    Collection(CollectionAttribute),
}

impl AttributeMapping {
    pub fn name(&self) -> &str {
        match self {
            AttributeMapping::Basic(a) => &a.name,
            AttributeMapping::Embedded(a) => &a.name,
            AttributeMapping::ToOne(a) => &a.name,
            AttributeMapping::Collection(a) => &a.name,
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A secondary table joined to the primary table by its key column.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryTable {
    pub table: String,
    pub key_column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityMapping {
    pub name: String,
    pub table: String,
    pub identifier: IdentifierMapping,
    pub attributes: Vec<AttributeMapping>,
    pub secondary_tables: Vec<SecondaryTable>,
    /// Batch size for select fetches of this entity.
    pub batch_size: Option<usize>,
    pub has_subclasses: bool,
    pub discriminator: Option<SqlValue>,
}

impl EntityMapping {
    /// Start a mapping with an integer `id` identifier.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            identifier: IdentifierMapping {
                name: "id".into(),
                column: "id".into(),
                jdbc_type: JdbcType::Integer,
            },
            attributes: Vec::new(),
            secondary_tables: Vec::new(),
            batch_size: None,
            has_subclasses: false,
            discriminator: None,
        }
    }

    #[must_use]
    pub fn id(mut self, name: &str, column: &str, jdbc_type: JdbcType) -> Self {
        self.identifier = IdentifierMapping {
            name: name.into(),
            column: column.into(),
            jdbc_type,
        };
        self
    }

    #[must_use]
    pub fn basic(mut self, name: &str, column: &str, jdbc_type: JdbcType) -> Self {
        self.attributes.push(AttributeMapping::Basic(BasicAttribute {
            name: name.into(),
            column: column.into(),
            jdbc_type,
            table: None,
        }));
        self
    }

    /// A basic attribute stored in a secondary table.
    #[must_use]
    pub fn basic_in(mut self, table: &str, name: &str, column: &str, jdbc_type: JdbcType) -> Self {
        self.attributes.push(AttributeMapping::Basic(BasicAttribute {
            name: name.into(),
            column: column.into(),
            jdbc_type,
            table: Some(table.into()),
        }));
        self
    }

    #[must_use]
    pub fn embedded(mut self, attribute: EmbeddedAttribute) -> Self {
        self.attributes.push(AttributeMapping::Embedded(attribute));
        self
    }

    #[must_use]
    pub fn to_one(mut self, attribute: ToOneAttribute) -> Self {
        self.attributes.push(AttributeMapping::ToOne(attribute));
        self
    }

    #[must_use]
    pub fn one_to_many(mut self, attribute: CollectionAttribute) -> Self {
        self.attributes.push(AttributeMapping::Collection(attribute));
        self
    }

    #[must_use]
    pub fn secondary_table(mut self, table: &str, key_column: &str) -> Self {
        self.secondary_tables.push(SecondaryTable {
            table: table.into(),
            key_column: key_column.into(),
        });
        self
    }

    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    #[must_use]
    pub fn with_subclasses(mut self) -> Self {
        self.has_subclasses = true;
        self
    }

    #[must_use]
    pub fn discriminator(mut self, value: impl Into<SqlValue>) -> Self {
        self.discriminator = Some(value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeMapping> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    pub fn secondary(&self, table: &str) -> Option<&SecondaryTable> {
        self.secondary_tables.iter().find(|s| s.table == table)
    }
}
