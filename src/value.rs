//! Values flowing through the engine.
//!
//! Two layers of values exist:
//!
//! - [`SqlValue`] - a raw value bound to a statement parameter or extracted
//!   from a result set column.
//! - [`DomainValue`] - a materialized value handed back to callers: scalars,
//!   entity handles, embeddables, collections and dynamic instantiations.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::engine::persistence::{CollectionHandle, EntityHandle};

// =============================================================================
// JDBC Types
// =============================================================================

/// Column/parameter type used for binding, extraction and literal rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JdbcType {
    Integer,
    Double,
    Varchar,
    Boolean,
    Binary,
    Date,
    Timestamp,
    /// Unknown or polymorphic type (derived columns, untyped parameters).
    Object,
}

impl JdbcType {
    pub fn name(&self) -> &'static str {
        match self {
            JdbcType::Integer => "integer",
            JdbcType::Double => "double",
            JdbcType::Varchar => "varchar",
            JdbcType::Boolean => "boolean",
            JdbcType::Binary => "binary",
            JdbcType::Date => "date",
            JdbcType::Timestamp => "timestamp",
            JdbcType::Object => "object",
        }
    }

    /// Whether values of `other` can be stored in a slot of this type.
    pub fn accepts(&self, other: JdbcType) -> bool {
        match (self, other) {
            (JdbcType::Object, _) => true,
            (a, b) if *a == b => true,
            (JdbcType::Double, JdbcType::Integer) => true,
            (JdbcType::Timestamp, JdbcType::Date) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JdbcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// SQL Values
// =============================================================================

/// A raw value read from or written to the database.
///
/// Equality and hashing are total: floats compare by bit pattern so values
/// can key identity maps and de-duplication sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Float(f) => Some(*f),
            SqlValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The natural JDBC type of this value.
    pub fn jdbc_type(&self) -> JdbcType {
        match self {
            SqlValue::Null => JdbcType::Object,
            SqlValue::Bool(_) => JdbcType::Boolean,
            SqlValue::Int(_) => JdbcType::Integer,
            SqlValue::Float(_) => JdbcType::Double,
            SqlValue::Text(_) => JdbcType::Varchar,
            SqlValue::Bytes(_) => JdbcType::Binary,
        }
    }

    /// Coerce an extracted value into the representation `target` expects.
    ///
    /// Drivers without a native boolean type hand back integers, and numeric
    /// columns may come back as integers when the stored value is integral.
    pub fn coerce(self, target: JdbcType) -> Result<SqlValue, String> {
        match (target, self) {
            (_, SqlValue::Null) => Ok(SqlValue::Null),
            (JdbcType::Object, v) => Ok(v),
            (JdbcType::Boolean, SqlValue::Bool(b)) => Ok(SqlValue::Bool(b)),
            (JdbcType::Boolean, SqlValue::Int(n)) => match n {
                0 => Ok(SqlValue::Bool(false)),
                1 => Ok(SqlValue::Bool(true)),
                other => Err(format!("cannot read {} as boolean", other)),
            },
            (JdbcType::Integer, SqlValue::Int(n)) => Ok(SqlValue::Int(n)),
            (JdbcType::Integer, SqlValue::Float(f)) if f.fract() == 0.0 => {
                Ok(SqlValue::Int(f as i64))
            }
            (JdbcType::Double, SqlValue::Float(f)) => Ok(SqlValue::Float(f)),
            (JdbcType::Double, SqlValue::Int(n)) => Ok(SqlValue::Float(n as f64)),
            (JdbcType::Varchar | JdbcType::Date | JdbcType::Timestamp, SqlValue::Text(s)) => {
                Ok(SqlValue::Text(s))
            }
            (JdbcType::Binary, SqlValue::Bytes(b)) => Ok(SqlValue::Bytes(b)),
            (JdbcType::Binary, SqlValue::Text(s)) => Ok(SqlValue::Bytes(s.into_bytes())),
            (target, other) => Err(format!(
                "cannot read {} value as {}",
                other.jdbc_type(),
                target
            )),
        }
    }
}

impl PartialEq for SqlValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SqlValue::Null, SqlValue::Null) => true,
            (SqlValue::Bool(a), SqlValue::Bool(b)) => a == b,
            (SqlValue::Int(a), SqlValue::Int(b)) => a == b,
            (SqlValue::Float(a), SqlValue::Float(b)) => a.to_bits() == b.to_bits(),
            (SqlValue::Text(a), SqlValue::Text(b)) => a == b,
            (SqlValue::Bytes(a), SqlValue::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for SqlValue {}

impl Hash for SqlValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            SqlValue::Null => {}
            SqlValue::Bool(b) => b.hash(state),
            SqlValue::Int(n) => n.hash(state),
            SqlValue::Float(f) => f.to_bits().hash(state),
            SqlValue::Text(s) => s.hash(state),
            SqlValue::Bytes(b) => b.hash(state),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("null"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Int(n) => write!(f, "{}", n),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Text(s) => write!(f, "'{}'", s),
            SqlValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Int(n)
    }
}

impl From<i32> for SqlValue {
    fn from(n: i32) -> Self {
        SqlValue::Int(n as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        SqlValue::Float(f)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(b)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.into())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

// =============================================================================
// Value Types (result typing)
// =============================================================================

/// The declared type of a domain result or of a constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Scalar(JdbcType),
    Entity(String),
    Embeddable(String),
    Object(String),
    List,
    Map,
    /// Accepts any argument (an untyped constructor parameter).
    Any,
}

impl ValueType {
    /// Assignment compatibility of an argument of type `arg` to a slot of
    /// this type.
    pub fn is_assignable_from(&self, arg: &ValueType) -> bool {
        match (self, arg) {
            (ValueType::Any, _) => true,
            (ValueType::Scalar(slot), ValueType::Scalar(value)) => slot.accepts(*value),
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Scalar(t) => write!(f, "{}", t),
            ValueType::Entity(name) => write!(f, "entity {}", name),
            ValueType::Embeddable(name) => write!(f, "embeddable {}", name),
            ValueType::Object(name) => write!(f, "{}", name),
            ValueType::List => f.write_str("list"),
            ValueType::Map => f.write_str("map"),
            ValueType::Any => f.write_str("any"),
        }
    }
}

// =============================================================================
// Domain Values
// =============================================================================

/// A materialized value produced by the result graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DomainValue {
    Null,
    Scalar(SqlValue),
    /// A managed entity instance, identity-comparable through its handle.
    Entity(EntityHandle),
    Collection(CollectionHandle),
    Embeddable(EmbeddableValue),
    /// Result of a dynamic instantiation into a registered type.
    Object(DynamicObject),
    List(Vec<DomainValue>),
    Map(Vec<(String, DomainValue)>),
    Tuple(Vec<DomainValue>),
}

impl DomainValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DomainValue::Null)
    }

    pub fn as_entity(&self) -> Option<EntityHandle> {
        match self {
            DomainValue::Entity(h) => Some(*h),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<CollectionHandle> {
        match self {
            DomainValue::Collection(h) => Some(*h),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&SqlValue> {
        match self {
            DomainValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&DynamicObject> {
        match self {
            DomainValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_embeddable(&self) -> Option<&EmbeddableValue> {
        match self {
            DomainValue::Embeddable(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SqlValue> for DomainValue {
    fn from(v: SqlValue) -> Self {
        if v.is_null() {
            DomainValue::Null
        } else {
            DomainValue::Scalar(v)
        }
    }
}

/// An embeddable (composite) value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmbeddableValue {
    pub type_name: String,
    pub attributes: Vec<(String, DomainValue)>,
}

impl EmbeddableValue {
    pub fn get(&self, name: &str) -> Option<&DomainValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// An instance of a registered instantiation target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DynamicObject {
    pub type_name: String,
    pub fields: Vec<(String, DomainValue)>,
}

impl DynamicObject {
    pub fn get(&self, name: &str) -> Option<&DomainValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}
