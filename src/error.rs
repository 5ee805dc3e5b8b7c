//! Error types for translation and execution.
//!
//! - [`TranslationError`] - structural problems found while building the
//!   result graph or translating the SQL AST. Never retryable.
//! - [`ExecutionError`] - driver failures converted through the dialect into
//!   a database-agnostic [`SqlErrorKind`], carrying the SQL text.
//! - [`QueryError`] - everything a caller of the engine can observe,
//!   including duplicate-row violations and suppressed cleanup failures.

use std::fmt;

use thiserror::Error;

use crate::config::SettingsError;
use crate::value::SqlValue;

/// Result type for translation and result-graph construction.
pub type TranslationResult<T> = Result<T, TranslationError>;

/// Result type for query execution.
pub type QueryResult<T> = Result<T, QueryError>;

/// Structural errors in a query tree or result graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// A column reference names a qualifier that is not an alias in scope.
    #[error("column reference {qualifier}.{column} does not resolve to a table reference in scope")]
    UnresolvedColumnReference { qualifier: String, column: String },

    /// A function pattern received fewer arguments than it references.
    #[error("function pattern `{pattern}` references {expected} arguments but {supplied} were supplied")]
    FunctionArgumentCount {
        pattern: String,
        expected: usize,
        supplied: usize,
    },

    /// A function pattern could not be parsed.
    #[error("invalid function pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("unknown attribute {entity}.{attribute}")]
    UnknownAttribute { entity: String, attribute: String },

    #[error("invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("invalid fetch at {path}: {reason}")]
    InvalidFetch { path: String, reason: String },

    #[error("unknown instantiation target: {0}")]
    UnknownInstantiationTarget(String),

    /// No declared constructor accepts the argument types, and property
    /// injection was not possible.
    #[error("no constructor of {target} accepts ({arguments})")]
    NoMatchingConstructor { target: String, arguments: String },

    #[error("argument {position} of {target} instantiation has no alias")]
    MissingInstantiationAlias { target: String, position: usize },

    #[error("duplicate alias `{alias}` in {target} instantiation")]
    DuplicateInstantiationAlias { target: String, alias: String },

    #[error("{dialect} does not support {feature}")]
    UnsupportedFeature { dialect: String, feature: String },

    /// A bulk mutation that cannot be expressed against its target tables.
    #[error("invalid mutation of {entity}: {reason}")]
    InvalidMutation { entity: String, reason: String },

    /// A literal that cannot be inlined into SQL text.
    #[error("invalid literal: {0}")]
    InvalidLiteral(String),
}

// =============================================================================
// Execution Errors
// =============================================================================

/// Database-agnostic classification of a driver error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlErrorKind {
    ConstraintViolation,
    DataException,
    SyntaxError,
    LockTimeout,
    ConnectionFailure,
    Generic,
}

impl fmt::Display for SqlErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SqlErrorKind::ConstraintViolation => "constraint violation",
            SqlErrorKind::DataException => "data exception",
            SqlErrorKind::SyntaxError => "SQL grammar error",
            SqlErrorKind::LockTimeout => "lock timeout",
            SqlErrorKind::ConnectionFailure => "connection failure",
            SqlErrorKind::Generic => "JDBC exception",
        })
    }
}

/// A raw error raised by the connection layer.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct SqlException {
    pub message: String,
    /// Five-character SQLSTATE, when the driver reports one.
    pub sql_state: Option<String>,
    /// Vendor-specific error code.
    pub vendor_code: Option<i32>,
}

impl SqlException {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql_state: None,
            vendor_code: None,
        }
    }

    pub fn with_sql_state(mut self, state: impl Into<String>) -> Self {
        self.sql_state = Some(state.into());
        self
    }

    pub fn with_vendor_code(mut self, code: i32) -> Self {
        self.vendor_code = Some(code);
        self
    }
}

/// A driver error converted into a structured, database-agnostic error.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}{}", location(.sql, .position))]
pub struct ExecutionError {
    pub kind: SqlErrorKind,
    pub message: String,
    pub sql: Option<String>,
    /// 1-based JDBC position of the offending parameter or column.
    pub position: Option<usize>,
    #[source]
    pub source: Option<SqlException>,
}

impl ExecutionError {
    pub fn new(kind: SqlErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            sql: None,
            position: None,
            source: None,
        }
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_source(mut self, source: SqlException) -> Self {
        self.source = Some(source);
        self
    }
}

fn location(sql: &Option<String>, position: &Option<usize>) -> String {
    let mut out = String::new();
    if let Some(p) = position {
        out.push_str(&format!(" (position {})", p));
    }
    if let Some(s) = sql {
        out.push_str(&format!(" [{}]", s));
    }
    out
}

// =============================================================================
// Query Errors
// =============================================================================

/// Any failure observable by a caller of the engine.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Configuration(#[from] SettingsError),

    /// A parameter in the translated statement has no bound value.
    #[error("no value bound for parameter #{0}")]
    UnboundParameter(usize),

    /// A duplicate row was found while uniqueness was asserted.
    #[error("duplicate row detected for result type {result_type} while asserting uniqueness")]
    DuplicateRow { result_type: String },

    #[error("entity {entity}#{id} not found")]
    EntityNotFound { entity: String, id: SqlValue },

    /// The engine was asked to do something its state does not allow.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A primary failure with errors raised afterwards during cleanup.
    #[error("{primary}")]
    Suppressed {
        #[source]
        primary: Box<QueryError>,
        suppressed: Vec<QueryError>,
    },
}

impl QueryError {
    /// Attach a cleanup failure to this error without masking it.
    pub fn with_suppressed(self, cleanup: QueryError) -> Self {
        match self {
            QueryError::Suppressed {
                primary,
                mut suppressed,
            } => {
                suppressed.push(cleanup);
                QueryError::Suppressed {
                    primary,
                    suppressed,
                }
            }
            primary => QueryError::Suppressed {
                primary: Box::new(primary),
                suppressed: vec![cleanup],
            },
        }
    }

    /// The original error, looking through suppression wrappers.
    pub fn primary(&self) -> &QueryError {
        match self {
            QueryError::Suppressed { primary, .. } => primary.primary(),
            other => other,
        }
    }

    /// Cleanup errors attached to this error.
    pub fn suppressed(&self) -> &[QueryError] {
        match self {
            QueryError::Suppressed { suppressed, .. } => suppressed,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_error_display_carries_sql() {
        let err = ExecutionError::new(SqlErrorKind::DataException, "could not extract column")
            .with_sql("SELECT 1")
            .with_position(3);
        let msg = err.to_string();
        assert!(msg.contains("data exception"));
        assert!(msg.contains("position 3"));
        assert!(msg.contains("[SELECT 1]"));
    }

    #[test]
    fn test_with_suppressed_keeps_primary() {
        let primary = QueryError::IllegalState("row read failed".into());
        let cleanup = QueryError::IllegalState("close failed".into());
        let combined = primary.with_suppressed(cleanup);

        assert!(matches!(combined.primary(), QueryError::IllegalState(m) if m == "row read failed"));
        assert_eq!(combined.suppressed().len(), 1);
        assert_eq!(combined.to_string(), "illegal state: row read failed");
    }

    #[test]
    fn test_with_suppressed_accumulates() {
        let combined = QueryError::IllegalState("a".into())
            .with_suppressed(QueryError::IllegalState("b".into()))
            .with_suppressed(QueryError::IllegalState("c".into()));
        assert_eq!(combined.suppressed().len(), 2);
    }
}
