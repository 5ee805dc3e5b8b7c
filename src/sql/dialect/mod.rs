//! SQL Dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for SQL dialect differences.
//! Each dialect implements `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting: `"` (PG/DuckDB/SQLite), `` ` `` (MySQL), `[]` (T-SQL)
//! - Pagination: LIMIT/OFFSET vs OFFSET FETCH
//! - Boolean literals: true/false vs 1/0
//! - Pessimistic locking: FOR UPDATE, FOR UPDATE OF, table hints, or nothing
//! - Function templates consumed by the pattern renderer
//! - Conversion of driver errors into [`SqlErrorKind`]
//!
//! # Usage
//!
//! ```ignore
//! use strata::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! let quoted = dialect.quote_identifier("user");  // "user"
//! ```
//!
//! # Locking Support
//!
//! | Feature | PostgreSQL | SQL Server | MySQL | DuckDB | SQLite |
//! |---------|-----------|------------|-------|--------|--------|
//! | FOR UPDATE | ✓ | hint | ✓ | ❌ | ❌ |
//! | FOR UPDATE OF | ✓ | ❌ | 8.0+ | ❌ | ❌ |
//! | Outer join FOR UPDATE | ❌ | ✓ | ✓ | ❌ | ❌ |
//! | Row value constructor | ✓ | ❌ | ✓ | ✓ | 3.15+ |
//!
//! Check dialect feature flags (e.g., `supports_for_update_of()`) before
//! generating SQL that uses these features.

mod duckdb;
pub mod helpers;
mod mysql;
mod postgres;
mod sqlite;
mod tsql;

pub use duckdb::DuckDb;
pub use mysql::MySql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;
pub use tsql::TSql;

use serde::{Deserialize, Serialize};

use crate::error::{SqlErrorKind, SqlException};
use crate::sql::ast::LockMode;

/// How a dialect expresses OFFSET/FETCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationStyle {
    /// `LIMIT n OFFSET m`
    LimitOffset,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`
    OffsetFetch,
}

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// Implementations handle dialect-specific syntax differences.
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    ///
    /// All dialects use single quotes with `''` for escaping.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str;

    /// Format a date literal.
    fn format_date_literal(&self, date: &str) -> String {
        format!("DATE '{}'", date)
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    fn pagination_style(&self) -> PaginationStyle {
        PaginationStyle::LimitOffset
    }

    /// Whether this dialect requires ORDER BY for OFFSET/FETCH.
    fn requires_order_by_for_offset(&self) -> bool {
        false
    }

    /// LIMIT value standing in for "no limit" when only an offset is given,
    /// for dialects that do not accept a bare OFFSET.
    fn unbounded_limit(&self) -> Option<&'static str> {
        None
    }

    // =========================================================================
    // Operators and Predicates
    // =========================================================================

    /// String concatenation operator.
    fn concat_operator(&self) -> &'static str {
        "||"
    }

    /// Whether this dialect supports NULLS FIRST/LAST in ORDER BY.
    fn supports_nulls_ordering(&self) -> bool {
        true
    }

    /// Whether `(a, b) = (?, ?)` is accepted. When it is not, tuple
    /// comparisons are expanded into a conjunction of column comparisons.
    fn supports_row_value_constructor(&self) -> bool {
        true
    }

    // =========================================================================
    // Locking
    // =========================================================================

    /// Whether pessimistic locks can be expressed at all.
    fn supports_locking(&self) -> bool {
        true
    }

    /// Trailing lock clause for the given mode.
    fn lock_clause(&self, mode: LockMode) -> &'static str {
        match mode {
            LockMode::PessimisticRead => "FOR SHARE",
            LockMode::PessimisticWrite => "FOR UPDATE",
        }
    }

    /// Table hint rendered after each table reference instead of a trailing
    /// lock clause.
    fn table_lock_hint(&self, mode: LockMode) -> Option<&'static str> {
        let _ = mode;
        None
    }

    /// Whether FOR UPDATE may be applied to a query with outer joins.
    fn supports_outer_join_for_update(&self) -> bool {
        true
    }

    /// Whether the lock clause can be restricted with `OF alias, ...`.
    fn supports_for_update_of(&self) -> bool {
        false
    }

    // =========================================================================
    // Functions
    // =========================================================================

    /// Rendering template for a function, consumed by the pattern renderer.
    ///
    /// Returns `None` for functions rendered generically as `NAME(args)`.
    fn function_pattern(&self, name: &str) -> Option<String> {
        helpers::standard_function_pattern(name, self.concat_operator())
    }

    /// Remap a function name for this dialect.
    ///
    /// Returns `Some(new_name)` if the function should be remapped, `None` to keep original.
    /// The input is matched case-insensitively.
    fn remap_function(&self, name: &str) -> Option<&'static str> {
        let _ = name;
        None
    }

    // =========================================================================
    // Exception Conversion
    // =========================================================================

    /// Classify a driver error.
    fn convert_exception(&self, exception: &SqlException) -> SqlErrorKind {
        exception
            .sql_state
            .as_deref()
            .map(helpers::classify_sql_state)
            .unwrap_or(SqlErrorKind::Generic)
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Postgres,
    MySql,
    TSql,
    DuckDb,
    Sqlite,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::MySql => &MySql,
            Dialect::TSql => &TSql,
            Dialect::DuckDb => &DuckDb,
            Dialect::Sqlite => &Sqlite,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn format_date_literal(&self, date: &str) -> String {
        self.dialect().format_date_literal(date)
    }

    fn pagination_style(&self) -> PaginationStyle {
        self.dialect().pagination_style()
    }

    fn requires_order_by_for_offset(&self) -> bool {
        self.dialect().requires_order_by_for_offset()
    }

    fn unbounded_limit(&self) -> Option<&'static str> {
        self.dialect().unbounded_limit()
    }

    fn concat_operator(&self) -> &'static str {
        self.dialect().concat_operator()
    }

    fn supports_nulls_ordering(&self) -> bool {
        self.dialect().supports_nulls_ordering()
    }

    fn supports_row_value_constructor(&self) -> bool {
        self.dialect().supports_row_value_constructor()
    }

    fn supports_locking(&self) -> bool {
        self.dialect().supports_locking()
    }

    fn lock_clause(&self, mode: LockMode) -> &'static str {
        self.dialect().lock_clause(mode)
    }

    fn table_lock_hint(&self, mode: LockMode) -> Option<&'static str> {
        self.dialect().table_lock_hint(mode)
    }

    fn supports_outer_join_for_update(&self) -> bool {
        self.dialect().supports_outer_join_for_update()
    }

    fn supports_for_update_of(&self) -> bool {
        self.dialect().supports_for_update_of()
    }

    fn function_pattern(&self, name: &str) -> Option<String> {
        self.dialect().function_pattern(name)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        self.dialect().remap_function(name)
    }

    fn convert_exception(&self, exception: &SqlException) -> SqlErrorKind {
        self.dialect().convert_exception(exception)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_display() {
        assert_eq!(Dialect::DuckDb.to_string(), "duckdb");
        assert_eq!(Dialect::Postgres.to_string(), "postgres");
        assert_eq!(Dialect::TSql.to_string(), "tsql");
        assert_eq!(Dialect::MySql.to_string(), "mysql");
        assert_eq!(Dialect::Sqlite.to_string(), "sqlite");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(Dialect::DuckDb.quote_identifier("users"), "\"users\"");
        assert_eq!(Dialect::Postgres.quote_identifier("users"), "\"users\"");
        assert_eq!(Dialect::TSql.quote_identifier("users"), "[users]");
        assert_eq!(Dialect::MySql.quote_identifier("users"), "`users`");
        assert_eq!(Dialect::Sqlite.quote_identifier("users"), "\"users\"");
    }

    #[test]
    fn test_quote_identifier_escaping() {
        assert_eq!(
            Dialect::DuckDb.quote_identifier("weird\"name"),
            "\"weird\"\"name\""
        );
        assert_eq!(
            Dialect::TSql.quote_identifier("weird]name"),
            "[weird]]name]"
        );
        assert_eq!(
            Dialect::MySql.quote_identifier("weird`name"),
            "`weird``name`"
        );
    }

    #[test]
    fn test_format_bool() {
        assert_eq!(Dialect::DuckDb.format_bool(true), "true");
        assert_eq!(Dialect::Postgres.format_bool(false), "false");
        assert_eq!(Dialect::TSql.format_bool(true), "1");
        assert_eq!(Dialect::MySql.format_bool(false), "0");
        assert_eq!(Dialect::Sqlite.format_bool(true), "1");
    }

    #[test]
    fn test_pagination_style() {
        assert_eq!(Dialect::TSql.pagination_style(), PaginationStyle::OffsetFetch);
        assert!(Dialect::TSql.requires_order_by_for_offset());
        assert_eq!(
            Dialect::Postgres.pagination_style(),
            PaginationStyle::LimitOffset
        );
        assert_eq!(Dialect::Sqlite.unbounded_limit(), Some("-1"));
        assert_eq!(Dialect::Postgres.unbounded_limit(), None);
    }

    #[test]
    fn test_locking_capabilities() {
        assert!(!Dialect::Postgres.supports_outer_join_for_update());
        assert!(Dialect::Postgres.supports_for_update_of());
        assert!(Dialect::MySql.supports_outer_join_for_update());
        assert_eq!(
            Dialect::TSql.table_lock_hint(LockMode::PessimisticWrite),
            Some("WITH (UPDLOCK, ROWLOCK)")
        );
        assert!(!Dialect::Sqlite.supports_locking());
        assert!(!Dialect::DuckDb.supports_locking());
    }

    #[test]
    fn test_function_patterns() {
        assert_eq!(
            Dialect::Postgres.function_pattern("concat").as_deref(),
            Some("(?1||?2...)")
        );
        assert_eq!(
            Dialect::TSql.function_pattern("concat").as_deref(),
            Some("(?1+?2...)")
        );
        assert_eq!(
            Dialect::MySql.function_pattern("concat").as_deref(),
            Some("CONCAT(?1,?2...)")
        );
        assert_eq!(
            Dialect::Sqlite.function_pattern("substring").as_deref(),
            Some("SUBSTR(?1,?2,?3)")
        );
        assert_eq!(Dialect::Postgres.function_pattern("custom_fn"), None);
    }

    #[test]
    fn test_remap_function_case_insensitive() {
        assert_eq!(Dialect::TSql.remap_function("length"), Some("LEN"));
        assert_eq!(Dialect::TSql.remap_function("LENGTH"), Some("LEN"));
        assert_eq!(Dialect::TSql.remap_function("Length"), Some("LEN"));
        assert_eq!(Dialect::Postgres.remap_function("CUSTOM_FUNC"), None);
    }

    #[test]
    fn test_convert_exception() {
        let unique = SqlException::new("duplicate key").with_sql_state("23505");
        assert_eq!(
            Dialect::Postgres.convert_exception(&unique),
            SqlErrorKind::ConstraintViolation
        );

        let busy = SqlException::new("database is locked").with_vendor_code(5);
        assert_eq!(
            Dialect::Sqlite.convert_exception(&busy),
            SqlErrorKind::LockTimeout
        );
        assert_eq!(
            Dialect::Postgres.convert_exception(&busy),
            SqlErrorKind::Generic
        );
    }

    #[test]
    fn test_dialect_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Holder {
            dialect: Dialect,
        }
        let holder: Holder = toml::from_str("dialect = \"mysql\"").unwrap();
        assert_eq!(holder.dialect, Dialect::MySql);
    }
}
