//! Shared helper functions for SQL dialect implementations.
//!
//! This module provides reusable building blocks that dialects can compose
//! to implement the `SqlDialect` trait with minimal duplication.

use crate::error::SqlErrorKind;

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, DuckDB, SQLite
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks.
/// Used by: MySQL
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Quote identifier with square brackets.
/// Used by: T-SQL (SQL Server, Azure SQL)
pub fn quote_bracket(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
/// Used by: All dialects
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote string with N prefix for Unicode (T-SQL).
/// Used by: T-SQL for non-ASCII strings
pub fn quote_string_unicode(s: &str) -> String {
    format!("N'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
/// Used by: Postgres, DuckDB
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Format boolean as numeric 1/0.
/// Used by: T-SQL, MySQL, SQLite
pub fn format_bool_numeric(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

// =============================================================================
// Function Remapping
// =============================================================================

/// Remap functions for Postgres dialect.
pub fn remap_function_postgres(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "STRFTIME" => Some("TO_CHAR"),
        "DATE_FORMAT" => Some("TO_CHAR"),
        "NVL" => Some("COALESCE"),
        "IFNULL" => Some("COALESCE"),
        "ISNULL" => Some("COALESCE"),
        _ => None,
    }
}

/// Remap functions for DuckDB dialect.
pub fn remap_function_duckdb(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "TO_CHAR" => Some("STRFTIME"),
        "DATE_FORMAT" => Some("STRFTIME"),
        "NVL" => Some("COALESCE"),
        "IFNULL" => Some("COALESCE"),
        "ISNULL" => Some("COALESCE"),
        _ => None,
    }
}

/// Remap functions for MySQL dialect.
pub fn remap_function_mysql(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "STRFTIME" => Some("DATE_FORMAT"),
        "TO_CHAR" => Some("DATE_FORMAT"),
        "NVL" => Some("IFNULL"),
        "ISNULL" => Some("IFNULL"),
        "SUBSTR" => Some("SUBSTRING"),
        _ => None,
    }
}

/// Remap functions for T-SQL dialect.
pub fn remap_function_tsql(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "LENGTH" => Some("LEN"),
        "SUBSTR" => Some("SUBSTRING"),
        "NOW" => Some("GETDATE"),
        "CURRENT_TIMESTAMP" => Some("GETDATE"),
        "STRFTIME" => Some("FORMAT"),
        "TO_CHAR" => Some("FORMAT"),
        "NVL" => Some("ISNULL"),
        "IFNULL" => Some("ISNULL"),
        _ => None,
    }
}

/// Remap functions for SQLite dialect.
pub fn remap_function_sqlite(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "SUBSTRING" => Some("SUBSTR"),
        "NVL" => Some("IFNULL"),
        "ISNULL" => Some("IFNULL"),
        "TO_CHAR" => Some("STRFTIME"),
        "DATE_FORMAT" => Some("STRFTIME"),
        _ => None,
    }
}

// =============================================================================
// Function Patterns
// =============================================================================

/// Function patterns shared by every dialect that has no override.
///
/// Placeholders are 1-based; a trailing `...` marks the vararg slot, whose
/// preceding literal is repeated before each argument.
pub fn standard_function_pattern(name: &str, concat_operator: &str) -> Option<String> {
    let pattern = match name.to_lowercase().as_str() {
        "concat" => return Some(format!("(?1{}?2...)", concat_operator)),
        "coalesce" => "COALESCE(?1,?2...)",
        "lower" => "LOWER(?1)",
        "upper" => "UPPER(?1)",
        "length" => "LENGTH(?1)",
        "trim" => "TRIM(?1)",
        "abs" => "ABS(?1)",
        "mod" => "MOD(?1,?2)",
        "substring" => "SUBSTRING(?1 FROM ?2 FOR ?3)",
        "locate" => "POSITION(?1 IN ?2)",
        "extract" => "EXTRACT(?1 FROM ?2)",
        "current_date" => "CURRENT_DATE",
        "current_timestamp" => "CURRENT_TIMESTAMP",
        "count" => "COUNT(?1)",
        "sum" => "SUM(?1)",
        "min" => "MIN(?1)",
        "max" => "MAX(?1)",
        "avg" => "AVG(?1)",
        _ => return None,
    };
    Some(pattern.to_string())
}

// =============================================================================
// Exception Conversion
// =============================================================================

/// Classify a five-character SQLSTATE by its class.
pub fn classify_sql_state(state: &str) -> SqlErrorKind {
    if state == "55P03" {
        // lock_not_available
        return SqlErrorKind::LockTimeout;
    }
    match state.get(..2) {
        Some("23") => SqlErrorKind::ConstraintViolation,
        Some("22") => SqlErrorKind::DataException,
        Some("42") => SqlErrorKind::SyntaxError,
        Some("40") => SqlErrorKind::LockTimeout,
        Some("08") => SqlErrorKind::ConnectionFailure,
        _ => SqlErrorKind::Generic,
    }
}

/// Classify a SQLite result code. Extended codes carry the primary code in
/// their low byte.
pub fn classify_sqlite_code(code: i32) -> SqlErrorKind {
    match code & 0xff {
        19 => SqlErrorKind::ConstraintViolation,
        5 | 6 => SqlErrorKind::LockTimeout,
        1 => SqlErrorKind::SyntaxError,
        20 | 25 => SqlErrorKind::DataException,
        14 | 26 => SqlErrorKind::ConnectionFailure,
        _ => SqlErrorKind::Generic,
    }
}
