//! SQLite dialect.
//!
//! SQLite differences from ANSI:
//! - ANSI identifier quoting (`"`)
//! - No boolean type, 1/0 integers
//! - LIMIT is mandatory when OFFSET is given (`LIMIT -1` is unbounded)
//! - No row-level locking; the whole database is locked by a writer
//! - Errors are reported as result codes, not SQLSTATEs

use super::helpers;
use super::SqlDialect;
use crate::error::{SqlErrorKind, SqlException};

/// SQLite dialect.
#[derive(Debug, Clone, Copy)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn format_date_literal(&self, date: &str) -> String {
        format!("'{}'", date)
    }

    fn unbounded_limit(&self) -> Option<&'static str> {
        Some("-1")
    }

    fn supports_locking(&self) -> bool {
        false
    }

    fn function_pattern(&self, name: &str) -> Option<String> {
        match name.to_lowercase().as_str() {
            "substring" => Some("SUBSTR(?1,?2,?3)".into()),
            "mod" => Some("(?1%?2)".into()),
            "locate" => Some("INSTR(?2,?1)".into()),
            _ => helpers::standard_function_pattern(name, self.concat_operator()),
        }
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_sqlite(name)
    }

    fn convert_exception(&self, exception: &SqlException) -> SqlErrorKind {
        match exception.vendor_code {
            Some(code) => helpers::classify_sqlite_code(code),
            None => exception
                .sql_state
                .as_deref()
                .map(helpers::classify_sql_state)
                .unwrap_or(SqlErrorKind::Generic),
        }
    }
}
