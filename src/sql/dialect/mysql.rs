//! MySQL SQL dialect.
//!
//! MySQL differences from ANSI:
//! - Backtick identifier quoting (`` `name` ``)
//! - Boolean is TINYINT(1), returns 1/0
//! - `||` is logical OR by default (use CONCAT())
//! - LIMIT is mandatory when OFFSET is given
//! - No NULLS FIRST/LAST
//! - FOR UPDATE OF in 8.0+

use super::helpers;
use super::SqlDialect;
use crate::error::{SqlErrorKind, SqlException};

/// MySQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct MySql;

impl SqlDialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn unbounded_limit(&self) -> Option<&'static str> {
        Some("18446744073709551615")
    }

    fn supports_nulls_ordering(&self) -> bool {
        false
    }

    fn supports_for_update_of(&self) -> bool {
        true
    }

    fn function_pattern(&self, name: &str) -> Option<String> {
        match name.to_lowercase().as_str() {
            // || is logical OR unless PIPES_AS_CONCAT is set
            "concat" => Some("CONCAT(?1,?2...)".into()),
            "substring" => Some("SUBSTRING(?1,?2,?3)".into()),
            "locate" => Some("LOCATE(?1,?2)".into()),
            _ => helpers::standard_function_pattern(name, self.concat_operator()),
        }
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_mysql(name)
    }

    fn convert_exception(&self, exception: &SqlException) -> SqlErrorKind {
        // ER_LOCK_WAIT_TIMEOUT and ER_LOCK_DEADLOCK report a generic state
        match exception.vendor_code {
            Some(1205) | Some(1213) => SqlErrorKind::LockTimeout,
            _ => exception
                .sql_state
                .as_deref()
                .map(helpers::classify_sql_state)
                .unwrap_or(SqlErrorKind::Generic),
        }
    }
}
