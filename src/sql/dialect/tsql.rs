//! T-SQL (SQL Server / Azure SQL) dialect.
//!
//! T-SQL has significant differences from ANSI:
//! - Square bracket identifier quoting (`[name]`)
//! - No native boolean in SELECT (1/0)
//! - OFFSET FETCH for pagination (requires ORDER BY)
//! - N'...' prefix for Unicode strings
//! - Locks expressed as table hints, not a trailing clause
//! - No row value constructor in comparisons
//! - String concatenation with `+`

use super::helpers;
use super::{PaginationStyle, SqlDialect};
use crate::sql::ast::LockMode;

/// T-SQL (SQL Server) dialect.
#[derive(Debug, Clone, Copy)]
pub struct TSql;

impl SqlDialect for TSql {
    fn name(&self) -> &'static str {
        "tsql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_bracket(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        // T-SQL uses N'...' for Unicode strings
        if !s.is_ascii() {
            helpers::quote_string_unicode(s)
        } else {
            helpers::quote_string_single(s)
        }
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_numeric(b)
    }

    fn format_date_literal(&self, date: &str) -> String {
        // T-SQL doesn't support DATE 'YYYY-MM-DD' syntax
        format!("'{}'", date)
    }

    fn pagination_style(&self) -> PaginationStyle {
        PaginationStyle::OffsetFetch
    }

    fn requires_order_by_for_offset(&self) -> bool {
        true
    }

    fn concat_operator(&self) -> &'static str {
        "+"
    }

    fn supports_nulls_ordering(&self) -> bool {
        // T-SQL 2022+ supports NULLS FIRST/LAST, but older versions don't
        false
    }

    fn supports_row_value_constructor(&self) -> bool {
        false
    }

    fn table_lock_hint(&self, mode: LockMode) -> Option<&'static str> {
        Some(match mode {
            LockMode::PessimisticRead => "WITH (HOLDLOCK, ROWLOCK)",
            LockMode::PessimisticWrite => "WITH (UPDLOCK, ROWLOCK)",
        })
    }

    fn function_pattern(&self, name: &str) -> Option<String> {
        match name.to_lowercase().as_str() {
            "length" => Some("LEN(?1)".into()),
            "mod" => Some("(?1%?2)".into()),
            "substring" => Some("SUBSTRING(?1,?2,?3)".into()),
            "locate" => Some("CHARINDEX(?1,?2)".into()),
            "current_date" => Some("CAST(GETDATE() AS DATE)".into()),
            "extract" => Some("DATEPART(?1,?2)".into()),
            _ => helpers::standard_function_pattern(name, self.concat_operator()),
        }
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_tsql(name)
    }
}
