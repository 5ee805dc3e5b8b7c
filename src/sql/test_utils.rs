//! Parses rendered SQL back with sqlparser so translator tests catch syntax
//! the target database would reject.

use sqlparser::dialect::{
    DuckDbDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
};
use sqlparser::parser::Parser;

use super::dialect::Dialect;

fn parser_dialect(dialect: Dialect) -> Box<dyn sqlparser::dialect::Dialect> {
    match dialect {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::TSql => Box::new(MsSqlDialect {}),
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
    }
}

/// Parse `sql` with the grammar matching `dialect`; the error names both.
pub fn validate_sql(sql: &str, dialect: Dialect) -> Result<(), String> {
    Parser::parse_sql(parser_dialect(dialect).as_ref(), sql)
        .map(drop)
        .map_err(|e| format!("{} grammar rejected the statement: {}\n{}", dialect, e, sql))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_rendered_pagination() {
        validate_sql(r#"SELECT "o1_0"."id" FROM "orders" AS "o1_0" LIMIT ?"#, Dialect::Postgres).unwrap();
        validate_sql("SELECT `o1_0`.`id` FROM `orders` AS `o1_0` LIMIT ?", Dialect::MySql).unwrap();
        validate_sql(r#"SELECT "o1_0"."id" FROM "orders" AS "o1_0" LIMIT -1 OFFSET ?"#, Dialect::Sqlite).unwrap();
    }

    #[test]
    fn test_rejects_malformed_sql() {
        let err = validate_sql("SELEC * FORM orders", Dialect::DuckDb).unwrap_err();
        assert!(err.contains("duckdb"));
    }
}
