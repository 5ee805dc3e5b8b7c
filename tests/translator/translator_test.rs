use insta::assert_snapshot;
use sqlparser::dialect::{DuckDbDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

use strata::config::{ResultSettings, TranslationSettings};
use strata::error::TranslationError;
use strata::mapping::{CollectionAttribute, EntityMapping, MappingModel, ToOneAttribute};
use strata::path::NavigablePath;
use strata::query::{EntityDelete, EntityQuery, EntityUpdate, Operand, Restriction};
use strata::results::InstantiatorRegistry;
use strata::sql::ast::{
    Expression, FromClause, LockMode, NullPrecedence, Predicate, QueryGroup, QueryPart, QuerySpec,
    SelectStatement, SetOperator, SortOrder, TableGroup, TableReference,
};
use strata::sql::{
    Dialect, JdbcMutation, JdbcOperation, JdbcParameterBindings, JdbcSelect, SqlAstTranslator,
};
use strata::value::{JdbcType, SqlValue};

fn model() -> MappingModel {
    MappingModel::new()
        .with_entity(
            EntityMapping::new("Customer", "customers")
                .basic("name", "name", JdbcType::Varchar)
                .one_to_many(
                    CollectionAttribute::new("orders", "Order", "customer")
                        .order_by("total", SortOrder::Descending),
                ),
        )
        .with_entity(
            EntityMapping::new("Order", "orders")
                .basic("status", "status", JdbcType::Varchar)
                .basic("total", "total", JdbcType::Double)
                .to_one(ToOneAttribute::new("customer", "Customer", "customer_id").lazy()),
        )
        .with_entity(
            EntityMapping::new("Invoice", "invoices")
                .basic("number", "number", JdbcType::Varchar)
                .secondary_table("invoice_details", "invoice_id")
                .basic_in("invoice_details", "memo", "memo", JdbcType::Varchar),
        )
}

fn translate(query: &EntityQuery, dialect: Dialect) -> JdbcSelect {
    let built = query
        .build(&model(), &ResultSettings::default(), &InstantiatorRegistry::new())
        .unwrap();
    SqlAstTranslator::new(dialect, &TranslationSettings::default())
        .translate_select(&built.statement)
        .unwrap()
}

fn translate_mutations(statements: &[strata::sql::ast::Statement]) -> Vec<JdbcMutation> {
    statements
        .iter()
        .map(|s| {
            match SqlAstTranslator::new(Dialect::Postgres, &TranslationSettings::default())
                .translate(s)
                .unwrap()
            {
                JdbcOperation::Mutation(m) => m,
                JdbcOperation::Select(s) => panic!("expected a mutation, got {}", s.sql),
            }
        })
        .collect()
}

fn validate(sql: &str, dialect: Dialect) {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::TSql => Box::new(MsSqlDialect {}),
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
    };
    if let Err(e) = Parser::parse_sql(&*parser_dialect, sql) {
        panic!("invalid SQL for {:?}: {}\nSQL: {}", dialect, e, sql);
    }
}

fn orders_group() -> TableGroup {
    TableGroup::new(NavigablePath::new("Order"), TableReference::named("orders", "o1_0"))
}

// =============================================================================
// Hand-built AST
// =============================================================================

#[test]
fn test_select_clause_renders_in_position_order() {
    let mut spec = QuerySpec::new(FromClause::new(vec![orders_group()]));
    let first = spec.select.add(Expression::column("o1_0", "id", JdbcType::Integer));
    let second = spec.select.add(Expression::column("o1_0", "status", JdbcType::Varchar));
    spec.apply_predicate(Predicate::eq(
        Expression::column("o1_0", "id", JdbcType::Integer),
        Expression::parameter(1, JdbcType::Integer),
    ));
    let statement = SelectStatement::new(QueryPart::Spec(spec), Vec::new());

    let select = SqlAstTranslator::new(Dialect::Postgres, &TranslationSettings::default())
        .translate_select(&statement)
        .unwrap();

    assert_eq!((first, second), (0, 1));
    assert_snapshot!(select.sql, @r#"SELECT "o1_0"."id","o1_0"."status" FROM "orders" AS "o1_0" WHERE "o1_0"."id"=?"#);
    assert_eq!(select.parameter_binders.len(), 1);
    assert_eq!(
        select.bind(&JdbcParameterBindings::new().with(1, 42)).unwrap(),
        vec![SqlValue::Int(42)]
    );
    validate(&select.sql, Dialect::Postgres);
}

#[test]
fn test_empty_select_list_renders_constant() {
    let spec = QuerySpec::new(FromClause::new(vec![orders_group()]));
    let statement = SelectStatement::new(QueryPart::Spec(spec), Vec::new());
    let select = SqlAstTranslator::new(Dialect::Postgres, &TranslationSettings::default())
        .translate_select(&statement)
        .unwrap();
    assert_eq!(select.sql, r#"SELECT 1 FROM "orders" AS "o1_0""#);
}

#[test]
fn test_unknown_qualifier_is_rejected() {
    let mut spec = QuerySpec::new(FromClause::new(vec![orders_group()]));
    spec.select.add(Expression::column("x9_0", "id", JdbcType::Integer));
    let statement = SelectStatement::new(QueryPart::Spec(spec), Vec::new());

    let err = SqlAstTranslator::new(Dialect::Postgres, &TranslationSettings::default())
        .translate_select(&statement)
        .unwrap_err();
    assert_eq!(
        err,
        TranslationError::UnresolvedColumnReference {
            qualifier: "x9_0".into(),
            column: "id".into(),
        }
    );
}

#[test]
fn test_unbound_parameter_fails_at_bind() {
    let mut spec = QuerySpec::new(FromClause::new(vec![orders_group()]));
    spec.select.add(Expression::column("o1_0", "id", JdbcType::Integer));
    spec.apply_predicate(Predicate::eq(
        Expression::column("o1_0", "id", JdbcType::Integer),
        Expression::parameter(7, JdbcType::Integer),
    ));
    let statement = SelectStatement::new(QueryPart::Spec(spec), Vec::new());
    let select = SqlAstTranslator::new(Dialect::Postgres, &TranslationSettings::default())
        .translate_select(&statement)
        .unwrap();

    let err = select.bind(&JdbcParameterBindings::new()).unwrap_err();
    assert!(err.to_string().contains("#7"));
}

#[test]
fn test_empty_in_list_is_constant_false() {
    let mut spec = QuerySpec::new(FromClause::new(vec![orders_group()]));
    spec.select.add(Expression::column("o1_0", "id", JdbcType::Integer));
    spec.apply_predicate(Predicate::in_list(
        Expression::column("o1_0", "id", JdbcType::Integer),
        Vec::new(),
    ));
    let statement = SelectStatement::new(QueryPart::Spec(spec), Vec::new());
    let select = SqlAstTranslator::new(Dialect::Postgres, &TranslationSettings::default())
        .translate_select(&statement)
        .unwrap();
    assert_eq!(select.sql, r#"SELECT "o1_0"."id" FROM "orders" AS "o1_0" WHERE 1=0"#);
    assert!(select.parameter_binders.is_empty());
}

#[test]
fn test_inline_literals_and_bound_literals() {
    let mut spec = QuerySpec::new(FromClause::new(vec![orders_group()]));
    spec.select.add(Expression::column("o1_0", "id", JdbcType::Integer));
    spec.apply_predicate(Predicate::eq(
        Expression::column("o1_0", "status", JdbcType::Varchar),
        Expression::literal("it's"),
    ));
    spec.apply_predicate(Predicate::eq(
        Expression::column("o1_0", "total", JdbcType::Double),
        Expression::bound(2.5),
    ));
    let statement = SelectStatement::new(QueryPart::Spec(spec), Vec::new());
    let select = SqlAstTranslator::new(Dialect::Postgres, &TranslationSettings::default())
        .translate_select(&statement)
        .unwrap();

    assert_eq!(
        select.sql,
        r#"SELECT "o1_0"."id" FROM "orders" AS "o1_0" WHERE "o1_0"."status"='it''s' AND "o1_0"."total"=?"#
    );
    assert_eq!(
        select.bind(&JdbcParameterBindings::new()).unwrap(),
        vec![SqlValue::Float(2.5)]
    );
}

#[test]
fn test_union_all_of_two_specs() {
    let part = |status: &str| {
        let mut spec = QuerySpec::new(FromClause::new(vec![orders_group()]));
        spec.select.add(Expression::column("o1_0", "id", JdbcType::Integer));
        spec.apply_predicate(Predicate::eq(
            Expression::column("o1_0", "status", JdbcType::Varchar),
            Expression::bound(status),
        ));
        QueryPart::Spec(spec)
    };
    let group = QueryGroup::new(SetOperator::UnionAll, part("OPEN"), vec![part("HELD")]);
    let statement = SelectStatement::new(QueryPart::Group(group), Vec::new());
    let select = SqlAstTranslator::new(Dialect::Postgres, &TranslationSettings::default())
        .translate_select(&statement)
        .unwrap();

    assert_eq!(
        select.sql,
        r#"SELECT "o1_0"."id" FROM "orders" AS "o1_0" WHERE "o1_0"."status"=? UNION ALL SELECT "o1_0"."id" FROM "orders" AS "o1_0" WHERE "o1_0"."status"=?"#
    );
    assert_eq!(
        select.bind(&JdbcParameterBindings::new()).unwrap(),
        vec![SqlValue::from("OPEN"), SqlValue::from("HELD")]
    );
    validate(&select.sql, Dialect::Postgres);
}

// =============================================================================
// Entity Queries
// =============================================================================

#[test]
fn test_root_entity_selects_id_then_attributes() {
    let select = translate(&EntityQuery::from("Order", "o"), Dialect::Postgres);
    assert_snapshot!(select.sql, @r#"SELECT "o1_0"."id","o1_0"."status","o1_0"."total","o1_0"."customer_id" FROM "orders" AS "o1_0""#);
    assert_eq!(
        select.affected_tables.iter().cloned().collect::<Vec<_>>(),
        vec!["orders".to_string()]
    );
    assert_eq!(select.selections.len(), 4);
}

#[test]
fn test_join_fetch_to_one() {
    let select = translate(&EntityQuery::from("Order", "o").join_fetch("customer"), Dialect::Postgres);
    assert_snapshot!(select.sql, @r#"SELECT "o1_0"."id","o1_0"."status","o1_0"."total","c1_0"."id","c1_0"."name" FROM "orders" AS "o1_0" LEFT JOIN "customers" AS "c1_0" ON "o1_0"."customer_id"="c1_0"."id""#);
    assert!(select.affected_tables.contains("customers"));
    validate(&select.sql, Dialect::Postgres);
}

#[test]
fn test_join_fetch_collection_orders_by_collection_order() {
    let select = translate(&EntityQuery::from("Customer", "c").join_fetch("orders"), Dialect::Postgres);
    assert_snapshot!(select.sql, @r#"SELECT "c1_0"."id","c1_0"."name","o1_0"."id","o1_0"."status","o1_0"."total","o1_0"."customer_id" FROM "customers" AS "c1_0" LEFT JOIN "orders" AS "o1_0" ON "o1_0"."customer_id"="c1_0"."id" ORDER BY "o1_0"."total" DESC"#);
    validate(&select.sql, Dialect::Postgres);
}

#[test]
fn test_restriction_through_association_adds_inner_join() {
    let query = EntityQuery::from("Order", "o").filter(Restriction::eq("customer.name", "Ada"));
    let select = translate(&query, Dialect::Postgres);
    assert_eq!(
        select.sql,
        r#"SELECT "o1_0"."id","o1_0"."status","o1_0"."total","o1_0"."customer_id" FROM "orders" AS "o1_0" JOIN "customers" AS "c1_0" ON "o1_0"."customer_id"="c1_0"."id" WHERE "c1_0"."name"=?"#
    );
    assert_eq!(
        select.bind(&JdbcParameterBindings::new()).unwrap(),
        vec![SqlValue::from("Ada")]
    );
}

#[test]
fn test_restriction_on_association_id_uses_foreign_key() {
    let query = EntityQuery::from("Order", "o").filter(Restriction::eq("customer.id", 3));
    let select = translate(&query, Dialect::Postgres);
    assert!(select.sql.ends_with(r#"FROM "orders" AS "o1_0" WHERE "o1_0"."customer_id"=?"#));
    assert!(!select.affected_tables.contains("customers"));
}

#[test]
fn test_restrictions_are_conjoined() {
    let query = EntityQuery::from("Order", "o")
        .filter(Restriction::eq("status", "OPEN"))
        .filter(Restriction::gt("total", 10.0));
    let select = translate(&query, Dialect::Postgres);
    assert!(select
        .sql
        .ends_with(r#"WHERE "o1_0"."status"=? AND "o1_0"."total">?"#));
}

#[test]
fn test_nested_junction_of_other_nature_is_parenthesized() {
    let query = EntityQuery::from("Order", "o").filter(Restriction::or(vec![
        Restriction::eq("status", "OPEN"),
        Restriction::and(vec![
            Restriction::gt("total", 10.0),
            Restriction::is_null("customer"),
        ]),
    ]));
    let select = translate(&query, Dialect::Postgres);
    assert!(select.sql.ends_with(
        r#"WHERE "o1_0"."status"=? OR ("o1_0"."total">? AND "o1_0"."customer_id" IS NULL)"#
    ));
    validate(&select.sql, Dialect::Postgres);
}

#[test]
fn test_case_insensitive_like_lowers_both_sides() {
    let query = EntityQuery::from("Order", "o").filter(Restriction::ilike("status", "op%"));
    let select = translate(&query, Dialect::Postgres);
    assert!(select
        .sql
        .ends_with(r#"WHERE LOWER("o1_0"."status") LIKE LOWER(?)"#));
}

#[test]
fn test_negation_between_and_in() {
    let query = EntityQuery::from("Order", "o")
        .filter(Restriction::not(Restriction::between("total", 1.0, 5.0)))
        .filter(Restriction::in_list("status", ["A", "B"]))
        .filter(Restriction::ne("status", Operand::param(1)))
        .bind(1, "C");
    let built = query
        .build(&model(), &ResultSettings::default(), &InstantiatorRegistry::new())
        .unwrap();
    let select = SqlAstTranslator::new(Dialect::Postgres, &TranslationSettings::default())
        .translate_select(&built.statement)
        .unwrap();

    assert!(select.sql.ends_with(
        r#"WHERE NOT ("o1_0"."total" BETWEEN ? AND ?) AND "o1_0"."status" IN (?,?) AND "o1_0"."status"<>?"#
    ));
    assert_eq!(
        select.bind(&built.bindings).unwrap(),
        vec![
            SqlValue::Float(1.0),
            SqlValue::Float(5.0),
            SqlValue::from("A"),
            SqlValue::from("B"),
            SqlValue::from("C"),
        ]
    );
    validate(&select.sql, Dialect::Postgres);
}

#[test]
fn test_unknown_attribute_is_a_translation_error() {
    let err = EntityQuery::from("Order", "o")
        .filter(Restriction::eq("colour", "red"))
        .build(&model(), &ResultSettings::default(), &InstantiatorRegistry::new())
        .unwrap_err();
    assert_eq!(
        err,
        TranslationError::UnknownAttribute {
            entity: "Order".into(),
            attribute: "colour".into(),
        }
    );
}

// =============================================================================
// Dialects
// =============================================================================

fn paged() -> EntityQuery {
    EntityQuery::from("Order", "o")
        .filter(Restriction::eq("status", "OPEN"))
        .order_by("total", SortOrder::Descending)
        .offset(20)
        .limit(10)
}

#[test]
fn test_limit_offset_binds_fetch_before_offset() {
    let select = translate(&paged(), Dialect::Postgres);
    assert!(select
        .sql
        .ends_with(r#"WHERE "o1_0"."status"=? ORDER BY "o1_0"."total" DESC LIMIT ? OFFSET ?"#));
    assert_eq!(
        select.bind(&JdbcParameterBindings::new()).unwrap(),
        vec![SqlValue::from("OPEN"), SqlValue::Int(10), SqlValue::Int(20)]
    );
    validate(&select.sql, Dialect::Postgres);
}

#[test]
fn test_offset_fetch_binds_offset_before_fetch() {
    let select = translate(&paged(), Dialect::TSql);
    assert!(select.sql.ends_with(
        "WHERE [o1_0].[status]=? ORDER BY [o1_0].[total] DESC OFFSET ? ROWS FETCH NEXT ? ROWS ONLY"
    ));
    assert_eq!(
        select.bind(&JdbcParameterBindings::new()).unwrap(),
        vec![SqlValue::from("OPEN"), SqlValue::Int(20), SqlValue::Int(10)]
    );
    validate(&select.sql, Dialect::TSql);
}

#[test]
fn test_offset_fetch_without_order_by_adds_placeholder_order() {
    let select = translate(&EntityQuery::from("Order", "o").limit(5), Dialect::TSql);
    assert!(select
        .sql
        .ends_with("ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT ? ROWS ONLY"));
}

#[test]
fn test_sqlite_offset_without_limit() {
    let select = translate(&EntityQuery::from("Order", "o").offset(5), Dialect::Sqlite);
    assert!(select.sql.ends_with(r#"FROM "orders" AS "o1_0" LIMIT -1 OFFSET ?"#));
    validate(&select.sql, Dialect::Sqlite);
}

#[test]
fn test_mysql_quotes_and_emulates_nulls_ordering() {
    let query = EntityQuery::from("Order", "o").order_by_nulls("total", SortOrder::Ascending, NullPrecedence::First);
    let select = translate(&query, Dialect::MySql);
    assert!(select.sql.starts_with("SELECT `o1_0`.`id`"));
    assert!(select
        .sql
        .ends_with("ORDER BY CASE WHEN `o1_0`.`total` IS NULL THEN 0 ELSE 1 END,`o1_0`.`total`"));
    validate(&select.sql, Dialect::MySql);
}

#[test]
fn test_postgres_renders_nulls_ordering() {
    let query = EntityQuery::from("Order", "o").order_by_nulls("total", SortOrder::Descending, NullPrecedence::Last);
    let select = translate(&query, Dialect::Postgres);
    assert!(select.sql.ends_with(r#"ORDER BY "o1_0"."total" DESC NULLS LAST"#));
    validate(&select.sql, Dialect::Postgres);
}

#[test]
fn test_every_dialect_renders_valid_paged_query() {
    for dialect in [
        Dialect::Postgres,
        Dialect::MySql,
        Dialect::TSql,
        Dialect::DuckDb,
        Dialect::Sqlite,
    ] {
        let select = translate(&paged().join_fetch("customer"), dialect);
        validate(&select.sql, dialect);
        assert_eq!(
            select.sql.matches('?').count(),
            select.parameter_binders.len(),
            "{:?}",
            dialect
        );
    }
}

// =============================================================================
// Locking
// =============================================================================

#[test]
fn test_for_update_on_single_table() {
    let select = translate(
        &EntityQuery::from("Order", "o").lock(LockMode::PessimisticWrite),
        Dialect::Postgres,
    );
    assert!(select.sql.ends_with(r#"FROM "orders" AS "o1_0" FOR UPDATE"#));
}

#[test]
fn test_for_update_with_outer_join_names_the_root() {
    let select = translate(
        &EntityQuery::from("Order", "o")
            .join_fetch("customer")
            .lock(LockMode::PessimisticRead),
        Dialect::Postgres,
    );
    assert!(select.sql.ends_with(r#"FOR SHARE OF "o1_0""#));
}

#[test]
fn test_tsql_lock_is_a_table_hint() {
    let select = translate(
        &EntityQuery::from("Order", "o").lock(LockMode::PessimisticWrite),
        Dialect::TSql,
    );
    assert!(select.sql.ends_with("FROM [orders] AS [o1_0] WITH (UPDLOCK, ROWLOCK)"));
}

#[test]
fn test_sqlite_ignores_locks() {
    let select = translate(
        &EntityQuery::from("Order", "o").lock(LockMode::PessimisticWrite),
        Dialect::Sqlite,
    );
    assert!(select.sql.ends_with(r#"FROM "orders" AS "o1_0""#));
}

// =============================================================================
// Mutations
// =============================================================================

#[test]
fn test_update_qualifies_columns_by_table() {
    let mutation = EntityUpdate::new("Order")
        .set("status", "CLOSED")
        .filter(Restriction::lt("total", Operand::param(1)))
        .bind(1, 0.5)
        .build(&model())
        .unwrap();
    let jdbc = translate_mutations(&mutation.statements);

    assert_eq!(jdbc.len(), 1);
    assert_snapshot!(jdbc[0].sql, @r#"UPDATE "orders" SET "status"=? WHERE "orders"."total"<?"#);
    assert_eq!(
        jdbc[0].bind(&mutation.bindings).unwrap(),
        vec![SqlValue::from("CLOSED"), SqlValue::Float(0.5)]
    );
    validate(&jdbc[0].sql, Dialect::Postgres);
}

#[test]
fn test_update_through_association_is_rejected() {
    let err = EntityUpdate::new("Order")
        .set("status", "CLOSED")
        .filter(Restriction::eq("customer.name", "Ada"))
        .build(&model())
        .unwrap_err();
    assert!(matches!(err, TranslationError::InvalidMutation { .. }));
}

#[test]
fn test_simple_delete() {
    let mutation = EntityDelete::new("Order")
        .filter(Restriction::eq("status", "VOID"))
        .build(&model())
        .unwrap();
    let jdbc = translate_mutations(&mutation.statements);
    assert_eq!(jdbc.len(), 1);
    assert_eq!(jdbc[0].sql, r#"DELETE FROM "orders" WHERE "orders"."status"=?"#);
    validate(&jdbc[0].sql, Dialect::Postgres);
}

#[test]
fn test_delete_with_secondary_table_is_staged_through_cte() {
    let mutation = EntityDelete::new("Invoice")
        .filter(Restriction::eq("number", "A-1"))
        .build(&model())
        .unwrap();
    let jdbc = translate_mutations(&mutation.statements);

    let cte = r#"WITH "ids" ("id") AS (SELECT "i1_0"."id" FROM "invoices" AS "i1_0" WHERE "i1_0"."number"=?) "#;
    assert_eq!(jdbc.len(), 2);
    assert_eq!(
        jdbc[0].sql,
        format!(
            r#"{}DELETE FROM "invoice_details" WHERE "invoice_details"."invoice_id" IN (SELECT "ids"."id" FROM "ids" AS "ids")"#,
            cte
        )
    );
    assert_eq!(
        jdbc[1].sql,
        format!(
            r#"{}DELETE FROM "invoices" WHERE "invoices"."id" IN (SELECT "ids"."id" FROM "ids" AS "ids")"#,
            cte
        )
    );

    // the CTE name is not a table
    assert_eq!(
        jdbc[0].affected_tables.iter().cloned().collect::<Vec<_>>(),
        vec!["invoice_details".to_string(), "invoices".to_string()]
    );
    assert_eq!(
        jdbc[1].bind(&mutation.bindings).unwrap(),
        vec![SqlValue::from("A-1")]
    );
}

#[test]
fn test_staged_delete_through_association() {
    let mutation = EntityDelete::new("Order")
        .filter(Restriction::eq("customer.name", "Ada"))
        .build(&model())
        .unwrap();
    let jdbc = translate_mutations(&mutation.statements);
    assert_eq!(jdbc.len(), 1);
    assert!(jdbc[0].sql.starts_with(
        r#"WITH "ids" ("id") AS (SELECT "o1_0"."id" FROM "orders" AS "o1_0" JOIN "customers" AS "c1_0" ON "o1_0"."customer_id"="c1_0"."id" WHERE "c1_0"."name"=?) DELETE FROM "orders""#
    ));
    assert!(jdbc[0].affected_tables.contains("customers"));
}
