use std::rc::Rc;

use strata::config::Settings;
use strata::engine::{MemoryConnection, Session, SqliteConnection};
use strata::mapping::{EntityMapping, MappingModel, ToOneAttribute};
use strata::query::EntityQuery;
use strata::sql::ast::SortOrder;
use strata::sql::Dialect;
use strata::value::{DomainValue, JdbcType, SqlValue};

const CUSTOMER_LOAD: &str = r#"SELECT "c1_0"."id","c1_0"."name" FROM "customers" AS "c1_0" WHERE "c1_0"."id" IN "#;

fn model(batch_size: usize) -> MappingModel {
    MappingModel::new()
        .with_entity(
            EntityMapping::new("Customer", "customers")
                .basic("name", "name", JdbcType::Varchar)
                .batch_size(batch_size),
        )
        .with_entity(
            EntityMapping::new("Order", "orders")
                .basic("status", "status", JdbcType::Varchar)
                .to_one(ToOneAttribute::new("customer", "Customer", "customer_id")),
        )
}

fn order(id: i64, customer: i64) -> Vec<SqlValue> {
    vec![SqlValue::Int(id), SqlValue::Text("OPEN".into()), SqlValue::Int(customer)]
}

fn customer(id: i64, name: &str) -> Vec<SqlValue> {
    vec![SqlValue::Int(id), SqlValue::Text(name.into())]
}

fn session(connection: &Rc<MemoryConnection>, batch_size: usize) -> Session {
    Session::new(Box::new(Rc::clone(connection)), model(batch_size), Settings::default()).unwrap()
}

#[test]
fn test_batch_load_chunks_queued_keys() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![order(10, 1), order(11, 2), order(12, 3)]);
    connection.push_rows(vec![customer(1, "Ada"), customer(2, "Bob")]);
    connection.push_rows(vec![customer(3, "Cy")]);
    let mut session = session(&connection, 2);

    let orders = session.list(&EntityQuery::from("Order", "o")).unwrap();
    assert_eq!(orders.len(), 3);

    let executed = connection.executed();
    assert_eq!(executed.len(), 3);
    assert_eq!(executed[1].sql, format!("{}(?,?)", CUSTOMER_LOAD));
    assert_eq!(executed[1].params, vec![SqlValue::Int(1), SqlValue::Int(2)]);
    assert_eq!(executed[2].sql, format!("{}(?)", CUSTOMER_LOAD));
    assert_eq!(executed[2].params, vec![SqlValue::Int(3)]);

    for value in &orders {
        let customer = session
            .entity(value.as_entity().unwrap())
            .get("customer")
            .and_then(DomainValue::as_entity)
            .unwrap();
        assert!(session.entity(customer).is_initialized());
    }
    assert!(!session.persistence_context().has_pending_batch_loads());
}

#[test]
fn test_batch_skips_already_loaded_instances() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![customer(1, "Ada")]);
    connection.push_rows(vec![order(10, 1), order(11, 2), order(12, 3)]);
    connection.push_rows(vec![customer(2, "Bob"), customer(3, "Cy")]);
    let mut session = session(&connection, 5);

    session.find("Customer", 1).unwrap().unwrap();
    session.list(&EntityQuery::from("Order", "o")).unwrap();

    let executed = connection.executed();
    assert_eq!(executed.len(), 3);
    assert_eq!(executed[2].params, vec![SqlValue::Int(2), SqlValue::Int(3)]);
}

#[test]
fn test_repeated_key_is_queued_once() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![order(10, 1), order(11, 1), order(12, 1)]);
    connection.push_rows(vec![customer(1, "Ada")]);
    let mut session = session(&connection, 4);

    session.list(&EntityQuery::from("Order", "o")).unwrap();

    let executed = connection.executed();
    assert_eq!(executed.len(), 2);
    assert_eq!(executed[1].params, vec![SqlValue::Int(1)]);
}

#[test]
fn test_scroll_disables_batching() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![order(10, 1), order(11, 2)]);
    connection.push_rows(vec![customer(1, "Ada")]);
    connection.push_rows(vec![customer(2, "Bob")]);
    let mut session = session(&connection, 10);

    let mut results = session.scroll(&EntityQuery::from("Order", "o")).unwrap();
    while results.next().unwrap() {}
    results.close().unwrap();
    drop(results);

    let executed = connection.executed();
    assert_eq!(executed.len(), 3);
    assert_eq!(executed[1].sql, format!("{}(?)", CUSTOMER_LOAD));
    assert_eq!(executed[2].params, vec![SqlValue::Int(2)]);
}

#[test]
fn test_batch_size_one_loads_per_row() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![order(10, 1), order(11, 2)]);
    connection.push_rows(vec![customer(1, "Ada")]);
    connection.push_rows(vec![customer(2, "Bob")]);
    let mut session = session(&connection, 1);

    session.list(&EntityQuery::from("Order", "o")).unwrap();
    assert_eq!(connection.executed().len(), 3);
}

#[test]
fn test_batch_loads_against_sqlite() {
    let connection = SqliteConnection::open_in_memory().unwrap();
    connection
        .execute_batch(
            r#"
            CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
            CREATE TABLE orders (id INTEGER PRIMARY KEY, status TEXT NOT NULL, customer_id INTEGER);
            INSERT INTO customers VALUES (1, 'a'), (2, 'b'), (3, 'c'), (4, 'd'), (5, 'e');
            INSERT INTO orders VALUES (10, 'OPEN', 1), (11, 'OPEN', 2), (12, 'OPEN', 3), (13, 'OPEN', 4), (14, 'OPEN', 5);
            "#,
        )
        .unwrap();
    let connection = Rc::new(connection);
    let mut session = Session::new(Box::new(Rc::clone(&connection)), model(2), Settings::default())
        .unwrap()
        .with_dialect(Dialect::Sqlite);

    let orders = session
        .list(&EntityQuery::from("Order", "o").order_by("id", SortOrder::Ascending))
        .unwrap();

    assert_eq!(orders.len(), 5);
    // one root query, then five keys in chunks of two
    assert_eq!(connection.statement_count(), 4);
    assert_eq!(session.persistence_context().entity_count(), 10);
}
