use std::rc::Rc;

use strata::config::Settings;
use strata::engine::{MemoryConnection, Session, SqliteConnection};
use strata::mapping::{CollectionAttribute, EntityMapping, MappingModel, ToOneAttribute};
use strata::query::EntityQuery;
use strata::results::UniqueSemantic;
use strata::sql::Dialect;
use strata::sql::ast::SortOrder;
use strata::value::{DomainValue, JdbcType, SqlValue};

fn model() -> MappingModel {
    MappingModel::new()
        .with_entity(
            EntityMapping::new("Customer", "customers")
                .basic("name", "name", JdbcType::Varchar)
                .one_to_many(
                    CollectionAttribute::new("orders", "Order", "customer")
                        .order_by("id", SortOrder::Ascending),
                ),
        )
        .with_entity(
            EntityMapping::new("Order", "orders")
                .basic("status", "status", JdbcType::Varchar)
                .to_one(ToOneAttribute::new("customer", "Customer", "customer_id")),
        )
        .with_entity(
            EntityMapping::new("Employee", "employees")
                .basic("name", "name", JdbcType::Varchar)
                .to_one(ToOneAttribute::new("manager", "Employee", "manager_id")),
        )
}

fn session(connection: &Rc<MemoryConnection>) -> Session {
    Session::new(Box::new(Rc::clone(connection)), model(), Settings::default()).unwrap()
}

fn row(values: Vec<SqlValue>) -> Vec<SqlValue> {
    values
}

#[test]
fn test_collection_element_back_reference_resolves_to_owner() {
    let connection = Rc::new(MemoryConnection::new());
    // c.id, c.name, o.id, o.status, o.customer_id
    connection.push_rows(vec![
        row(vec![1.into(), "Ada".into(), 10.into(), "OPEN".into(), 1.into()]),
        row(vec![1.into(), "Ada".into(), 11.into(), "HELD".into(), 1.into()]),
        row(vec![2.into(), "Bob".into(), SqlValue::Null, SqlValue::Null, SqlValue::Null]),
    ]);
    let mut session = session(&connection);

    let customers = session
        .list(&EntityQuery::from("Customer", "c").join_fetch("orders"))
        .unwrap();
    assert_eq!(customers.len(), 2);
    assert_eq!(connection.executed().len(), 1);
    assert_eq!(
        connection.executed()[0].sql,
        r#"SELECT "c1_0"."id","c1_0"."name","o1_0"."id","o1_0"."status","o1_0"."customer_id" FROM "customers" AS "c1_0" LEFT JOIN "orders" AS "o1_0" ON "o1_0"."customer_id"="c1_0"."id" ORDER BY "o1_0"."id""#
    );

    let ada = customers[0].as_entity().unwrap();
    let orders = session
        .entity(ada)
        .get("orders")
        .and_then(DomainValue::as_collection)
        .unwrap();
    let collection = session.collection(orders);
    assert!(collection.initialized);
    assert_eq!(collection.elements.len(), 2);

    for element in &collection.elements {
        let order = session.entity(element.as_entity().unwrap());
        assert!(order.is_initialized());
        assert_eq!(order.get("customer"), Some(&DomainValue::Entity(ada)));
    }

    let bob = customers[1].as_entity().unwrap();
    let bob_orders = session
        .entity(bob)
        .get("orders")
        .and_then(DomainValue::as_collection)
        .unwrap();
    assert!(session.collection(bob_orders).initialized);
    assert!(session.collection(bob_orders).elements.is_empty());
}

#[test]
fn test_self_reference_to_same_row_is_the_same_instance() {
    let connection = Rc::new(MemoryConnection::new());
    // e.id, e.name, e.manager_id
    connection.push_rows(vec![row(vec![3.into(), "Cleo".into(), 3.into()])]);
    let mut session = session(&connection);

    let employees = session.list(&EntityQuery::from("Employee", "e")).unwrap();
    let cleo = employees[0].as_entity().unwrap();

    assert_eq!(session.entity(cleo).get("manager"), Some(&DomainValue::Entity(cleo)));
    assert_eq!(connection.executed().len(), 1);
}

#[test]
fn test_self_reference_to_other_row_is_a_reference() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![
        row(vec![1.into(), "Ann".into(), SqlValue::Null]),
        row(vec![2.into(), "Ben".into(), 1.into()]),
        row(vec![4.into(), "Dot".into(), 9.into()]),
    ]);
    let mut session = session(&connection);

    let employees = session.list(&EntityQuery::from("Employee", "e")).unwrap();
    let ann = employees[0].as_entity().unwrap();
    let ben = employees[1].as_entity().unwrap();
    let dot = employees[2].as_entity().unwrap();

    assert_eq!(session.entity(ann).get("manager"), Some(&DomainValue::Null));
    assert_eq!(session.entity(ben).get("manager"), Some(&DomainValue::Entity(ann)));

    // manager 9 is not part of the results and stays an unloaded reference
    let manager = session
        .entity(dot)
        .get("manager")
        .and_then(DomainValue::as_entity)
        .unwrap();
    assert!(!session.entity(manager).is_initialized());
    assert_eq!(session.entity(manager).key.id, SqlValue::Int(9));
    assert_eq!(connection.executed().len(), 1);
}

#[test]
fn test_assert_allows_owner_rows_repeated_by_collection_join() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![
        row(vec![1.into(), "Ada".into(), 10.into(), "OPEN".into(), 1.into()]),
        row(vec![1.into(), "Ada".into(), 11.into(), "HELD".into(), 1.into()]),
        row(vec![2.into(), "Bob".into(), SqlValue::Null, SqlValue::Null, SqlValue::Null]),
    ]);
    let mut session = session(&connection);

    let customers = session
        .list(
            &EntityQuery::from("Customer", "c")
                .join_fetch("orders")
                .unique(UniqueSemantic::Assert),
        )
        .unwrap();
    assert_eq!(customers.len(), 3);
    assert_eq!(customers[0], customers[1]);
    let ada = customers[0].as_entity().unwrap();
    let orders = session
        .entity(ada)
        .get("orders")
        .and_then(DomainValue::as_collection)
        .unwrap();
    assert_eq!(session.collection(orders).elements.len(), 2);
}

#[test]
fn test_entity_reached_through_two_fetches_hydrates_once() {
    let connection = SqliteConnection::open_in_memory().unwrap();
    connection
        .execute_batch(
            r#"
            CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
            CREATE TABLE orders (id INTEGER PRIMARY KEY, status TEXT NOT NULL, customer_id INTEGER);
            INSERT INTO customers VALUES (1, 'Ada'), (2, 'Bob');
            INSERT INTO orders VALUES (10, 'OPEN', 1), (11, 'HELD', 1), (12, 'OPEN', 2);
            "#,
        )
        .unwrap();
    let mut session = Session::new(Box::new(connection), model(), Settings::default())
        .unwrap()
        .with_dialect(Dialect::Sqlite);

    // each row reaches its order as the root and again as a customer.orders element
    let orders = session
        .list(
            &EntityQuery::from("Order", "o")
                .join_fetch("customer")
                .join_fetch("customer.orders")
                .order_by("id", SortOrder::Ascending),
        )
        .unwrap();

    assert_eq!(orders.len(), 3);
    assert_eq!(session.persistence_context().entity_count(), 5);
    assert_eq!(session.persistence_context().load_events(), 5);
}
