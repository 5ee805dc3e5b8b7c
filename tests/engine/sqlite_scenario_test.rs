use std::rc::Rc;

use strata::config::Settings;
use strata::engine::{Session, SqliteConnection};
use strata::mapping::{CollectionAttribute, EntityMapping, MappingModel, ToOneAttribute};
use strata::query::{EntityDelete, EntityQuery, EntityUpdate, Restriction, Selection};
use strata::results::{InstantiationKind, InstantiationTarget, InstantiatorRegistry};
use strata::sql::ast::SortOrder;
use strata::sql::Dialect;
use strata::value::{DomainValue, JdbcType, SqlValue, ValueType};

const SCHEMA: &str = r#"
CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
CREATE TABLE orders (
    id INTEGER PRIMARY KEY,
    status TEXT NOT NULL,
    total REAL NOT NULL,
    customer_id INTEGER REFERENCES customers (id)
);
INSERT INTO customers VALUES (1, 'Ada'), (2, 'Bob');
INSERT INTO orders VALUES
    (10, 'OPEN', 5.0, 1),
    (11, 'HELD', 7.5, 1),
    (12, 'OPEN', 2.25, 2);
"#;

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
                .basic("total", "total", JdbcType::Double)
                .to_one(ToOneAttribute::new("customer", "Customer", "customer_id")),
        )
}

/// Statement logging for failing runs: `RUST_LOG=strata=debug cargo test`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn connection() -> Rc<SqliteConnection> {
    init_tracing();
    let connection = SqliteConnection::open_in_memory().unwrap();
    connection.execute_batch(SCHEMA).unwrap();
    Rc::new(connection)
}

fn session(connection: &Rc<SqliteConnection>) -> Session {
    Session::new(Box::new(Rc::clone(connection)), model(), Settings::default())
        .unwrap()
        .with_dialect(Dialect::Sqlite)
}

fn entity_attr(session: &Session, value: &DomainValue, name: &str) -> DomainValue {
    session
        .entity(value.as_entity().unwrap())
        .get(name)
        .cloned()
        .unwrap()
}

#[test]
fn test_join_fetched_graph_shares_identity() {
    let connection = connection();
    let mut session = session(&connection);

    let query = EntityQuery::from("Order", "o")
        .join_fetch("customer")
        .join_fetch("customer.orders")
        .order_by("id", SortOrder::Ascending);
    let orders = session.list(&query).unwrap();

    assert_eq!(connection.statement_count(), 1);
    assert_eq!(orders.len(), 3);

    let ada = entity_attr(&session, &orders[0], "customer");
    assert_eq!(entity_attr(&session, &orders[1], "customer"), ada);
    let bob = entity_attr(&session, &orders[2], "customer");
    assert_ne!(ada, bob);
    assert_eq!(
        entity_attr(&session, &ada, "name"),
        DomainValue::Scalar(SqlValue::Text("Ada".into()))
    );

    let ada_orders = entity_attr(&session, &ada, "orders").as_collection().unwrap();
    let collection = session.collection(ada_orders);
    assert!(collection.initialized);
    assert_eq!(collection.elements, vec![orders[0].clone(), orders[1].clone()]);

    let bob_orders = entity_attr(&session, &bob, "orders").as_collection().unwrap();
    assert_eq!(session.collection(bob_orders).elements, vec![orders[2].clone()]);

    assert_eq!(
        entity_attr(&session, &orders[1], "total"),
        DomainValue::Scalar(SqlValue::Float(7.5))
    );
    assert_eq!(session.persistence_context().entity_count(), 5);
}

#[test]
fn test_single_member_conjunction_keeps_nested_disjunction_grouped() {
    let connection = connection();
    let mut session = session(&connection);

    let query = EntityQuery::from("Order", "o")
        .filter(Restriction::eq("status", "HELD"))
        .filter(Restriction::and(vec![Restriction::or(vec![
            Restriction::eq("customer.id", 1),
            Restriction::eq("customer.id", 2),
        ])]))
        .order_by("id", SortOrder::Ascending);
    let orders = session.list(&query).unwrap();

    let ids: Vec<SqlValue> = orders
        .iter()
        .map(|order| session.entity(order.as_entity().unwrap()).key.id.clone())
        .collect();
    assert_eq!(ids, vec![SqlValue::Int(11)]);
}

#[test]
fn test_select_fetch_loads_association_by_key() {
    let connection = connection();
    let mut session = session(&connection);

    let orders = session
        .list(&EntityQuery::from("Order", "o").filter(Restriction::eq("id", 12)))
        .unwrap();

    // the root query, then one load for customer 2
    assert_eq!(connection.statement_count(), 2);
    let bob = entity_attr(&session, &orders[0], "customer");
    let bob = session.entity(bob.as_entity().unwrap());
    assert!(bob.is_initialized());
    assert_eq!(bob.get("name"), Some(&DomainValue::Scalar(SqlValue::Text("Bob".into()))));
}

#[test]
fn test_dto_instantiation_over_rows() {
    let connection = connection();
    let registry = InstantiatorRegistry::new().with_target(
        InstantiationTarget::new("OrderSummary").constructor(vec![
            ("id", ValueType::Scalar(JdbcType::Integer)),
            ("customerName", ValueType::Scalar(JdbcType::Varchar)),
        ]),
    );
    let mut session = session(&connection).with_registry(registry);

    let query = EntityQuery::from("Order", "o")
        .select_instantiation(
            InstantiationKind::Class("OrderSummary".into()),
            vec![
                Selection::attribute("id"),
                Selection::aliased("customer.name", "customerName"),
            ],
        )
        .order_by("id", SortOrder::Ascending);
    let rows = session.list(&query).unwrap();

    assert_eq!(rows.len(), 3);
    let names: Vec<_> = rows
        .iter()
        .map(|row| {
            let summary = row.as_object().unwrap();
            assert_eq!(summary.type_name, "OrderSummary");
            summary.get("customerName").cloned().unwrap()
        })
        .collect();
    assert_eq!(
        names,
        vec![
            DomainValue::Scalar(SqlValue::Text("Ada".into())),
            DomainValue::Scalar(SqlValue::Text("Ada".into())),
            DomainValue::Scalar(SqlValue::Text("Bob".into())),
        ]
    );
    assert_eq!(
        rows[2].as_object().unwrap().get("id"),
        Some(&DomainValue::Scalar(SqlValue::Int(12)))
    );
    assert_eq!(session.persistence_context().entity_count(), 0);
}

#[test]
fn test_bulk_update_and_staged_delete() {
    let connection = connection();
    let mut session = session(&connection);

    let updated = session
        .update(
            &EntityUpdate::new("Order")
                .set("status", "SHIPPED")
                .filter(Restriction::eq("customer.id", 1)),
        )
        .unwrap();
    assert_eq!(updated, 2);

    let deleted = session
        .delete(&EntityDelete::new("Order").filter(Restriction::eq("customer.name", "Bob")))
        .unwrap();
    assert_eq!(deleted, 1);

    let shipped = session
        .list(&EntityQuery::from("Order", "o").filter(Restriction::eq("status", "SHIPPED")))
        .unwrap();
    assert_eq!(shipped.len(), 2);
    let remaining = session.list(&EntityQuery::from("Order", "o")).unwrap();
    assert_eq!(remaining.len(), 2);
}

#[test]
fn test_open_from_settings() {
    let settings = Settings::from_toml(
        r#"
        [results]
        default_batch_size = 4

        [connections.scratch]
        driver = "sqlite"
        url = ":memory:"
        "#,
    )
    .unwrap();

    let mut session = Session::open(settings, "scratch", model()).unwrap();
    assert_eq!(session.dialect(), Dialect::Sqlite);
    assert_eq!(session.settings().results.default_batch_size, 4);

    // the in-memory database is empty
    let err = session.list(&EntityQuery::from("Order", "o")).unwrap_err();
    assert!(err.to_string().contains("no such table"));
}

#[test]
fn test_open_unknown_connection_fails() {
    let Err(err) = Session::open(Settings::default(), "missing", model()) else {
        panic!("expected an unknown connection to fail");
    };
    assert!(err.to_string().contains("Connection not found"));
}
