use std::rc::Rc;

use strata::config::Settings;
use strata::engine::{MemoryConnection, MemoryResultSet, Session};
use strata::error::{QueryError, SqlErrorKind, SqlException};
use strata::mapping::{EntityMapping, MappingModel};
use strata::query::{EntityQuery, Selection};
use strata::results::UniqueSemantic;
use strata::value::{DomainValue, JdbcType, SqlValue};

fn model() -> MappingModel {
    MappingModel::new()
        .with_entity(EntityMapping::new("Tag", "tags").basic("label", "label", JdbcType::Varchar))
}

fn session(connection: &Rc<MemoryConnection>) -> Session {
    Session::new(Box::new(Rc::clone(connection)), model(), Settings::default()).unwrap()
}

fn tag(id: i64, label: &str) -> Vec<SqlValue> {
    vec![SqlValue::Int(id), SqlValue::Text(label.into())]
}

fn ids(session: &Session, rows: &[DomainValue]) -> Vec<SqlValue> {
    rows.iter()
        .map(|row| session.entity(row.as_entity().unwrap()).key.id.clone())
        .collect()
}

// =============================================================================
// Unique Semantics
// =============================================================================

#[test]
fn test_filter_keeps_first_seen_order() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![tag(2, "b"), tag(1, "a"), tag(2, "b")]);
    let mut session = session(&connection);

    let rows = session
        .list(&EntityQuery::from("Tag", "t").unique(UniqueSemantic::Filter))
        .unwrap();
    assert_eq!(ids(&session, &rows), vec![SqlValue::Int(2), SqlValue::Int(1)]);
}

#[test]
fn test_allow_filters_entity_results() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![tag(1, "a"), tag(1, "a"), tag(2, "b")]);
    let mut session = session(&connection);

    let rows = session.list(&EntityQuery::from("Tag", "t")).unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn test_none_keeps_every_row_with_shared_identity() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![tag(1, "a"), tag(1, "a")]);
    let mut session = session(&connection);

    let rows = session
        .list(&EntityQuery::from("Tag", "t").unique(UniqueSemantic::None))
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], rows[1]);
    assert_eq!(session.persistence_context().entity_count(), 1);
}

#[test]
fn test_never_keeps_duplicates_in_row_order() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![tag(1, "a"), tag(2, "b"), tag(1, "a")]);
    let mut session = session(&connection);

    let rows = session
        .list(&EntityQuery::from("Tag", "t").unique(UniqueSemantic::Never))
        .unwrap();
    assert_eq!(
        ids(&session, &rows),
        vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(1)]
    );
    assert_eq!(rows[0], rows[2]);
}

#[test]
fn test_assert_rejects_duplicate_entity() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![tag(1, "a"), tag(1, "a")]);
    let mut session = session(&connection);

    let err = session
        .list(&EntityQuery::from("Tag", "t").unique(UniqueSemantic::Assert))
        .unwrap_err();
    match err {
        QueryError::DuplicateRow { result_type } => assert_eq!(result_type, "entity Tag"),
        other => panic!("expected a duplicate row error, got {:?}", other),
    }
    assert_eq!(session.persistence_context().active_load_contexts(), 0);
}

#[test]
fn test_allow_keeps_duplicate_scalars() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![
        vec![SqlValue::Text("a".into())],
        vec![SqlValue::Text("a".into())],
    ]);
    let mut session = session(&connection);

    let rows = session
        .list(&EntityQuery::from("Tag", "t").select(Selection::attribute("label")))
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(connection.executed()[0].sql, r#"SELECT "t1_0"."label" FROM "tags" AS "t1_0""#);
}

#[test]
fn test_filter_deduplicates_scalars() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![
        vec![SqlValue::Text("a".into())],
        vec![SqlValue::Text("b".into())],
        vec![SqlValue::Text("a".into())],
    ]);
    let mut session = session(&connection);

    let rows = session
        .list(
            &EntityQuery::from("Tag", "t")
                .select(Selection::attribute("label"))
                .unique(UniqueSemantic::Filter),
        )
        .unwrap();
    assert_eq!(
        rows,
        vec![
            DomainValue::Scalar(SqlValue::Text("a".into())),
            DomainValue::Scalar(SqlValue::Text("b".into())),
        ]
    );
}

// =============================================================================
// Errors and Cleanup
// =============================================================================

#[test]
fn test_cleanup_failure_is_suppressed_behind_primary() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_result_set(
        MemoryResultSet::new(vec![tag(1, "a"), tag(1, "a")])
            .with_close_error(SqlException::new("close failed")),
    );
    let mut session = session(&connection);

    let err = session
        .list(&EntityQuery::from("Tag", "t").unique(UniqueSemantic::Assert))
        .unwrap_err();
    assert!(matches!(err.primary(), QueryError::DuplicateRow { .. }));
    assert_eq!(err.suppressed().len(), 1);
    match &err.suppressed()[0] {
        QueryError::Execution(e) => assert_eq!(e.message, "close failed"),
        other => panic!("expected an execution error, got {:?}", other),
    }
}

#[test]
fn test_cleanup_failure_alone_is_reported() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_result_set(
        MemoryResultSet::new(vec![tag(1, "a")]).with_close_error(SqlException::new("close failed")),
    );
    let mut session = session(&connection);

    let err = session.list(&EntityQuery::from("Tag", "t")).unwrap_err();
    assert!(matches!(err, QueryError::Execution(ref e) if e.message == "close failed"));
}

#[test]
fn test_driver_error_is_converted_with_sql() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_error(SqlException::new("relation does not exist").with_sql_state("42P01"));
    let mut session = session(&connection);

    let err = session.list(&EntityQuery::from("Tag", "t")).unwrap_err();
    let QueryError::Execution(e) = err else {
        panic!("expected an execution error");
    };
    assert_eq!(e.kind, SqlErrorKind::SyntaxError);
    assert!(e.sql.as_deref().unwrap().starts_with("SELECT "));
    assert_eq!(e.source.unwrap().sql_state.as_deref(), Some("42P01"));
}

#[test]
fn test_unreadable_column_reports_position() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![vec![SqlValue::Int(1), SqlValue::Bytes(vec![0xff])]]);
    let mut session = session(&connection);

    let err = session.list(&EntityQuery::from("Tag", "t")).unwrap_err();
    let QueryError::Execution(e) = err else {
        panic!("expected an execution error");
    };
    assert_eq!(e.kind, SqlErrorKind::DataException);
    assert_eq!(e.position, Some(2));
    assert_eq!(session.persistence_context().active_load_contexts(), 0);
}

// =============================================================================
// Scrolling
// =============================================================================

#[test]
fn test_scroll_materializes_rows_on_demand() {
    let connection = Rc::new(MemoryConnection::new());
    connection.push_rows(vec![tag(1, "a"), tag(2, "b"), tag(3, "c")]);
    let mut session = session(&connection);

    let mut results = session.scroll(&EntityQuery::from("Tag", "t")).unwrap();
    assert!(results.get().is_none());
    assert!(results.next().unwrap());
    let first = results.get().cloned().unwrap();
    assert!(results.last().unwrap());
    let last = results.get().cloned().unwrap();
    assert!(!results.next().unwrap());
    assert!(results.get().is_none());
    assert!(results.position(1).unwrap());
    assert_eq!(results.get(), Some(&first));
    results.close().unwrap();
    assert!(results.is_closed());
    results.close().unwrap();
    drop(results);

    assert_ne!(first, last);
    let last = last.as_entity().unwrap();
    assert_eq!(session.entity(last).key.id, SqlValue::Int(3));
    assert!(session.entity(last).is_initialized());
    assert_eq!(session.persistence_context().active_load_contexts(), 0);
}
