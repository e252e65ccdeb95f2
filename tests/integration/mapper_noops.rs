#![allow(missing_docs)]

mod common;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use common::{recording_database, test_config, AuditLine, RecordingExecutor, UserAccount};
use tessera::{id::DEFAULT_EPOCH, Database, ModelRegistry, Row, TesseraError, Value};

#[test]
fn absent_keys_never_reach_the_executor() {
    let (db, executor) = recording_database();
    let users = db.mapper::<UserAccount>();

    assert!(users.find_by_id(None::<i64>).unwrap().is_none());
    assert!(!users.delete_by_id(Value::Null).unwrap());
    assert!(!users.delete_by_ids(Vec::<i64>::new()).unwrap());
    assert!(users.list_by_ids(Vec::<i64>::new()).unwrap().is_empty());
    assert!(!users.batch_insert(&mut []).unwrap());
    assert!(!users.update_by_id(&UserAccount::with_status("active")).unwrap());
    assert!(!users.update_by_id_full(&UserAccount::default()).unwrap());

    assert_eq!(executor.calls(), 0);
}

#[test]
fn update_without_changes_is_skipped() {
    let (db, executor) = recording_database();
    let users = db.mapper::<UserAccount>();

    let keyed_only = UserAccount {
        id: Some(5),
        created_at: Some(10),
        ..UserAccount::default()
    };
    assert!(!users.update_by_id(&keyed_only).unwrap());
    assert_eq!(executor.calls(), 0);
}

#[test]
fn condition_filters_only_present_fields() {
    let (db, executor) = recording_database();
    let users = db.mapper::<UserAccount>();

    users
        .list_by_condition(&UserAccount::with_status("active"), &[])
        .unwrap();
    let statement = executor.last().unwrap();
    assert_eq!(
        statement.sql,
        "SELECT id, user_name AS userName, status, created_at AS createdAt \
         FROM user_account WHERE status = ?"
    );
    assert_eq!(statement.params, vec![Value::from("active")]);

    users.count_by_condition(&UserAccount::default()).unwrap();
    assert_eq!(
        executor.last_sql().unwrap(),
        "SELECT COUNT(*) FROM user_account"
    );
}

#[test]
fn sorted_conditions_get_their_own_statement() {
    let (db, executor) = recording_database();
    let users = db.mapper::<UserAccount>();
    let filter = UserAccount::named("amy", "active");

    users
        .list_by_condition(
            &filter,
            &[UserAccount::STATUS.desc(), UserAccount::USER_NAME.asc()],
        )
        .unwrap();
    let sorted = executor.last().unwrap();
    assert!(sorted
        .sql
        .ends_with("WHERE user_name = ? AND status = ? ORDER BY status DESC, user_name ASC"));
    assert!(sorted.id.as_str().contains(".list_by_condition_"));

    users.list_by_condition(&filter, &[]).unwrap();
    let unsorted = executor.last().unwrap();
    assert_ne!(sorted.id, unsorted.id);
    assert!(!unsorted.sql.contains("ORDER BY"));
}

#[test]
fn sparse_insert_names_only_present_columns() {
    let (db, executor) = recording_database();
    let users = db.mapper::<UserAccount>();

    let mut user = UserAccount {
        id: Some(77),
        ..UserAccount::with_status("active")
    };
    assert!(users.insert(&mut user).unwrap());
    let statement = executor.last().unwrap();
    assert_eq!(
        statement.sql,
        "INSERT INTO user_account (id, status) VALUES (?, ?)"
    );
    assert_eq!(statement.params, vec![Value::Int(77), Value::from("active")]);
    assert!(statement.id.as_str().ends_with("UserAccount.insert.INSERT"));
}

#[test]
fn rows_map_back_onto_records() {
    let (db, executor) = recording_database();
    let users = db.mapper::<UserAccount>();

    let row: Row = [
        ("id".to_string(), Value::Int(3)),
        ("userName".to_string(), Value::from("kim")),
        ("status".to_string(), Value::Null),
        ("createdAt".to_string(), Value::Int(9)),
    ]
    .into_iter()
    .collect();
    executor.rows.lock().push(row);

    let found = users.find_by_id(3).unwrap().unwrap();
    assert_eq!(
        found,
        UserAccount {
            id: Some(3),
            user_name: Some("kim".into()),
            status: None,
            created_at: Some(9),
            scratch: None,
        }
    );
}

#[test]
fn case_folded_labels_still_map() {
    let (db, executor) = recording_database();
    let users = db.mapper::<UserAccount>();

    let row: Row = [
        ("id".to_string(), Value::Int(3)),
        ("username".to_string(), Value::from("kim")),
        ("CREATEDAT".to_string(), Value::Int(9)),
    ]
    .into_iter()
    .collect();
    executor.rows.lock().push(row);

    let found = users.find_by_id(3).unwrap().unwrap();
    assert_eq!(found.user_name.as_deref(), Some("kim"));
    assert_eq!(found.created_at, Some(9));
    assert_eq!(found.status, None);
}

#[test]
fn mistyped_columns_fail_mapping() {
    let (db, executor) = recording_database();
    let users = db.mapper::<UserAccount>();

    let row: Row = [("id".to_string(), Value::from("not a number"))]
        .into_iter()
        .collect();
    executor.rows.lock().push(row);

    let err = users.find_by_id(1).unwrap_err();
    assert_eq!(err.code(), "TypeMismatch");
}

#[test]
fn paging_without_engine_is_unsupported() {
    let (db, executor) = recording_database();
    let users = db.mapper::<UserAccount>();

    let err = users
        .page_by_condition(&UserAccount::default(), 1, 10, &[])
        .unwrap_err();
    assert!(matches!(err, TesseraError::UnsupportedCapability(_)));
    assert_eq!(executor.calls(), 0);
}

#[test]
fn keyless_records_reject_key_operations() {
    let (db, executor) = recording_database();
    let lines = db.mapper::<AuditLine>();

    let err = lines.find_by_id(1).unwrap_err();
    assert_eq!(err.code(), "MissingPrimaryKey");
    assert!(err.is_configuration());

    let err = lines
        .update_by_id(&AuditLine {
            line: Some("x".into()),
        })
        .unwrap_err();
    assert!(matches!(err, TesseraError::MissingPrimaryKey { .. }));

    assert!(matches!(
        lines.delete_by_ids([1, 2]),
        Err(TesseraError::MissingPrimaryKey { .. })
    ));
    assert_eq!(executor.calls(), 0);

    let mut line = AuditLine {
        line: Some("started".into()),
    };
    assert!(lines.insert(&mut line).unwrap());
    assert_eq!(
        executor.last_sql().unwrap(),
        "INSERT INTO audit_line (line) VALUES (?)"
    );
    lines.list_by_condition(&line, &[]).unwrap();
    assert_eq!(executor.calls(), 2);
}

#[test]
fn clock_regression_reaches_the_caller_before_any_statement() {
    let now = Arc::new(AtomicI64::new(DEFAULT_EPOCH + 10_000));
    let clock = Arc::clone(&now);
    let registry = ModelRegistry::with_clock(
        test_config(),
        Arc::new(move || clock.load(Ordering::SeqCst)),
    )
    .unwrap();
    let executor = Arc::new(RecordingExecutor::default());
    let db = Database::new(Arc::new(registry), executor.clone());
    let users = db.mapper::<UserAccount>();

    let mut first = UserAccount::with_status("active");
    assert!(users.insert(&mut first).unwrap());
    assert!(first.id.is_some());
    assert_eq!(executor.calls(), 1);

    now.fetch_sub(5, Ordering::SeqCst);
    let mut second = UserAccount::with_status("active");
    let err = users.insert(&mut second).unwrap_err();
    assert!(matches!(err, TesseraError::ClockRegression { .. }));
    assert!(second.id.is_none());
    assert_eq!(executor.calls(), 1);
}
