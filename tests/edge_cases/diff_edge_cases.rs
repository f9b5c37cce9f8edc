//! Edge case tests for table diffs

use crate::common::{sample_data, CliTestRunner, TestFixture};
use vdc::commands::{diff_command, DiffArgs};
use vdc::columns::ColumnSelection;
use vdc::prompt::Answer;
use vdc::{Value, VdcError};

fn runner_with(prod_sql: &str, dev_sql: &str) -> CliTestRunner {
    let mut fixture = TestFixture::new().unwrap();
    fixture.create_database("prod", prod_sql).unwrap();
    fixture.create_database("dev", dev_sql).unwrap();
    CliTestRunner::new(fixture)
}

fn dev_args() -> DiffArgs {
    DiffArgs {
        table: "prod.s.t".to_string(),
        primary_key: "a".to_string(),
        compare_to_db: Some("dev".to_string()),
        ..DiffArgs::default()
    }
}

#[test]
fn test_duplicate_primary_key() {
    let runner = runner_with(
        "CREATE SCHEMA s; CREATE TABLE s.t (a INTEGER, b INTEGER); INSERT INTO s.t VALUES (1, 4), (1, 5);",
        "CREATE SCHEMA s; CREATE TABLE s.t (a INTEGER, b INTEGER); INSERT INTO s.t VALUES (1, 6);",
    );

    let (result, prompter) = runner.with_session(vec![], |session| diff_command(session, &dev_args()));
    match result {
        Err(VdcError::AmbiguousKey { key, source_label, value }) => {
            assert_eq!(key, "A");
            assert_eq!(source_label, "prod.s.t");
            assert_eq!(value, "1");
        }
        other => panic!("Expected AmbiguousKey, got {:?}", other.map(|_| ())),
    }
    assert!(prompter.seen.is_empty());
}

#[test]
fn test_single_value_difference() {
    let runner = runner_with(
        "CREATE SCHEMA s; CREATE TABLE s.t (a INTEGER, b INTEGER); INSERT INTO s.t VALUES (1, 4), (2, 5), (3, 6);",
        "CREATE SCHEMA s; CREATE TABLE s.t (a INTEGER, b INTEGER); INSERT INTO s.t VALUES (1, 4), (2, 5), (3, 7);",
    );

    let (result, _) = runner.with_session(vec![], |session| diff_command(session, &dev_args()));
    let report = result.unwrap().unwrap().report;

    assert_eq!(report.keys(), vec![&Value::Int(3)]);
    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[0].cells["b"], Value::Int(6));
    assert_eq!(report.rows[1].cells["b"], Value::Int(7));
}

#[test]
fn test_compare_table_missing() {
    let runner = runner_with(
        &sample_data::orders_sql(&[(1, "open", 10.0)]),
        "CREATE SCHEMA sales;",
    );

    let err = runner.expect_failure(&["diff", "prod.sales.orders", "id", "-d", "dev"], vec![]);
    assert!(err.is_configuration());
    assert!(err.to_string().contains("dev.sales.orders"));
}

#[test]
fn test_primary_key_ignored() {
    let runner = runner_with(
        &sample_data::orders_sql(&[(1, "open", 10.0)]),
        &sample_data::orders_sql(&[(1, "open", 11.0)]),
    );

    let err = runner.expect_failure(&["diff", "prod.sales.orders", "id", "-d", "dev", "-i", "id"], vec![]);
    assert!(matches!(err, VdcError::Config { .. }));
}

#[test]
fn test_selected_column_missing_on_one_side() {
    let runner = runner_with(
        "CREATE SCHEMA s; CREATE TABLE s.t (a INTEGER, b INTEGER, extra VARCHAR);",
        "CREATE SCHEMA s; CREATE TABLE s.t (a INTEGER, b INTEGER);",
    );

    let mut args = dev_args();
    args.selection = ColumnSelection::new(vec!["extra".to_string()], vec![]);
    let (result, _) = runner.with_session(vec![], |session| diff_command(session, &args));
    assert!(matches!(result, Err(VdcError::Config { .. })));
}

#[test]
fn test_columns_on_one_side_only_are_skipped() {
    let runner = runner_with(
        "CREATE SCHEMA s; CREATE TABLE s.t (a INTEGER, b INTEGER, extra VARCHAR); INSERT INTO s.t VALUES (1, 4, 'x');",
        "CREATE SCHEMA s; CREATE TABLE s.t (a INTEGER, b INTEGER); INSERT INTO s.t VALUES (1, 4);",
    );

    let (result, _) = runner.with_session(vec![], |session| diff_command(session, &dev_args()));
    assert!(result.unwrap().is_none());
}

#[test]
fn test_compare_with_itself() {
    let runner = runner_with(&sample_data::orders_sql(&[]), &sample_data::orders_sql(&[]));

    let err = runner.expect_failure(&["diff", "prod.sales.orders", "id", "-d", "PROD"], vec![]);
    assert!(err.to_string().contains("compared with itself"));
}

#[test]
fn test_invalid_table_name() {
    let runner = runner_with(&sample_data::orders_sql(&[]), &sample_data::orders_sql(&[]));

    let err = runner.expect_failure(&["diff", "orders", "id", "-d", "dev"], vec![]);
    assert!(err.is_configuration());
}

#[test]
fn test_empty_tables() {
    let runner = runner_with(&sample_data::orders_sql(&[]), &sample_data::orders_sql(&[]));

    let prompter = runner.expect_success(&["diff", "prod.sales.orders", "id", "-d", "dev"], vec![]);
    assert!(prompter.seen.is_empty());
}

#[test]
fn test_one_side_empty() {
    let runner = runner_with(
        &sample_data::orders_sql(&[(1, "open", 10.0), (2, "open", 20.0)]),
        &sample_data::orders_sql(&[]),
    );

    let (result, _) = runner.with_session(
        vec![Answer::Confirm(true), Answer::Confirm(false)],
        |session| diff_command(session, &DiffArgs {
            table: "prod.sales.orders".to_string(),
            primary_key: "ID".to_string(),
            compare_to_db: Some("dev".to_string()),
            ..DiffArgs::default()
        }),
    );
    let report = result.unwrap().unwrap().report;

    assert_eq!(report.only_in_left, vec![Value::Int(1), Value::Int(2)]);
    assert!(report.only_in_right.is_empty());
    assert_eq!(report.rows.len(), 4);
    assert!(report.rows.iter().filter(|r| r.missing).all(|r| r.source == "dev.sales.orders"));
}

#[test]
fn test_null_values_differ_from_values() {
    let runner = runner_with(
        "CREATE SCHEMA s; CREATE TABLE s.t (a INTEGER, b VARCHAR); INSERT INTO s.t VALUES (1, NULL), (2, NULL);",
        "CREATE SCHEMA s; CREATE TABLE s.t (a INTEGER, b VARCHAR); INSERT INTO s.t VALUES (1, 'x'), (2, NULL);",
    );

    let (result, _) = runner.with_session(vec![], |session| diff_command(session, &dev_args()));
    let report = result.unwrap().unwrap().report;

    assert_eq!(report.keys(), vec![&Value::Int(1)]);
    assert_eq!(report.rows[0].cells["b"], Value::Null);
    assert!(!report.rows[0].missing);
    assert_eq!(report.rows[1].cells["b"], Value::from("x"));
}

#[test]
fn test_wide_decimal_difference_is_reported() {
    let runner = runner_with(
        "CREATE SCHEMA s; CREATE TABLE s.t (a INTEGER, b DECIMAL(38,2)); \
         INSERT INTO s.t VALUES (1, 12345678901234567.01), (2, 5.00);",
        "CREATE SCHEMA s; CREATE TABLE s.t (a INTEGER, b DECIMAL(38,2)); \
         INSERT INTO s.t VALUES (1, 12345678901234567.02), (2, 5.00);",
    );

    let (result, _) = runner.with_session(vec![], |session| diff_command(session, &dev_args()));
    let report = result.unwrap().expect("cents apart must differ").report;

    assert_eq!(report.keys(), vec![&Value::Int(1)]);
    assert_eq!(report.rows[0].cells["b"], Value::Decimal("12345678901234567.01".into()));
    assert_eq!(report.rows[1].cells["b"], Value::Decimal("12345678901234567.02".into()));
}

#[test]
fn test_hugeint_keys_stay_distinct() {
    let runner = runner_with(
        "CREATE SCHEMA s; CREATE TABLE s.t (a HUGEINT, b INTEGER); \
         INSERT INTO s.t VALUES (123456789012345678901, 1), (123456789012345678902, 2);",
        "CREATE SCHEMA s; CREATE TABLE s.t (a HUGEINT, b INTEGER); \
         INSERT INTO s.t VALUES (123456789012345678901, 1), (123456789012345678902, 3);",
    );

    let (result, _) = runner.with_session(vec![], |session| diff_command(session, &dev_args()));
    let report = result.unwrap().unwrap().report;

    assert_eq!(report.keys(), vec![&Value::Decimal("123456789012345678902".into())]);
    assert_eq!(report.rows[0].cells["b"], Value::Int(2));
    assert_eq!(report.rows[1].cells["b"], Value::Int(3));
}

#[test]
fn test_wide_decimal_keys_stay_distinct() {
    let runner = runner_with(
        "CREATE SCHEMA s; CREATE TABLE s.t (a DECIMAL(38,0), b VARCHAR); \
         INSERT INTO s.t VALUES (123456789012345678901, 'x'), (123456789012345678902, 'y');",
        "CREATE SCHEMA s; CREATE TABLE s.t (a DECIMAL(38,0), b VARCHAR); \
         INSERT INTO s.t VALUES (123456789012345678901, 'x'), (123456789012345678902, 'z');",
    );

    let (result, _) = runner.with_session(vec![], |session| diff_command(session, &dev_args()));
    let report = result.unwrap().unwrap().report;

    assert_eq!(report.keys().len(), 1);
    assert_eq!(report.rows[0].cells["b"], Value::from("y"));
    assert_eq!(report.rows[1].cells["b"], Value::from("z"));
}

#[test]
fn test_blob_contents_are_compared() {
    let runner = runner_with(
        "CREATE SCHEMA s; CREATE TABLE s.t (a INTEGER, b BLOB); \
         INSERT INTO s.t VALUES (1, '\\xAA'::BLOB), (2, '\\x01\\x02'::BLOB);",
        "CREATE SCHEMA s; CREATE TABLE s.t (a INTEGER, b BLOB); \
         INSERT INTO s.t VALUES (1, '\\xBB'::BLOB), (2, '\\x01\\x02'::BLOB);",
    );

    let (result, _) = runner.with_session(vec![], |session| diff_command(session, &dev_args()));
    let report = result.unwrap().expect("same-length blobs with other bytes must differ").report;

    assert_eq!(report.keys(), vec![&Value::Int(1)]);
    assert_eq!(report.rows[0].cells["b"], Value::Bytes(vec![0xAA]));
    assert_eq!(report.rows[1].cells["b"], Value::Bytes(vec![0xBB]));
}
