//! Functional tests for `vdc diff` against DuckDB warehouses

use crate::common::{sample_data, today, CliTestRunner, TestFixture};
use std::fs;
use std::path::PathBuf;
use vdc::commands::{default_report_path, diff_command, DiffArgs};
use vdc::identifier::TableName;
use vdc::columns::ColumnSelection;
use vdc::prompt::Answer;
use vdc::Value;

/// prod and dev both hold `sales.orders`; id 2 changed, id 3 only in prod,
/// id 4 only in dev
fn prod_and_dev() -> CliTestRunner {
    let mut fixture = TestFixture::new().unwrap();
    fixture
        .create_database(
            "prod",
            &sample_data::orders_sql(&[(1, "open", 10.0), (2, "open", 20.0), (3, "shipped", 30.0)]),
        )
        .unwrap();
    fixture
        .create_database(
            "dev",
            &sample_data::orders_sql(&[(1, "open", 10.0), (2, "closed", 20.0), (4, "open", 40.0)]),
        )
        .unwrap();
    CliTestRunner::new(fixture)
}

fn diff_args(compare_to_db: &str) -> DiffArgs {
    DiffArgs {
        table: "prod.sales.orders".to_string(),
        primary_key: "id".to_string(),
        compare_to_db: Some(compare_to_db.to_string()),
        ..DiffArgs::default()
    }
}

#[test]
fn test_diff_against_other_database() {
    let runner = prod_and_dev();

    let (outcome, prompter) = runner.with_session(
        vec![Answer::Confirm(true), Answer::Confirm(false)],
        |session| diff_command(session, &diff_args("dev")),
    );
    let outcome = outcome.unwrap().expect("tables differ");
    let report = outcome.report;

    assert_eq!(report.primary_key, "ID");
    assert_eq!(report.left_label, "prod.sales.orders");
    assert_eq!(report.right_label, "dev.sales.orders");
    assert_eq!(report.keys(), vec![&Value::Int(2), &Value::Int(3), &Value::Int(4)]);
    assert_eq!(report.only_in_left, vec![Value::Int(3)]);
    assert_eq!(report.only_in_right, vec![Value::Int(4)]);
    assert_eq!(report.changed_count(), 1);
    assert_eq!(report.columns, vec!["status", "amount", "updated_at"]);

    // Two rows per key, table first
    assert_eq!(report.rows.len(), 6);
    assert_eq!(report.rows[0].source, "prod.sales.orders");
    assert_eq!(report.rows[0].cells.get("status"), Some(&Value::from("open")));
    assert_eq!(report.rows[1].source, "dev.sales.orders");
    assert_eq!(report.rows[1].cells.get("status"), Some(&Value::from("closed")));
    assert!(!report.rows[0].cells.contains_key("amount"));

    assert!(report.rows[3].missing);
    assert_eq!(report.rows[3].cells.get("amount"), Some(&Value::Null));
    assert!(report.rows[4].missing);

    assert!(outcome.exported.is_none());
    let messages: Vec<&str> = prompter.seen.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(messages, vec!["Preview diff?", "Export report?"]);
}

#[test]
fn test_diff_exports_json_report() {
    let runner = prod_and_dev();
    let output = runner.fixture.root().join("reports").join("orders.json");
    let output_arg = output.to_string_lossy().to_string();

    runner.expect_success(
        &["diff", "prod.sales.orders", "id", "-d", "dev", "--output", &output_arg],
        vec![Answer::Confirm(false), Answer::Confirm(true)],
    );

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(json["primary_key"], "ID");
    assert_eq!(json["left_label"], "prod.sales.orders");
    assert_eq!(json["rows"].as_array().unwrap().len(), 6);
    assert_eq!(json["rows"][0]["key"], 2);
    assert_eq!(json["rows"][1]["cells"]["status"], "closed");
    assert_eq!(json["rows"][5]["source"], "dev.sales.orders");
    assert_eq!(json["rows"][5]["cells"]["status"], "open");
    assert_eq!(json["only_in_right"][0], 4);
}

#[test]
fn test_diff_identical_tables() {
    let mut fixture = TestFixture::new().unwrap();
    let rows = [(1, "open", 10.0), (2, "closed", 20.0)];
    fixture.create_database("prod", &sample_data::orders_sql(&rows)).unwrap();
    fixture.create_database("dev", &sample_data::orders_sql(&rows)).unwrap();
    let runner = CliTestRunner::new(fixture);

    let (outcome, prompter) = runner.with_session(vec![], |session| diff_command(session, &diff_args("dev")));
    assert!(outcome.unwrap().is_none());
    // No diff means nothing to preview or export
    assert!(prompter.seen.is_empty());
}

#[test]
fn test_diff_against_other_schema() {
    let mut fixture = TestFixture::new().unwrap();
    fixture
        .create_database(
            "prod",
            &format!(
                "{}
                 CREATE SCHEMA sales_v2;
                 CREATE TABLE sales_v2.orders AS SELECT * FROM sales.orders;
                 UPDATE sales_v2.orders SET amount = 99.5 WHERE id = 1;",
                sample_data::orders_sql(&[(1, "open", 10.0), (2, "open", 20.0)])
            ),
        )
        .unwrap();
    let runner = CliTestRunner::new(fixture);

    let args = DiffArgs {
        table: "prod.sales.orders".to_string(),
        primary_key: "ID".to_string(),
        compare_to_schema: Some("sales_v2".to_string()),
        ..DiffArgs::default()
    };
    let (outcome, _) = runner.with_session(vec![], |session| diff_command(session, &args));
    let report = outcome.unwrap().expect("amount changed").report;

    assert_eq!(report.right_label, "prod.sales_v2.orders");
    assert_eq!(report.keys(), vec![&Value::Int(1)]);
    assert_eq!(report.columns, vec!["amount"]);
    assert_eq!(report.rows[0].cells.get("amount"), Some(&Value::Float(10.0)));
    assert_eq!(report.rows[1].cells.get("amount"), Some(&Value::Float(99.5)));
}

#[test]
fn test_diff_only_selected_columns() {
    let runner = prod_and_dev();

    let mut args = diff_args("dev");
    args.selection = ColumnSelection::new(vec!["amount".to_string()], vec![]);
    let (outcome, _) = runner.with_session(vec![], |session| diff_command(session, &args));
    let report = outcome.unwrap().expect("one-sided keys remain").report;

    // The status change on id 2 is not compared
    assert_eq!(report.keys(), vec![&Value::Int(3), &Value::Int(4)]);
    assert_eq!(report.columns, vec!["amount"]);
    assert_eq!(report.changed_count(), 0);
}

#[test]
fn test_diff_ignored_columns() {
    let runner = prod_and_dev();

    let mut args = diff_args("dev");
    args.selection = ColumnSelection::new(vec![], vec!["status".to_string(), "UPDATED_AT".to_string()]);
    let (outcome, _) = runner.with_session(vec![], |session| diff_command(session, &args));
    let report = outcome.unwrap().expect("one-sided keys remain").report;

    assert_eq!(report.keys(), vec![&Value::Int(3), &Value::Int(4)]);
    assert_eq!(report.columns, vec!["amount"]);
}

#[test]
fn test_diff_default_export_name() {
    let table = TableName::parse("PROD.Sales.Orders").unwrap();
    let path = default_report_path(&table, today());

    assert_eq!(path, PathBuf::from("diff_prod.sales.orders_2024-06-15.json"));
    assert!(path.parent().map_or(true, |p| p.as_os_str().is_empty()));
}
