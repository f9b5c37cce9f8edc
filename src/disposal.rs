//! Disposal planning: find unmanaged tables and mark them for removal

use crate::catalog::LiveTable;
use crate::error::Result;
use crate::expiry::{is_marked, MarkedName, YearMonth};
use crate::identifier::TableName;
use crate::manifest::ManagedObjectSet;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Schemas never inspected
pub const EXCLUDED_SCHEMAS: [&str; 2] = ["PUBLIC", "INFORMATION_SCHEMA"];

fn is_excluded_schema(schema: &str) -> bool {
    EXCLUDED_SCHEMAS
        .iter()
        .any(|excluded| excluded.eq_ignore_ascii_case(schema))
}

/// A schema offered for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaChoice {
    /// Lower-cased `database.schema`
    pub name: String,
    pub database: String,
    pub schema: String,
    /// Pre-selected unless the name hits a protected keyword
    pub checked: bool,
}

/// A table proposed for disposal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisposalCandidate {
    /// Lower-cased fully-qualified name
    pub name: String,
    pub last_altered: Option<NaiveDateTime>,
}

/// Schemas of the selected databases that may be inspected, sorted
pub fn schema_choices(schemas: &[(String, String)], protected_keywords: &[String]) -> Vec<SchemaChoice> {
    let mut choices: Vec<SchemaChoice> = schemas
        .iter()
        .filter(|(_, schema)| !is_excluded_schema(schema))
        .map(|(database, schema)| {
            let name = format!("{}.{}", database, schema).to_lowercase();
            let checked = !protected_keywords
                .iter()
                .any(|keyword| name.contains(&keyword.to_lowercase()));
            SchemaChoice {
                name,
                database: database.clone(),
                schema: schema.clone(),
                checked,
            }
        })
        .filter(|choice| !is_marked(&choice.name))
        .collect();

    choices.sort_by(|a, b| a.name.cmp(&b.name));
    choices.dedup_by(|a, b| a.name == b.name);
    choices
}

/// Whether `table` is named in the ignore list, by full name or bare table name
fn is_ignored(table: &LiveTable, ignore_tables: &[String]) -> bool {
    let fqn = table.fqn();
    ignore_tables.iter().any(|ignored| {
        let ignored = ignored.trim().to_lowercase();
        ignored == fqn || ignored == table.name.to_lowercase()
    })
}

/// Live tables that are neither managed, ignored, excluded nor already marked
pub fn plan_disposal(
    managed: &ManagedObjectSet,
    live_tables: &[LiveTable],
    ignore_tables: &[String],
) -> Vec<DisposalCandidate> {
    let mut candidates: Vec<DisposalCandidate> = live_tables
        .iter()
        .filter(|table| !is_excluded_schema(&table.schema))
        .filter(|table| !is_ignored(table, ignore_tables))
        .filter(|table| {
            let fqn = table.fqn();
            if managed.contains(&fqn) {
                return false;
            }
            if is_marked(&fqn) {
                log::debug!("Skipping already marked table {}", fqn);
                return false;
            }
            true
        })
        .map(|table| DisposalCandidate {
            name: table.fqn(),
            last_altered: table.last_altered,
        })
        .collect();

    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    candidates.dedup_by(|a, b| a.name == b.name);
    candidates
}

/// Rename statement marking a table for removal in `removal`
pub fn mark_statement(
    table: &str,
    removal: YearMonth,
    backup_date: NaiveDate,
    user_tag: Option<&str>,
) -> Result<String> {
    let name = TableName::parse(table)?;
    let marked = MarkedName::new(
        name.table.clone(),
        backup_date,
        user_tag.map(str::to_string),
        removal,
    );
    Ok(format!("alter table {} rename to {}", name, marked))
}

/// Rename statements for every selected candidate
pub fn mark_statements(
    candidates: &[DisposalCandidate],
    removal: YearMonth,
    backup_date: NaiveDate,
    user_tag: Option<&str>,
) -> Result<Vec<String>> {
    candidates
        .iter()
        .map(|c| mark_statement(&c.name, removal, backup_date, user_tag))
        .collect()
}
