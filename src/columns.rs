//! Column resolution for table diffs

use crate::catalog::TableDescriptor;
use crate::error::{Result, VdcError};
use std::collections::HashSet;

/// Include/exclude lists given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSelection {
    pub only: Vec<String>,
    pub ignore: Vec<String>,
}

impl ColumnSelection {
    pub fn new(only: Vec<String>, ignore: Vec<String>) -> Self {
        Self { only, ignore }
    }
}

/// Resolve the ordered list of columns to compare.
///
/// Columns are returned in `table`'s order and spelling.
pub fn resolve_columns(
    table: &TableDescriptor,
    compare_to: &TableDescriptor,
    selection: &ColumnSelection,
    primary_key: &str,
) -> Result<Vec<String>> {
    for descriptor in [table, compare_to] {
        if descriptor.columns.is_empty() {
            return Err(VdcError::config(format!(
                "Table '{}' was not found or has no columns",
                descriptor.name
            )));
        }
    }

    let lower = |s: &str| s.to_lowercase();
    let primary_key = lower(primary_key);

    let mut base: HashSet<String> = if selection.only.is_empty() {
        table
            .columns
            .iter()
            .filter(|c| compare_to.find_column(&c.name).is_some())
            .map(|c| lower(&c.name))
            .collect()
    } else {
        let mut wanted = HashSet::new();
        for column in &selection.only {
            if table.find_column(column).is_none() || compare_to.find_column(column).is_none() {
                return Err(VdcError::config(format!(
                    "Column '{}' must exist in both {} and {}",
                    column, table.name, compare_to.name
                )));
            }
            wanted.insert(lower(column));
        }
        wanted.insert(primary_key.clone());
        wanted
    };

    for column in &selection.ignore {
        if table.find_column(column).is_none() && compare_to.find_column(column).is_none() {
            log::warn!(
                "Ignored column '{}' exists in neither {} nor {}, skipping",
                column,
                table.name,
                compare_to.name
            );
            continue;
        }
        base.remove(&lower(column));
    }

    let columns: Vec<String> = table
        .columns
        .iter()
        .filter(|c| base.contains(&lower(&c.name)))
        .map(|c| c.name.clone())
        .collect();

    if columns.is_empty() {
        return Err(VdcError::config(format!(
            "No columns left to compare between {} and {}",
            table.name, compare_to.name
        )));
    }
    if !columns.iter().any(|c| lower(c) == primary_key) {
        return Err(VdcError::config(format!(
            "Primary key '{}' is not among the compared columns of {} and {}",
            primary_key.to_uppercase(),
            table.name,
            compare_to.name
        )));
    }

    log::debug!("Resolved columns: {}", columns.join(", "));
    Ok(columns)
}
