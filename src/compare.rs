//! Key-aligned comparison of two row sets

use crate::error::{Result, VdcError};
use crate::warehouse::{ResultSet, Value};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One side of one differing key
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiffRow {
    pub key: Value,
    pub source: String,
    /// The side had no row for this key; cells are null-filled
    pub missing: bool,
    /// Differing columns only
    pub cells: IndexMap<String, Value>,
}

/// Symmetric difference of two row sets, keyed by (key, source)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DiffReport {
    pub primary_key: String,
    pub left_label: String,
    pub right_label: String,
    /// Union of differing columns, in column order
    pub columns: Vec<String>,
    pub rows: Vec<DiffRow>,
    pub only_in_left: Vec<Value>,
    pub only_in_right: Vec<Value>,
}

impl DiffReport {
    fn empty(primary_key: &str, left_label: &str, right_label: &str) -> Self {
        Self {
            primary_key: primary_key.to_string(),
            left_label: left_label.to_string(),
            right_label: right_label.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
            only_in_left: Vec::new(),
            only_in_right: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct differing keys, ascending
    pub fn keys(&self) -> Vec<&Value> {
        let mut keys: Vec<&Value> = self.rows.iter().map(|r| &r.key).collect();
        keys.dedup();
        keys
    }

    /// Keys present on both sides with at least one differing column
    pub fn changed_count(&self) -> usize {
        self.keys()
            .len()
            .saturating_sub(self.only_in_left.len() + self.only_in_right.len())
    }
}

/// Rows of one side indexed by primary key
struct KeyedRows<'a> {
    result: &'a ResultSet,
    rows: BTreeMap<Value, &'a [Value]>,
}

impl<'a> KeyedRows<'a> {
    fn index(result: &'a ResultSet, primary_key: &str, label: &str) -> Result<Self> {
        let mut rows = BTreeMap::new();
        if result.columns.is_empty() && result.rows.is_empty() {
            return Ok(Self { result, rows });
        }

        let key_index = result.column_index(primary_key).ok_or_else(|| {
            VdcError::config(format!(
                "Primary key '{}' not found in {} (columns: {})",
                primary_key,
                label,
                result.columns.join(", ")
            ))
        })?;

        for row in &result.rows {
            let key = row.get(key_index).cloned().unwrap_or(Value::Null);
            if rows.contains_key(&key) {
                return Err(VdcError::ambiguous_key(primary_key, label, key.to_string()));
            }
            rows.insert(key, row.as_slice());
        }
        Ok(Self { result, rows })
    }

    fn cell<'r>(&'r self, row: &'r [Value], column: &str) -> &'r Value {
        self.result.get(row, column)
    }
}

/// Compare two row sets by primary key.
///
/// Keys found on one side only are aligned against an all-null row and
/// differ on every non-key column. Each differing key yields two rows,
/// left label first.
pub fn compare(
    left: &ResultSet,
    right: &ResultSet,
    left_label: &str,
    right_label: &str,
    primary_key: &str,
) -> Result<DiffReport> {
    let primary_key = primary_key.to_uppercase();

    if left.is_empty() && right.is_empty() {
        log::debug!("Both sides are empty, nothing to align");
        return Ok(DiffReport::empty(&primary_key, left_label, right_label));
    }

    let left_rows = KeyedRows::index(left, &primary_key, left_label)?;
    let right_rows = KeyedRows::index(right, &primary_key, right_label)?;

    // Non-key columns: left order, then right-only extras
    let mut value_columns: Vec<String> = Vec::new();
    for column in left.columns.iter().chain(right.columns.iter()) {
        if column.eq_ignore_ascii_case(&primary_key)
            || value_columns.iter().any(|c| c.eq_ignore_ascii_case(column))
        {
            continue;
        }
        value_columns.push(column.clone());
    }

    let all_keys: BTreeSet<&Value> = left_rows.rows.keys().chain(right_rows.rows.keys()).collect();
    let only_in_left: Vec<Value> = left_rows
        .rows
        .keys()
        .filter(|k| !right_rows.rows.contains_key(*k))
        .cloned()
        .collect();
    let only_in_right: Vec<Value> = right_rows
        .rows
        .keys()
        .filter(|k| !left_rows.rows.contains_key(*k))
        .cloned()
        .collect();

    let mut report = DiffReport::empty(&primary_key, left_label, right_label);
    let mut differing_columns: BTreeSet<usize> = BTreeSet::new();

    for key in all_keys {
        let left_row = left_rows.rows.get(key).copied();
        let right_row = right_rows.rows.get(key).copied();

        let differing: Vec<usize> = match (left_row, right_row) {
            (Some(l), Some(r)) => value_columns
                .iter()
                .enumerate()
                .filter(|(_, column)| left_rows.cell(l, column) != right_rows.cell(r, column))
                .map(|(i, _)| i)
                .collect(),
            _ => (0..value_columns.len()).collect(),
        };

        // A one-sided key differs even when only the key column is compared
        if differing.is_empty() && left_row.is_some() && right_row.is_some() {
            continue;
        }

        let side_row = |rows: &KeyedRows<'_>, row: Option<&[Value]>, label: &str| DiffRow {
            key: key.clone(),
            source: label.to_string(),
            missing: row.is_none(),
            cells: differing
                .iter()
                .map(|&i| {
                    let column = &value_columns[i];
                    let value = row
                        .map(|r| rows.cell(r, column).clone())
                        .unwrap_or(Value::Null);
                    (column.clone(), value)
                })
                .collect(),
        };

        report.rows.push(side_row(&left_rows, left_row, left_label));
        report.rows.push(side_row(&right_rows, right_row, right_label));
        differing_columns.extend(differing.iter().copied());
    }

    report.columns = differing_columns
        .into_iter()
        .map(|i| value_columns[i].clone())
        .collect();
    report.only_in_left = only_in_left;
    report.only_in_right = only_in_right;

    log::debug!(
        "Compared {} vs {} rows: {} differing keys",
        left.len(),
        right.len(),
        report.keys().len()
    );
    Ok(report)
}
