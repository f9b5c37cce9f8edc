//! SQL text construction for diffs and catalog lookups

use crate::identifier::TableName;

/// Quote a SQL string literal
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote a SQL identifier
pub fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Render a select list; used for every select clause of a diff so that
/// ordering and casing match exactly
pub fn render_column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the two set-difference queries of a table diff:
/// rows of `table` missing from `compare_to`, and the mirror.
pub fn build_diff_queries(
    table: &TableName,
    compare_to: &TableName,
    columns: &[String],
) -> (String, String) {
    let select_list = render_column_list(columns);
    let difference = |from: &TableName, other: &TableName| {
        format!(
            "select {cols} from {from}\nexcept\nselect {cols} from {other}",
            cols = select_list,
            from = from,
            other = other,
        )
    };
    (difference(table, compare_to), difference(compare_to, table))
}
