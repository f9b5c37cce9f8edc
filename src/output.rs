//! Output formatting utilities

use crate::compare::DiffReport;
use crate::disposal::DisposalCandidate;
use crate::error::Result;
use crate::identifier::TableName;
use crate::reaper::ReapSelection;
use crate::warehouse::Value;
use chrono::NaiveDateTime;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::Table;
use std::fs;
use std::path::Path;

/// Pretty printer for vdc output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print the summary block of a diff
    pub fn print_diff_summary(table: &TableName, compare_to: &TableName, columns: &[String], report: &DiffReport) {
        println!("{}", Self::render_diff_summary(table, compare_to, columns, report));
    }

    pub fn render_diff_summary(
        table: &TableName,
        compare_to: &TableName,
        columns: &[String],
        report: &DiffReport,
    ) -> String {
        let mut lines = vec![
            format!("🔍 Diff: {} → {}", table, compare_to),
            format!("├─ Primary key: {}", report.primary_key),
            format!("├─ Columns compared: {}", columns.len()),
            format!("├─ Only in {}: {}", report.left_label, report.only_in_left.len()),
            format!("├─ Only in {}: {}", report.right_label, report.only_in_right.len()),
            format!("├─ Changed: {}", report.changed_count()),
        ];
        if report.columns.is_empty() {
            lines.push("└─ Differing columns: none".to_string());
        } else {
            lines.push(format!("└─ Differing columns: {}", report.columns.join(", ")));
        }
        lines.join("\n")
    }

    /// Print the differing rows as a table
    pub fn print_diff_report(report: &DiffReport) {
        println!("{}", Self::render_diff_report(report));
    }

    /// One line per (key, source); columns that did not differ for a key are blank
    pub fn render_diff_report(report: &DiffReport) -> String {
        let mut header = vec![report.primary_key.clone(), "source".to_string()];
        header.extend(report.columns.iter().cloned());

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED).set_header(header);

        for row in &report.rows {
            let mut line = vec![format_value(&row.key), row.source.clone()];
            line.extend(report.columns.iter().map(|column| match row.cells.get(column) {
                Some(_) if row.missing => "<missing>".to_string(),
                Some(value) => format_value(value),
                None => String::new(),
            }));
            table.add_row(line);
        }

        table.to_string()
    }

    /// Print tables proposed for disposal
    pub fn print_candidates(candidates: &[DisposalCandidate]) {
        println!("🗑️  Tables selected for disposal:");
        for (i, candidate) in candidates.iter().enumerate() {
            let prefix = if i == candidates.len() - 1 { "└─" } else { "├─" };
            println!("{} {}", prefix, candidate.name);
        }
    }

    /// Choice title for a candidate: name, padded, then last-altered time
    pub fn candidate_title(candidate: &DisposalCandidate, name_width: usize) -> String {
        format!(
            "{:<width$}Last altered: {}",
            candidate.name,
            format_last_altered(candidate.last_altered),
            width = name_width + 8
        )
    }

    /// Print a numbered list of SQL statements
    pub fn print_statements(title: &str, statements: &[String]) {
        println!("{}", title);
        for (i, statement) in statements.iter().enumerate() {
            let prefix = if i == statements.len() - 1 { "└─" } else { "├─" };
            println!("{} {};", prefix, statement);
        }
    }

    /// Print what an incineration run will remove
    pub fn print_reap_selection(selection: &ReapSelection) {
        println!("🔥 Selected for removal:");
        println!("├─ Databases: {}", selection.databases.len());
        println!("├─ Schemas: {}", selection.schemas.len());
        println!("├─ Tables: {}", selection.tables.len());
        println!("└─ Views: {}", selection.views.len());
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Write a diff report as pretty JSON
    pub fn write_report(report: &DiffReport, path: &Path) -> Result<()> {
        let json = Self::format(report)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(())
    }
}

fn format_value(value: &Value) -> String {
    value.to_string()
}

fn format_last_altered(last_altered: Option<NaiveDateTime>) -> String {
    last_altered
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
