//! Fully-qualified table identifiers (`database.schema.table`)

use crate::error::{Result, VdcError};
use std::fmt;

/// A `database.schema.table` identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName {
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl TableName {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Parse an identifier; exactly three non-empty dot-separated parts
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').map(str::trim).collect();
        match parts.as_slice() {
            [database, schema, table]
                if !database.is_empty() && !schema.is_empty() && !table.is_empty() =>
            {
                Ok(Self::new(*database, *schema, *table))
            }
            _ => Err(VdcError::config(format!(
                "Invalid table identifier '{}': expected database.schema.table",
                s
            ))),
        }
    }

    /// Derive the table to compare against by swapping any of the three parts
    pub fn compare_to(
        &self,
        database: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> Result<Self> {
        let pick = |part: Option<&str>, current: &str, what: &str| -> Result<String> {
            match part.map(str::trim) {
                None => Ok(current.to_string()),
                Some(p) if p.is_empty() || p.contains('.') => Err(VdcError::config(format!(
                    "Invalid compare-to {}: '{}'",
                    what, p
                ))),
                Some(p) => Ok(p.to_string()),
            }
        };

        let target = Self::new(
            pick(database, &self.database, "database")?,
            pick(schema, &self.schema, "schema")?,
            pick(table, &self.table, "table")?,
        );

        if target.to_lowercase() == self.to_lowercase() {
            return Err(VdcError::config(format!(
                "Nothing to compare: '{}' would be compared with itself. Use --compare-to-db, --compare-to-schema or --compare-to-table",
                self
            )));
        }
        Ok(target)
    }

    pub fn to_lowercase(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.table)
    }
}
