//! Warehouse inventory: databases, schemas, tables, views and column lists

use crate::error::Result;
use crate::identifier::TableName;
use crate::query::quote_literal;
use crate::warehouse::{QueryExecutor, Value};
use chrono::NaiveDateTime;
use std::fmt;

/// Column of a table descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// A table and its ordered columns, fetched once per diff
#[derive(Debug, Clone)]
pub struct TableDescriptor {
    pub name: TableName,
    pub columns: Vec<ColumnInfo>,
}

impl TableDescriptor {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Case-insensitive lookup, returning the column's own spelling
    pub fn find_column(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.name.as_str())
    }
}

/// A table as seen by the disposal scan
#[derive(Debug, Clone, PartialEq)]
pub struct LiveTable {
    pub database: String,
    pub schema: String,
    pub name: String,
    pub last_altered: Option<NaiveDateTime>,
}

impl LiveTable {
    /// Lower-cased `database.schema.table`
    pub fn fqn(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.name).to_lowercase()
    }
}

/// Kinds of objects the reaper can drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Database,
    Schema,
    Table,
    View,
}

impl ObjectKind {
    /// SQL keyword used in `drop <keyword> <name>`
    pub fn keyword(&self) -> &'static str {
        match self {
            ObjectKind::Database => "database",
            ObjectKind::Schema => "schema",
            ObjectKind::Table => "table",
            ObjectKind::View => "view",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            ObjectKind::Database => "databases",
            ObjectKind::Schema => "schemas",
            ObjectKind::Table => "tables",
            ObjectKind::View => "views",
        }
    }
}

/// A database, schema, table or view
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WarehouseObject {
    pub kind: ObjectKind,
    pub database: String,
    pub schema: Option<String>,
    pub name: Option<String>,
}

impl WarehouseObject {
    pub fn database(database: impl Into<String>) -> Self {
        Self {
            kind: ObjectKind::Database,
            database: database.into(),
            schema: None,
            name: None,
        }
    }

    pub fn schema(database: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            kind: ObjectKind::Schema,
            database: database.into(),
            schema: Some(schema.into()),
            name: None,
        }
    }

    pub fn table(
        database: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: ObjectKind::Table,
            database: database.into(),
            schema: Some(schema.into()),
            name: Some(name.into()),
        }
    }

    pub fn view(
        database: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: ObjectKind::View,
            ..Self::table(database, schema, name)
        }
    }

    /// The object's own (last) name segment
    pub fn object_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.schema.as_deref())
            .unwrap_or(&self.database)
    }

    /// Dotted fully-qualified name
    pub fn fqn(&self) -> String {
        let mut parts = vec![self.database.as_str()];
        parts.extend(self.schema.as_deref());
        parts.extend(self.name.as_deref());
        parts.join(".")
    }

    /// Lower-cased name of the containing database
    pub fn database_key(&self) -> String {
        self.database.to_lowercase()
    }

    /// Lower-cased `database.schema` of the containing schema, if any
    pub fn schema_key(&self) -> Option<String> {
        self.schema
            .as_ref()
            .map(|s| format!("{}.{}", self.database, s).to_lowercase())
    }
}

impl fmt::Display for WarehouseObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fqn())
    }
}

/// Every database object visible to the reaper
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub databases: Vec<WarehouseObject>,
    pub schemas: Vec<WarehouseObject>,
    pub tables: Vec<WarehouseObject>,
    pub views: Vec<WarehouseObject>,
}

impl Inventory {
    pub fn len(&self) -> usize {
        self.databases.len() + self.schemas.len() + self.tables.len() + self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// DuckDB's own schemas, never user objects
const SYSTEM_SCHEMAS: &str = "('information_schema', 'pg_catalog')";

/// Fetch the ordered column list of a table
pub fn describe_table(executor: &mut dyn QueryExecutor, table: &TableName) -> Result<TableDescriptor> {
    let sql = format!(
        "select column_name, data_type from information_schema.columns \
         where lower(table_catalog) = lower({}) and lower(table_schema) = lower({}) and lower(table_name) = lower({}) \
         order by ordinal_position",
        quote_literal(&table.database),
        quote_literal(&table.schema),
        quote_literal(&table.table),
    );
    let result = executor.query(&sql)?;

    let columns = result
        .rows
        .iter()
        .filter_map(|row| {
            Some(ColumnInfo {
                name: result.text(row, "column_name")?,
                data_type: result.text(row, "data_type").unwrap_or_default(),
            })
        })
        .collect();

    Ok(TableDescriptor {
        name: table.clone(),
        columns,
    })
}

/// User databases
pub fn list_databases(executor: &mut dyn QueryExecutor) -> Result<Vec<String>> {
    let result = executor.query(
        "select database_name from duckdb_databases() where not internal order by database_name",
    )?;
    Ok(result
        .rows
        .iter()
        .filter_map(|row| result.text(row, "database_name"))
        .collect())
}

/// `(database, schema)` pairs, optionally limited to one database
pub fn list_schemas(
    executor: &mut dyn QueryExecutor,
    database: Option<&str>,
) -> Result<Vec<(String, String)>> {
    let mut sql = format!(
        "select database_name, schema_name from duckdb_schemas() \
         where database_name not in ('system', 'temp') and schema_name not in {}",
        SYSTEM_SCHEMAS
    );
    if let Some(db) = database {
        sql.push_str(&format!(" and lower(database_name) = lower({})", quote_literal(db)));
    }
    sql.push_str(" order by database_name, schema_name");

    let result = executor.query(&sql)?;
    Ok(result
        .rows
        .iter()
        .filter_map(|row| {
            Some((
                result.text(row, "database_name")?,
                result.text(row, "schema_name")?,
            ))
        })
        .collect())
}

/// Base tables, optionally limited to one database
pub fn list_tables(executor: &mut dyn QueryExecutor, database: Option<&str>) -> Result<Vec<LiveTable>> {
    // DuckDB keeps no modification time; the column stays for display
    let mut sql = String::from(
        "select database_name, schema_name, table_name, null::timestamp as last_altered \
         from duckdb_tables() where not internal and not temporary",
    );
    if let Some(db) = database {
        sql.push_str(&format!(" and lower(database_name) = lower({})", quote_literal(db)));
    }
    sql.push_str(" order by database_name, schema_name, table_name");

    let result = executor.query(&sql)?;
    Ok(result
        .rows
        .iter()
        .filter_map(|row| {
            let last_altered = match result.get(row, "last_altered") {
                Value::Timestamp(ts) => Some(*ts),
                _ => None,
            };
            Some(LiveTable {
                database: result.text(row, "database_name")?,
                schema: result.text(row, "schema_name")?,
                name: result.text(row, "table_name")?,
                last_altered,
            })
        })
        .collect())
}

/// Views
pub fn list_views(executor: &mut dyn QueryExecutor) -> Result<Vec<WarehouseObject>> {
    let sql = format!(
        "select database_name, schema_name, view_name from duckdb_views() \
         where not internal and not temporary and schema_name not in {} \
         order by database_name, schema_name, view_name",
        SYSTEM_SCHEMAS
    );
    let result = executor.query(&sql)?;
    Ok(result
        .rows
        .iter()
        .filter_map(|row| {
            Some(WarehouseObject::view(
                result.text(row, "database_name")?,
                result.text(row, "schema_name")?,
                result.text(row, "view_name")?,
            ))
        })
        .collect())
}

/// Fetch every database, schema, table and view
pub fn fetch_inventory(executor: &mut dyn QueryExecutor) -> Result<Inventory> {
    let databases = list_databases(executor)?
        .into_iter()
        .map(WarehouseObject::database)
        .collect();
    let schemas = list_schemas(executor, None)?
        .into_iter()
        .map(|(db, schema)| WarehouseObject::schema(db, schema))
        .collect();
    let tables = list_tables(executor, None)?
        .into_iter()
        .map(|t| WarehouseObject::table(t.database, t.schema, t.name))
        .collect();
    let views = list_views(executor)?;

    let inventory = Inventory {
        databases,
        schemas,
        tables,
        views,
    };
    log::debug!("Fetched inventory of {} objects", inventory.len());
    Ok(inventory)
}
