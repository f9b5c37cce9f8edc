//! Warehouse access: typed result sets and the DuckDB-backed query executor

use crate::config::WarehouseConfig;
use crate::error::{Result, VdcError};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Connection;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

/// A single typed, nullable cell
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Fixed-point numbers and integers wider than i64, in textual form
    Decimal(String),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    /// Exported as a hex string
    Bytes(#[serde(serialize_with = "serialize_hex")] Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal(d) => d.parse().ok(),
            _ => None,
        }
    }

    /// Exact decimal form of integer and fixed-point cells
    fn as_exact(&self) -> Option<ExactDecimal> {
        match self {
            Value::Int(i) => ExactDecimal::parse(&i.to_string()),
            Value::Decimal(d) => ExactDecimal::parse(d),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) | Value::Decimal(_) => 2,
            Value::Date(_) => 3,
            Value::Timestamp(_) => 4,
            Value::Text(_) => 5,
            Value::Bytes(_) => 6,
        }
    }
}

/// Sign plus digits with leading integer zeros and trailing fraction zeros
/// removed, so `1.50`, `01.5` and `+1.5` are the same number
#[derive(Debug, PartialEq, Eq)]
struct ExactDecimal {
    negative: bool,
    integer: String,
    fraction: String,
}

impl ExactDecimal {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (integer, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if integer.is_empty() && fraction.is_empty() {
            return None;
        }
        if !integer.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return None;
        }

        let integer = integer.trim_start_matches('0').to_string();
        let fraction = fraction.trim_end_matches('0').to_string();
        // Negative zero is zero
        let negative = negative && !(integer.is_empty() && fraction.is_empty());
        Some(Self {
            negative,
            integer,
            fraction,
        })
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        self.integer
            .len()
            .cmp(&other.integer.len())
            .then_with(|| self.integer.cmp(&other.integer))
            .then_with(|| self.fraction.cmp(&other.fraction))
    }
}

impl Ord for ExactDecimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self.cmp_magnitude(other),
            (true, true) => other.cmp_magnitude(self),
        }
    }
}

impl PartialOrd for ExactDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Numeric variants compare by value so an INTEGER key lines up with a DECIMAL one.
// Integers and decimals compare exactly; only a float on either side goes through f64.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (a, b) if a.rank() == 2 && b.rank() == 2 => match (a.as_exact(), b.as_exact()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => x.total_cmp(&y),
                    _ => a.to_string().cmp(&b.to_string()),
                },
            },
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d),
            Value::Timestamp(ts) => write!(f, "{}", ts),
            Value::Bytes(b) => write!(f, "{}", hex_escaped(b)),
        }
    }
}

/// DuckDB's blob literal form: `\xAA\xBB`
fn hex_escaped(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("\\x{:02X}", b)).collect()
}

fn serialize_hex<S: serde::Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex_escaped(bytes))
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Ordered columns plus rows of cells aligned to them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Build a result set from `(column, cells)` pairs
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<Value>)>) -> Self {
        let row_count = columns.first().map(|(_, cells)| cells.len()).unwrap_or(0);
        let mut names = Vec::with_capacity(columns.len());
        let mut rows = vec![Vec::with_capacity(columns.len()); row_count];
        for (name, cells) in columns {
            names.push(name.into());
            for (row, cell) in rows.iter_mut().zip(cells) {
                row.push(cell);
            }
        }
        Self::new(names, rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive column position
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Cell of `row` in column `name`, `Null` when either is missing
    pub fn get<'a>(&'a self, row: &'a [Value], name: &str) -> &'a Value {
        const NULL: &Value = &Value::Null;
        self.column_index(name)
            .and_then(|i| row.get(i))
            .unwrap_or(NULL)
    }

    /// Text cell of `row` in column `name`
    pub fn text(&self, row: &[Value], name: &str) -> Option<String> {
        match self.get(row, name) {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Executes SQL against one open warehouse session
pub trait QueryExecutor {
    /// Run a statement that returns rows
    fn query(&mut self, sql: &str) -> Result<ResultSet>;

    /// Run a statement for its side effect
    fn execute(&mut self, sql: &str) -> Result<()>;
}

/// Opens warehouse sessions, one per logical operation
pub trait Warehouse {
    fn connect(&self) -> Result<Box<dyn QueryExecutor>>;
}

/// DuckDB warehouse: a primary database file plus attached databases
#[derive(Debug, Clone)]
pub struct DuckDbWarehouse {
    database: Option<PathBuf>,
    attach: Vec<(String, PathBuf)>,
}

impl DuckDbWarehouse {
    pub fn new(database: Option<PathBuf>) -> Self {
        Self {
            database,
            attach: Vec::new(),
        }
    }

    pub fn from_config(config: &WarehouseConfig) -> Self {
        let mut warehouse = Self::new(config.database.clone());
        for attached in &config.attach {
            warehouse = warehouse.with_attached(&attached.alias, &attached.path);
        }
        warehouse
    }

    pub fn with_attached(mut self, alias: &str, path: &Path) -> Self {
        self.attach.push((alias.to_string(), path.to_path_buf()));
        self
    }

    fn open(&self) -> Result<Connection> {
        let connection = match &self.database {
            Some(path) => Connection::open(path).map_err(|e| {
                VdcError::connection(format!("Failed to open '{}': {}", path.display(), e))
            })?,
            None => Connection::open_in_memory()
                .map_err(|e| VdcError::connection(format!("Failed to open in-memory database: {}", e)))?,
        };

        for (alias, path) in &self.attach {
            let sql = format!(
                "ATTACH '{}' AS {}",
                path.to_string_lossy().replace('\'', "''"),
                alias
            );
            connection.execute_batch(&sql).map_err(|e| {
                VdcError::connection(format!(
                    "Failed to attach '{}' as {}: {}",
                    path.display(),
                    alias,
                    e
                ))
            })?;
            log::debug!("Attached {} as {}", path.display(), alias);
        }

        Ok(connection)
    }
}

impl Warehouse for DuckDbWarehouse {
    fn connect(&self) -> Result<Box<dyn QueryExecutor>> {
        let connection = self.open()?;
        Ok(Box::new(DuckDbExecutor { connection }))
    }
}

/// Session on a DuckDB connection; closed on drop
pub struct DuckDbExecutor {
    connection: Connection,
}

impl DuckDbExecutor {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Column names of a query, in order, via DESCRIBE
    fn describe(&self, sql: &str) -> Result<Vec<String>> {
        let describe_sql = format!("DESCRIBE {}", sql);
        let mut stmt = self
            .connection
            .prepare(&describe_sql)
            .map_err(|e| VdcError::query(sql, e.to_string()))?;

        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| VdcError::query(sql, e.to_string()))?;

        let mut columns = Vec::new();
        for name in names {
            columns.push(name.map_err(|e| VdcError::query(sql, e.to_string()))?);
        }
        Ok(columns)
    }
}

impl QueryExecutor for DuckDbExecutor {
    fn query(&mut self, sql: &str) -> Result<ResultSet> {
        log::debug!("query: {}", sql.trim());
        let columns = self.describe(sql)?;
        let column_count = columns.len();

        let mut stmt = self
            .connection
            .prepare(sql)
            .map_err(|e| VdcError::query(sql, e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                let mut cells = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    cells.push(convert_value(row.get_ref(i)?));
                }
                Ok(cells)
            })
            .map_err(|e| VdcError::query(sql, e.to_string()))?;

        let mut data = Vec::new();
        for row in rows {
            data.push(row.map_err(|e| VdcError::query(sql, e.to_string()))?);
        }

        Ok(ResultSet::new(columns, data))
    }

    fn execute(&mut self, sql: &str) -> Result<()> {
        log::debug!("execute: {}", sql.trim());
        self.connection
            .execute_batch(sql)
            .map_err(|e| VdcError::query(sql, e.to_string()))
    }
}

fn timestamp_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

/// Convert a DuckDB cell into a `Value`
fn convert_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(i) => Value::Int(i.into()),
        ValueRef::SmallInt(i) => Value::Int(i.into()),
        ValueRef::Int(i) => Value::Int(i.into()),
        ValueRef::BigInt(i) => Value::Int(i),
        ValueRef::HugeInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Decimal(i.to_string())),
        ValueRef::UTinyInt(i) => Value::Int(i.into()),
        ValueRef::USmallInt(i) => Value::Int(i.into()),
        ValueRef::UInt(i) => Value::Int(i.into()),
        ValueRef::UBigInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Decimal(i.to_string())),
        ValueRef::Float(f) => Value::Float(f.into()),
        ValueRef::Double(f) => Value::Float(f),
        ValueRef::Decimal(d) => Value::Decimal(d.to_string()),
        ValueRef::Text(s) => Value::Text(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
        ValueRef::Date32(days) => NaiveDate::from_num_days_from_ce_opt(days + 719_163)
            .map(Value::Date)
            .unwrap_or(Value::Null),
        ValueRef::Timestamp(unit, v) => {
            let micros = timestamp_micros(unit, v);
            let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
            DateTime::from_timestamp(micros.div_euclid(1_000_000), nanos)
                .map(|dt| Value::Timestamp(dt.naive_utc()))
                .unwrap_or(Value::Null)
        }
        ValueRef::Time64(unit, v) => Value::Text(format!("{}us", timestamp_micros(unit, v))),
        other => Value::Text(format!("{:?}", other)),
    }
}
