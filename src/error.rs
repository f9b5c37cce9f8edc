//! Error types for vdc operations

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VdcError>;

#[derive(Error, Debug)]
pub enum VdcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Manifest error ({path}): {message}")]
    Manifest { path: PathBuf, message: String },

    #[error("Primary key '{key}' is not unique in {source_label}: value {value} appears more than once")]
    AmbiguousKey {
        key: String,
        source_label: String,
        value: String,
    },

    #[error("{tool} failed ({status})\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    ExternalTool {
        tool: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("Query failed: {message}\n{sql}")]
    Query { sql: String, message: String },

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl VdcError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection {
            message: msg.into(),
        }
    }

    pub fn manifest(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn ambiguous_key(
        key: impl Into<String>,
        source_label: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::AmbiguousKey {
            key: key.into(),
            source_label: source_label.into(),
            value: value.into(),
        }
    }

    pub fn query(sql: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Query {
            sql: sql.into(),
            message: msg.into(),
        }
    }

    /// True for errors raised before any warehouse statement could run.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Manifest { .. })
    }
}
