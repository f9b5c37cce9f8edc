//! # vdc
//!
//! Warehouse lifecycle tooling: key-aligned table diffs between environments,
//! disposal of tables no longer managed by dbt, and incineration of marked
//! objects once their removal month has passed.

pub mod catalog;
pub mod cli;
pub mod columns;
pub mod commands;
pub mod compare;
pub mod config;
pub mod disposal;
pub mod error;
pub mod expiry;
pub mod identifier;
pub mod manifest;
pub mod output;
pub mod progress;
pub mod prompt;
pub mod query;
pub mod reaper;
pub mod warehouse;

pub use config::Config;
pub use error::{Result, VdcError};
pub use identifier::TableName;
pub use warehouse::{DuckDbWarehouse, QueryExecutor, ResultSet, Value, Warehouse};
