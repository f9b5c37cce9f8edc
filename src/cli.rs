//! Command-line interface for vdc

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vdc")]
#[command(about = "Warehouse lifecycle tool: table diffs and disposal of unmanaged objects")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to vdc.json in the current directory or a parent)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare a table with its counterpart in another database, schema or table
    Diff {
        /// Table to compare, as database.schema.table
        table: String,

        /// Primary key column used to align rows
        primary_key: String,

        /// Database to compare against
        #[arg(short = 'd', long = "compare-to-db")]
        compare_to_db: Option<String>,

        /// Schema to compare against
        #[arg(short = 's', long = "compare-to-schema")]
        compare_to_schema: Option<String>,

        /// Table name to compare against
        #[arg(short = 't', long = "compare-to-table")]
        compare_to_table: Option<String>,

        /// Only compare these columns (repeatable; the primary key is always included)
        #[arg(short = 'c', long = "column")]
        columns: Vec<String>,

        /// Leave these columns out of the comparison (repeatable)
        #[arg(short = 'i', long = "ignore-column")]
        ignore_columns: Vec<String>,

        /// Where to export the report (defaults to diff_<table>_<date>.json)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Find and remove warehouse waste
    Waste {
        #[command(subcommand)]
        command: WasteCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum WasteCommands {
    /// Mark tables not managed by dbt for removal
    Disposal {
        /// dbt project directory
        #[arg(long)]
        dbt_project_dir: Option<PathBuf>,

        /// dbt profiles directory
        #[arg(long)]
        dbt_profile_dir: Option<PathBuf>,

        /// dbt target
        #[arg(long)]
        dbt_target: Option<String>,

        /// Tables never proposed for disposal (repeatable)
        #[arg(long)]
        ignore_table: Vec<String>,

        /// Use an existing manifest instead of running dbt compile
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Drop marked objects whose removal month has passed
    Incineration {
        /// Show what would be dropped without dropping anything
        #[arg(long)]
        dry_run: bool,
    },
}
