//! Command implementations for the vdc CLI

use crate::catalog::{describe_table, fetch_inventory, list_schemas, list_tables, LiveTable, WarehouseObject};
use crate::cli::{Commands, WasteCommands};
use crate::columns::{resolve_columns, ColumnSelection};
use crate::compare::{compare, DiffReport};
use crate::config::Config;
use crate::disposal::{mark_statements, plan_disposal, schema_choices, DisposalCandidate};
use crate::error::{Result, VdcError};
use crate::expiry::removal_month_options;
use crate::identifier::TableName;
use crate::manifest::{read_manifest, DbtRunner, ManagedObjectSet};
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::progress::{with_spinner, Spinner};
use crate::prompt::{Choice, Prompter};
use crate::query::build_diff_queries;
use crate::reaper::{reap, select, ReapCandidates};
use crate::warehouse::{DuckDbWarehouse, QueryExecutor, Warehouse};
use chrono::{Local, NaiveDate};
use std::collections::HashSet;
use std::path::PathBuf;

/// Everything a command needs besides its own arguments
pub struct Session<'a> {
    pub config: &'a Config,
    pub warehouse: &'a dyn Warehouse,
    pub prompter: &'a mut dyn Prompter,
    /// Reference date for backup stamps, removal months and expiry checks
    pub today: NaiveDate,
}

/// Arguments of `vdc diff`
#[derive(Debug, Clone, Default)]
pub struct DiffArgs {
    pub table: String,
    pub primary_key: String,
    pub compare_to_db: Option<String>,
    pub compare_to_schema: Option<String>,
    pub compare_to_table: Option<String>,
    pub selection: ColumnSelection,
    pub output: Option<PathBuf>,
}

/// Arguments of `vdc waste disposal`
#[derive(Debug, Clone, Default)]
pub struct DisposalArgs {
    pub dbt_project_dir: Option<PathBuf>,
    pub dbt_profile_dir: Option<PathBuf>,
    pub dbt_target: Option<String>,
    pub ignore_tables: Vec<String>,
    pub manifest: Option<PathBuf>,
}

/// Result of a diff run
#[derive(Debug)]
pub struct DiffOutcome {
    pub report: DiffReport,
    pub exported: Option<PathBuf>,
}

/// Execute a command against the configured warehouse
pub fn execute_command(command: Commands, config: &Config, prompter: &mut dyn Prompter) -> Result<()> {
    let warehouse = DuckDbWarehouse::from_config(&config.warehouse);
    let mut session = Session {
        config,
        warehouse: &warehouse,
        prompter,
        today: Local::now().date_naive(),
    };
    run(command, &mut session)
}

/// Execute a command within a session
pub fn run(command: Commands, session: &mut Session<'_>) -> Result<()> {
    match command {
        Commands::Diff {
            table,
            primary_key,
            compare_to_db,
            compare_to_schema,
            compare_to_table,
            columns,
            ignore_columns,
            output,
        } => {
            let args = DiffArgs {
                table,
                primary_key,
                compare_to_db,
                compare_to_schema,
                compare_to_table,
                selection: ColumnSelection::new(columns, ignore_columns),
                output,
            };
            diff_command(session, &args).map(|_| ())
        }
        Commands::Waste { command } => match command {
            WasteCommands::Disposal {
                dbt_project_dir,
                dbt_profile_dir,
                dbt_target,
                ignore_table,
                manifest,
            } => {
                let args = DisposalArgs {
                    dbt_project_dir,
                    dbt_profile_dir,
                    dbt_target,
                    ignore_tables: ignore_table,
                    manifest,
                };
                disposal_command(session, &args).map(|_| ())
            }
            WasteCommands::Incineration { dry_run } => {
                incineration_command(session, dry_run).map(|_| ())
            }
        },
    }
}

/// Declined prompts unwind as `Cancelled` and end the command quietly
fn unless_cancelled<T: Default>(result: Result<T>) -> Result<T> {
    match result {
        Err(VdcError::Cancelled) => {
            println!("Aborting...");
            Ok(T::default())
        }
        other => other,
    }
}

/// `diff_<table>_<YYYY-MM-DD>.json` in the working directory
pub fn default_report_path(table: &TableName, today: NaiveDate) -> PathBuf {
    PathBuf::from(format!("diff_{}_{}.json", table.to_lowercase(), today.format("%Y-%m-%d")))
}

/// Compare a table with its counterpart; `None` when nothing differs
pub fn diff_command(session: &mut Session<'_>, args: &DiffArgs) -> Result<Option<DiffOutcome>> {
    let table = TableName::parse(&args.table)?;
    let compare_to = table.compare_to(
        args.compare_to_db.as_deref(),
        args.compare_to_schema.as_deref(),
        args.compare_to_table.as_deref(),
    )?;
    let primary_key = args.primary_key.to_uppercase();

    let spinner = Spinner::start("Fetching data...");
    let mut executor = session.warehouse.connect()?;
    let table_descriptor = describe_table(executor.as_mut(), &table)?;
    let compare_descriptor = describe_table(executor.as_mut(), &compare_to)?;
    let columns = resolve_columns(&table_descriptor, &compare_descriptor, &args.selection, &primary_key)?;

    let (table_query, compare_query) = build_diff_queries(&table, &compare_to, &columns);
    log::info!("Running query:\n{}\nand\n{}", table_query, compare_query);

    let left = executor.query(&table_query)?;
    let right = executor.query(&compare_query)?;
    drop(executor);
    spinner.finish("Fetched data");

    println!("\n📊 Rows different or missing in other table:");
    println!("{:<45}{:>10} rows", format!("{}:", table), left.len());
    println!("{:<45}{:>10} rows", format!("{}:", compare_to), right.len());

    if left.is_empty() && right.is_empty() {
        println!("✅ No diff");
        return Ok(None);
    }

    let report = compare(&left, &right, &table.to_string(), &compare_to.to_string(), &primary_key)?;
    println!();
    PrettyPrinter::print_diff_summary(&table, &compare_to, &columns, &report);

    if session.prompter.ask_confirm("Preview diff?")? {
        println!();
        PrettyPrinter::print_diff_report(&report);
        println!();
    }

    let mut exported = None;
    if session.prompter.ask_confirm("Export report?")? {
        let path = args
            .output
            .clone()
            .unwrap_or_else(|| default_report_path(&table, session.today));
        JsonFormatter::write_report(&report, &path)?;
        println!("📄 Report stored as: {}", path.display());
        exported = Some(path);
    }

    Ok(Some(DiffOutcome { report, exported }))
}

/// Mark unmanaged tables for removal; returns the executed rename statements
pub fn disposal_command(session: &mut Session<'_>, args: &DisposalArgs) -> Result<Vec<String>> {
    unless_cancelled(dispose(session, args))
}

fn load_managed_objects(config: &Config, args: &DisposalArgs) -> Result<ManagedObjectSet> {
    if let Some(path) = &args.manifest {
        return read_manifest(path);
    }

    let mut runner = DbtRunner::from_config(&config.dbt);
    if let Some(dir) = &args.dbt_project_dir {
        runner.project_dir = dir.clone();
    }
    if let Some(dir) = &args.dbt_profile_dir {
        runner.profiles_dir = dir.clone();
    }
    if let Some(target) = &args.dbt_target {
        runner.target = target.clone();
    }

    runner.ensure_available()?;
    let manifest_path = with_spinner("Compiling dbt project...", "Compiled dbt project", || runner.compile())?;
    read_manifest(&manifest_path)
}

fn dispose(session: &mut Session<'_>, args: &DisposalArgs) -> Result<Vec<String>> {
    let managed = load_managed_objects(session.config, args)?;

    let databases = managed.databases();
    if databases.is_empty() {
        println!("No databases found in the manifest.");
        return Ok(Vec::new());
    }
    let choices: Vec<Choice> = databases.iter().map(Choice::new).collect();
    let selected = session
        .prompter
        .ask_multi_select("Which databases do you want to inspect?", &choices)?;
    if selected.is_empty() {
        return Err(VdcError::Cancelled);
    }
    let selected_databases: Vec<&str> = selected.iter().map(|&i| databases[i].as_str()).collect();

    let mut executor = session.warehouse.connect()?;
    let live_tables = scan_tables(executor.as_mut(), session, &selected_databases)?;
    drop(executor);

    let candidates = plan_disposal(&managed, &live_tables, &args.ignore_tables);
    if candidates.is_empty() {
        println!("No tables found for deprecation.");
        return Ok(Vec::new());
    }

    let width = candidates.iter().map(|c| c.name.len()).max().unwrap_or(0);
    let choices: Vec<Choice> = candidates
        .iter()
        .map(|c| Choice::new(PrettyPrinter::candidate_title(c, width)))
        .collect();
    let selected = session
        .prompter
        .ask_multi_select("Which tables do you want to deprecate?", &choices)?;
    if selected.is_empty() {
        println!("No tables selected for deprecation.");
        return Ok(Vec::new());
    }
    let selected_tables: Vec<DisposalCandidate> = selected.iter().map(|&i| candidates[i].clone()).collect();

    PrettyPrinter::print_candidates(&selected_tables);
    if !session.prompter.ask_confirm("Do you want to dispose these tables?")? {
        return Err(VdcError::Cancelled);
    }

    let months = removal_month_options(session.today);
    let choices: Vec<Choice> = months.iter().map(|m| Choice::new(m.label())).collect();
    let removal = match session
        .prompter
        .ask_single_select("Select month for removal:", &choices)?
    {
        Some(i) => months[i],
        None => return Err(VdcError::Cancelled),
    };

    let user_tag = session.config.user_tag();
    let statements = mark_statements(&selected_tables, removal, session.today, user_tag.as_deref())?;

    let mut executor = session.warehouse.connect()?;
    let spinner = Spinner::start("Marking tables...");
    for statement in &statements {
        executor.execute(statement)?;
        log::info!("{}", statement);
    }
    spinner.finish("Marked tables");

    println!(
        "✅ Marked {} table(s) for removal in {}",
        statements.len(),
        removal.label()
    );
    Ok(statements)
}

/// Schemas and tables of the selected databases, narrowed by schema prompt
fn scan_tables(
    executor: &mut dyn QueryExecutor,
    session: &mut Session<'_>,
    databases: &[&str],
) -> Result<Vec<LiveTable>> {
    let mut schemas = Vec::new();
    for &database in databases {
        let found = list_schemas(executor, Some(database))?;
        if found.is_empty() {
            println!("Database {} does not exist or is empty.", database);
        }
        schemas.extend(found);
    }

    let choices = schema_choices(&schemas, &session.config.protected_schema_keywords);
    let prompt_choices: Vec<Choice> = choices
        .iter()
        .map(|c| Choice {
            title: c.name.clone(),
            checked: c.checked,
        })
        .collect();
    let selected = session
        .prompter
        .ask_multi_select("Which schemas do you want to inspect?", &prompt_choices)?;
    if selected.is_empty() {
        return Err(VdcError::Cancelled);
    }
    let selected_schemas: HashSet<&str> = selected.iter().map(|&i| choices[i].name.as_str()).collect();

    println!("Fetching tables in databases: {}", databases.join(", "));
    let mut tables = Vec::new();
    for &database in databases {
        tables.extend(
            list_tables(executor, Some(database))?
                .into_iter()
                .filter(|t| {
                    let schema = format!("{}.{}", t.database, t.schema).to_lowercase();
                    selected_schemas.contains(schema.as_str())
                }),
        );
    }
    log::debug!("Found {} tables in selected schemas", tables.len());
    Ok(tables)
}

/// Drop marked objects past their removal month; returns the drop statements
pub fn incineration_command(session: &mut Session<'_>, dry_run: bool) -> Result<Vec<String>> {
    unless_cancelled(incinerate(session, dry_run))
}

fn incinerate(session: &mut Session<'_>, dry_run: bool) -> Result<Vec<String>> {
    let strict = session.config.strict_expiry_tags;
    let today = session.today;

    let mut executor = session.warehouse.connect()?;
    let inventory = with_spinner("Scanning warehouse...", "Scanned warehouse", || {
        fetch_inventory(executor.as_mut())
    })?;
    drop(executor);

    let candidates = ReapCandidates::from_inventory(&inventory, today, strict);
    if candidates.is_empty() {
        println!("✅ Nothing to incinerate.");
        return Ok(Vec::new());
    }

    let selection = if dry_run {
        reap(today, &inventory, strict)?
    } else {
        let prompter = &mut session.prompter;
        select(&candidates, |kind, offered| {
            let choices: Vec<Choice> = offered.iter().map(|o| Choice::new(o.fqn())).collect();
            let message = format!("Which {} do you want to drop?", kind.plural());
            let picked = prompter.ask_multi_select(&message, &choices)?;
            Ok(picked
                .into_iter()
                .map(|i| offered[i].clone())
                .collect::<Vec<WarehouseObject>>())
        })?
    };

    if selection.is_empty() {
        println!("No objects selected.");
        return Ok(Vec::new());
    }

    let statements = selection.statements();
    PrettyPrinter::print_reap_selection(&selection);
    PrettyPrinter::print_statements("📝 Statements:", &statements);

    if dry_run {
        println!("🔍 Dry run: nothing was dropped.");
        return Ok(statements);
    }

    if !session.prompter.ask_confirm("Do you want to drop these objects?")? {
        return Err(VdcError::Cancelled);
    }

    let mut executor = session.warehouse.connect()?;
    let spinner = Spinner::start("Dropping objects...");
    for statement in &statements {
        executor.execute(statement)?;
        log::info!("{}", statement);
    }
    spinner.finish("Dropped objects");

    println!("✅ Dropped {} object(s)", statements.len());
    Ok(statements)
}
