//! dbt manifest reading and the compile step that produces it

use crate::config::DbtConfig;
use crate::error::{Result, VdcError};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Suffix dbt gives build-time copies of managed tables
pub const TRANSIENT_SUFFIX: &str = "__transient";

const NODE_TYPES: [&str; 3] = ["model", "snapshot", "seed"];
const SOURCE_TYPES: [&str; 1] = ["source"];

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    nodes: HashMap<String, ManifestEntry>,
    #[serde(default)]
    sources: HashMap<String, ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    resource_type: String,
    #[serde(default)]
    relation_name: Option<String>,
    #[serde(default)]
    database: Option<String>,
}

/// Tables and databases managed by the dbt project
#[derive(Debug, Clone, Default)]
pub struct ManagedObjectSet {
    tables: BTreeSet<String>,
    databases: BTreeSet<String>,
}

impl ManagedObjectSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relation; both the literal and the transient-stripped name
    /// count as managed
    pub fn insert(&mut self, relation_name: &str, database: Option<&str>) {
        let name = normalize_relation(relation_name);
        if let Some(stripped) = name.strip_suffix(TRANSIENT_SUFFIX) {
            self.tables.insert(stripped.to_string());
        }
        self.tables.insert(name);

        if let Some(db) = database.map(str::trim).filter(|db| !db.is_empty()) {
            self.databases.insert(db.to_lowercase());
        }
    }

    /// Whether a fully-qualified table name is managed
    pub fn contains(&self, fqn: &str) -> bool {
        self.tables.contains(&normalize_relation(fqn))
    }

    /// Managed databases, sorted
    pub fn databases(&self) -> Vec<String> {
        self.databases.iter().cloned().collect()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, Option<&'a str>)> for ManagedObjectSet {
    fn from_iter<I: IntoIterator<Item = (&'a str, Option<&'a str>)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (relation_name, database) in iter {
            set.insert(relation_name, database);
        }
        set
    }
}

/// `"DB"."SCH"."T"` -> `db.sch.t`
fn normalize_relation(relation_name: &str) -> String {
    relation_name
        .trim()
        .chars()
        .filter(|c| *c != '"' && *c != '`')
        .collect::<String>()
        .to_lowercase()
}

/// Read the managed object set from a compiled manifest
pub fn read_manifest(path: &Path) -> Result<ManagedObjectSet> {
    if !path.is_file() {
        return Err(VdcError::manifest(path, "Manifest file not found"));
    }
    let content = fs::read_to_string(path).map_err(|e| VdcError::manifest(path, e.to_string()))?;
    let manifest: Manifest = serde_json::from_str(&content)
        .map_err(|e| VdcError::manifest(path, format!("Invalid manifest: {}", e)))?;

    let mut managed = ManagedObjectSet::new();
    let entries = manifest
        .nodes
        .values()
        .filter(|e| NODE_TYPES.contains(&e.resource_type.as_str()))
        .chain(
            manifest
                .sources
                .values()
                .filter(|e| SOURCE_TYPES.contains(&e.resource_type.as_str())),
        );

    let mut skipped = 0;
    for entry in entries {
        match &entry.relation_name {
            Some(relation_name) => managed.insert(relation_name, entry.database.as_deref()),
            // Ephemeral models never materialize
            None => skipped += 1,
        }
    }

    log::info!(
        "Read manifest {}: {} managed tables in {} databases",
        path.display(),
        managed.table_count(),
        managed.databases.len()
    );
    if skipped > 0 {
        log::debug!("Skipped {} manifest entries without a relation name", skipped);
    }
    Ok(managed)
}

/// Runs `dbt compile` to produce the manifest
#[derive(Debug, Clone)]
pub struct DbtRunner {
    pub executable: String,
    pub project_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub target: String,
}

impl DbtRunner {
    pub fn from_config(config: &DbtConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            project_dir: config.project_dir.clone(),
            profiles_dir: config.profiles_dir.clone(),
            target: config.target.clone(),
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.project_dir.join("target").join("manifest.json")
    }

    /// Arguments passed to the executable
    pub fn compile_args(&self) -> Vec<String> {
        vec![
            "compile".to_string(),
            "--target".to_string(),
            self.target.clone(),
            "--profiles-dir".to_string(),
            self.profiles_dir.to_string_lossy().to_string(),
            "--project-dir".to_string(),
            self.project_dir.to_string_lossy().to_string(),
        ]
    }

    /// Fail unless the executable can be found
    pub fn ensure_available(&self) -> Result<PathBuf> {
        find_executable(&self.executable).ok_or_else(|| VdcError::ExternalTool {
            tool: self.executable.clone(),
            status: "not found on PATH".to_string(),
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    /// Compile the project and return the manifest location
    pub fn compile(&self) -> Result<PathBuf> {
        let executable = self.ensure_available()?;
        log::info!(
            "Running {} {}",
            self.executable,
            self.compile_args().join(" ")
        );

        let output = Command::new(&executable)
            .args(self.compile_args())
            .output()
            .map_err(|e| VdcError::ExternalTool {
                tool: self.executable.clone(),
                status: e.to_string(),
                stdout: String::new(),
                stderr: String::new(),
            })?;

        if !output.status.success() {
            return Err(VdcError::ExternalTool {
                tool: self.executable.clone(),
                status: output.status.to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(self.manifest_path())
    }
}

/// Locate an executable by path or on `PATH`
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|p| p.is_file())
}
