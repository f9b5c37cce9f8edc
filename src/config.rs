//! Configuration for vdc: warehouse location, dbt project layout and lifecycle rules

use crate::error::{Result, VdcError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// File name searched for when no `--config` is given
pub const CONFIG_FILE_NAME: &str = "vdc.json";

/// Env var overriding the primary warehouse database file
pub const WAREHOUSE_ENV: &str = "VDC_WAREHOUSE";

/// Env vars naming the current user, in lookup order
pub const USER_ENV: [&str; 2] = ["VDC_USER", "DBT_USR"];

/// Top-level configuration, passed explicitly into every command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub warehouse: WarehouseConfig,
    pub dbt: DbtConfig,
    /// User name, used for the optional tag in marked object names
    pub user: Option<String>,
    /// Insert the user tag into marked names (`..._bck_<date>_<user>_drp_<month>`)
    pub tag_with_user: bool,
    /// Schemas whose name contains one of these are left unchecked in disposal
    pub protected_schema_keywords: Vec<String>,
    /// Skip objects with malformed expiry tags instead of treating them as expired
    pub strict_expiry_tags: bool,
}

/// Location of the warehouse databases
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Primary database file; in-memory when absent
    pub database: Option<PathBuf>,
    /// Additional databases attached under an alias
    pub attach: Vec<AttachedDatabase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachedDatabase {
    pub alias: String,
    pub path: PathBuf,
}

/// How the dbt manifest is produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbtConfig {
    pub executable: String,
    pub project_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub target: String,
}

impl Default for DbtConfig {
    fn default() -> Self {
        Self {
            executable: "dbt".to_string(),
            project_dir: PathBuf::from("dbt"),
            profiles_dir: PathBuf::from("dbt"),
            target: "prod".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            warehouse: WarehouseConfig::default(),
            dbt: DbtConfig::default(),
            user: None,
            tag_with_user: false,
            protected_schema_keywords: ["meta", "policies", "alert", "task"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            strict_expiry_tags: false,
        }
    }
}

impl Config {
    /// Load configuration: explicit file, else `vdc.json` found walking up from
    /// the current directory, else defaults. Env overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let current_dir = std::env::current_dir()?;
                match Self::find_config_file(&current_dir) {
                    Some(path) => Self::from_file(&path)?,
                    None => {
                        log::debug!("No {} found, using defaults", CONFIG_FILE_NAME);
                        Self::default()
                    }
                }
            }
        };

        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            VdcError::config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        let mut config: Config = serde_json::from_str(&content).map_err(|e| {
            VdcError::config(format!("Invalid config '{}': {}", path.display(), e))
        })?;

        // Relative paths in the file are relative to the file itself
        if let Some(base) = path.parent() {
            config.rebase_paths(base);
        }

        log::info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Find `vdc.json` by walking up the directory tree
    fn find_config_file(start: &Path) -> Option<PathBuf> {
        let mut current = start;
        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    fn rebase_paths(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() && !base.as_os_str().is_empty() {
                *p = base.join(&*p);
            }
        };
        if let Some(db) = self.warehouse.database.as_mut() {
            rebase(db);
        }
        for attached in &mut self.warehouse.attach {
            rebase(&mut attached.path);
        }
        rebase(&mut self.dbt.project_dir);
        rebase(&mut self.dbt.profiles_dir);
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(WAREHOUSE_ENV).filter(|v| !v.trim().is_empty()) {
            self.warehouse.database = Some(PathBuf::from(path));
        }
        if self.user.is_none() {
            self.user = USER_ENV
                .iter()
                .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()));
        }
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        let mut aliases = HashSet::new();
        for attached in &self.warehouse.attach {
            let alias = attached.alias.trim().to_lowercase();
            if alias.is_empty() {
                return Err(VdcError::config("Attached database alias must not be empty"));
            }
            if !alias.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(VdcError::config(format!(
                    "Attached database alias '{}' may only contain letters, digits and '_'",
                    attached.alias
                )));
            }
            if !aliases.insert(alias) {
                return Err(VdcError::config(format!(
                    "Attached database alias '{}' is used more than once",
                    attached.alias
                )));
            }
        }
        if self.dbt.target.trim().is_empty() {
            return Err(VdcError::config("dbt target must not be empty"));
        }
        Ok(())
    }

    /// Tag inserted into marked names, when enabled and a user is known
    pub fn user_tag(&self) -> Option<String> {
        if !self.tag_with_user {
            return None;
        }
        let user = self.user.as_deref()?;
        let local = user.split('@').next().unwrap_or(user);
        let tag: String = local
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let tag = tag.trim_matches('_').to_string();
        if tag.is_empty() {
            None
        } else {
            Some(tag)
        }
    }
}
