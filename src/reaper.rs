//! Removal reaping: find marked objects past their removal month and drop them

use crate::catalog::{Inventory, ObjectKind, WarehouseObject};
use crate::error::Result;
use crate::expiry::{classify, ExpiryStatus};
use chrono::NaiveDate;
use std::collections::HashSet;

/// Objects past expiry, per kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReapCandidates {
    pub databases: Vec<WarehouseObject>,
    pub schemas: Vec<WarehouseObject>,
    pub tables: Vec<WarehouseObject>,
    pub views: Vec<WarehouseObject>,
}

impl ReapCandidates {
    /// Classify every inventory object against `compare_date`.
    ///
    /// Malformed tags are kept unless `strict_tags` is set.
    pub fn from_inventory(inventory: &Inventory, compare_date: NaiveDate, strict_tags: bool) -> Self {
        let pick = |objects: &[WarehouseObject]| -> Vec<WarehouseObject> {
            objects
                .iter()
                .filter(|object| is_past_expiry(object, compare_date, strict_tags))
                .cloned()
                .collect()
        };

        Self {
            databases: pick(&inventory.databases),
            schemas: pick(&inventory.schemas),
            tables: pick(&inventory.tables),
            views: pick(&inventory.views),
        }
    }

    pub fn len(&self) -> usize {
        self.databases.len() + self.schemas.len() + self.tables.len() + self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_past_expiry(object: &WarehouseObject, compare_date: NaiveDate, strict_tags: bool) -> bool {
    match classify(object.object_name(), compare_date) {
        ExpiryStatus::Expired(_) => true,
        ExpiryStatus::Unmarked | ExpiryStatus::Pending(_) => false,
        ExpiryStatus::Malformed(reason) => {
            if strict_tags {
                log::warn!(
                    "Skipping {} {} with malformed expiry tag: {}",
                    object.kind.keyword(),
                    object,
                    reason
                );
                false
            } else {
                log::warn!(
                    "Malformed expiry tag on {} {} ({}), treating as expired",
                    object.kind.keyword(),
                    object,
                    reason
                );
                true
            }
        }
    }
}

/// Objects chosen for removal, per kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReapSelection {
    pub databases: Vec<WarehouseObject>,
    pub schemas: Vec<WarehouseObject>,
    pub tables: Vec<WarehouseObject>,
    pub views: Vec<WarehouseObject>,
}

impl ReapSelection {
    pub fn len(&self) -> usize {
        self.databases.len() + self.schemas.len() + self.tables.len() + self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop statements: databases, then schemas, tables, views
    pub fn statements(&self) -> Vec<String> {
        self.databases
            .iter()
            .chain(&self.schemas)
            .chain(&self.tables)
            .chain(&self.views)
            .map(drop_statement)
            .collect()
    }
}

/// `drop <kind> <name>`; containers take their contents with them
pub fn drop_statement(object: &WarehouseObject) -> String {
    match object.kind {
        ObjectKind::Database | ObjectKind::Schema => {
            format!("drop {} {} cascade", object.kind.keyword(), object.fqn())
        }
        ObjectKind::Table | ObjectKind::View => {
            format!("drop {} {}", object.kind.keyword(), object.fqn())
        }
    }
}

/// Objects whose database or schema is not already selected
pub fn exclude_children(
    objects: &[WarehouseObject],
    selected_databases: &[WarehouseObject],
    selected_schemas: &[WarehouseObject],
) -> Vec<WarehouseObject> {
    let databases: HashSet<String> = selected_databases.iter().map(|d| d.database_key()).collect();
    let schemas: HashSet<String> = selected_schemas
        .iter()
        .filter_map(|s| s.schema_key())
        .collect();

    objects
        .iter()
        .filter(|object| {
            if object.kind != ObjectKind::Database && databases.contains(&object.database_key()) {
                return false;
            }
            if matches!(object.kind, ObjectKind::Table | ObjectKind::View) {
                if let Some(key) = object.schema_key() {
                    return !schemas.contains(&key);
                }
            }
            true
        })
        .cloned()
        .collect()
}

/// Walk the hierarchy top-down, letting `choose` pick from what is offered at
/// each level. Kinds with nothing left to offer are skipped.
pub fn select<F>(candidates: &ReapCandidates, mut choose: F) -> Result<ReapSelection>
where
    F: FnMut(ObjectKind, &[WarehouseObject]) -> Result<Vec<WarehouseObject>>,
{
    let mut selection = ReapSelection::default();
    let mut offer = |kind: ObjectKind, offered: Vec<WarehouseObject>| -> Result<Vec<WarehouseObject>> {
        if offered.is_empty() {
            return Ok(Vec::new());
        }
        choose(kind, &offered)
    };

    selection.databases = offer(ObjectKind::Database, candidates.databases.clone())?;
    selection.schemas = offer(
        ObjectKind::Schema,
        exclude_children(&candidates.schemas, &selection.databases, &[]),
    )?;
    selection.tables = offer(
        ObjectKind::Table,
        exclude_children(&candidates.tables, &selection.databases, &selection.schemas),
    )?;
    selection.views = offer(
        ObjectKind::View,
        exclude_children(&candidates.views, &selection.databases, &selection.schemas),
    )?;

    Ok(selection)
}

/// Select every offered candidate; what a dry run reports
pub fn reap(compare_date: NaiveDate, inventory: &Inventory, strict_tags: bool) -> Result<ReapSelection> {
    let candidates = ReapCandidates::from_inventory(inventory, compare_date, strict_tags);
    let all = |_: ObjectKind, offered: &[WarehouseObject]| Ok(offered.to_vec());
    select(&candidates, all)
}
