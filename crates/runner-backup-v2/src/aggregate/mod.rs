//! Whole-server backup and restore across every [`BackupCategory`].
//!
//! Components run one after another. A failing component is recorded and the
//! rest still run; the caller learns exactly which parts succeeded from the
//! returned report (or the report carried inside the aggregate error).

mod backup;
mod restore;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

use crate::category::BackupCategory;
use crate::errors::{BackupError, ErrorKind};
use crate::prune::PruneOutcome;

pub use backup::{backup_all, backup_component};
pub use restore::{category_of_artifact, restore_all, restore_artifact};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComponentOutcome {
    Succeeded { artifact: PathBuf },
    Skipped { reason: String },
    Failed { kind: ErrorKind, message: String },
}

impl ComponentOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ComponentOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ComponentOutcome::Skipped { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentFailure {
    pub category: BackupCategory,
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome per category, iterated in restore order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ComponentMap(BTreeMap<BackupCategory, ComponentOutcome>);

impl ComponentMap {
    pub fn get(&self, category: BackupCategory) -> Option<&ComponentOutcome> {
        self.0.get(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BackupCategory, &ComponentOutcome)> {
        self.0.iter().map(|(category, outcome)| (*category, outcome))
    }

    pub fn artifact(&self, category: BackupCategory) -> Option<&Path> {
        match self.0.get(&category) {
            Some(ComponentOutcome::Succeeded { artifact }) => Some(artifact),
            _ => None,
        }
    }

    pub fn failures(&self) -> Vec<ComponentFailure> {
        self.0
            .iter()
            .filter_map(|(category, outcome)| match outcome {
                ComponentOutcome::Failed { kind, message } => Some(ComponentFailure {
                    category: *category,
                    kind: *kind,
                    message: message.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.0.values().any(ComponentOutcome::is_failed)
    }

    pub fn any_succeeded(&self) -> bool {
        self.0
            .values()
            .any(|outcome| matches!(outcome, ComponentOutcome::Succeeded { .. }))
    }

    /// `allowlist (file_operation), world (codec)`
    pub fn failure_summary(&self) -> String {
        self.failures()
            .iter()
            .map(|failure| format!("{} ({})", failure.category, failure.kind))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(crate) fn record(
        &mut self,
        category: BackupCategory,
        result: Result<PathBuf, BackupError>,
    ) {
        let outcome = match result {
            Ok(artifact) => ComponentOutcome::Succeeded { artifact },
            Err(err) => {
                warn!(component = %category, "component failed: {err}");
                ComponentOutcome::Failed {
                    kind: err.kind(),
                    message: err.to_string(),
                }
            }
        };
        self.0.insert(category, outcome);
    }

    pub(crate) fn skip(&mut self, category: BackupCategory, reason: impl Into<String>) {
        self.0.insert(
            category,
            ComponentOutcome::Skipped {
                reason: reason.into(),
            },
        );
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub server_id: String,
    pub backup_dir: PathBuf,
    pub components: ComponentMap,
    /// Filled in when retention runs after the backup.
    pub retention: BTreeMap<BackupCategory, PruneOutcome>,
    pub retention_errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub server_id: String,
    pub backup_dir: PathBuf,
    pub components: ComponentMap,
    pub world_name: Option<String>,
}
