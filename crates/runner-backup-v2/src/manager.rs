use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::aggregate::{self, BackupReport, ComponentOutcome, RestoreReport};
use crate::artifact::{BackupArtifact, MatchFilter, list_artifacts};
use crate::category::{BackupCategory, WORLD_EXTENSION};
use crate::codec::TarGzWorldCodec;
use crate::errors::BackupError;
use crate::instance::ServerInstance;
use crate::lifecycle::{GuardOptions, RestartPolicy, ServerSupervisor, run_guarded};
use crate::lock::acquire_server_lock;
use crate::prune::{PruneOutcome, prune};
use crate::settings::{BackupOverrides, BackupSettings};
use crate::world::ArchiveCodec;

#[derive(Debug, Clone, Default)]
pub struct OperationOptions {
    pub overrides: BackupOverrides,
    /// Stop a running server for the call and bring it back afterwards.
    pub stop_server: bool,
}

impl OperationOptions {
    pub fn stopping_server() -> Self {
        Self {
            stop_server: true,
            ..Self::default()
        }
    }
}

/// Entry points for backup, restore and retention of managed servers.
///
/// Every call holds the server's lock file for its whole duration, so two
/// operations on one server never interleave.
pub struct BackupManager {
    settings: BackupSettings,
    codec: Arc<dyn ArchiveCodec>,
    supervisor: Arc<dyn ServerSupervisor>,
}

impl BackupManager {
    pub fn new(
        settings: BackupSettings,
        codec: Arc<dyn ArchiveCodec>,
        supervisor: Arc<dyn ServerSupervisor>,
    ) -> Self {
        Self {
            settings,
            codec,
            supervisor,
        }
    }

    pub fn with_default_codec(
        settings: BackupSettings,
        supervisor: Arc<dyn ServerSupervisor>,
    ) -> Self {
        Self::new(settings, Arc::new(TarGzWorldCodec), supervisor)
    }

    pub fn settings(&self) -> &BackupSettings {
        &self.settings
    }

    pub fn backup_all(
        &self,
        instance: &ServerInstance,
        options: &OperationOptions,
    ) -> Result<BackupReport, BackupError> {
        let settings = self.resolve(instance, &options.overrides)?;
        let _lock = acquire_server_lock(&settings.backup_dir, &instance.server_id)?;
        let backup_dir = instance.backup_dir(&settings.backup_dir);

        let mut report = run_guarded(
            self.supervisor.as_ref(),
            &instance.server_id,
            guard(options, RestartPolicy::Always),
            || aggregate::backup_all(instance, &backup_dir, self.codec.as_ref()),
        )?;

        let succeeded: Vec<_> = report
            .components
            .iter()
            .filter(|(_, outcome)| matches!(outcome, ComponentOutcome::Succeeded { .. }))
            .map(|(category, _)| category)
            .collect();
        for category in succeeded {
            match prune_category(instance, category, &backup_dir, settings.backup_keep) {
                Ok(outcome) => {
                    report.retention.insert(category, outcome);
                }
                Err(err) => {
                    warn!(
                        server = %instance.server_id,
                        component = %category,
                        "retention failed: {err}"
                    );
                    report.retention_errors.push(format!("{category}: {err}"));
                }
            }
        }
        Ok(report)
    }

    /// Back up a single category and apply retention to it.
    pub fn backup_component(
        &self,
        instance: &ServerInstance,
        category: BackupCategory,
        options: &OperationOptions,
    ) -> Result<PathBuf, BackupError> {
        let settings = self.resolve(instance, &options.overrides)?;
        let _lock = acquire_server_lock(&settings.backup_dir, &instance.server_id)?;
        let backup_dir = instance.backup_dir(&settings.backup_dir);

        let artifact = run_guarded(
            self.supervisor.as_ref(),
            &instance.server_id,
            guard(options, RestartPolicy::Always),
            || aggregate::backup_component(instance, category, &backup_dir, self.codec.as_ref()),
        )?;

        if let Err(err) = prune_category(instance, category, &backup_dir, settings.backup_keep) {
            warn!(server = %instance.server_id, component = %category, "retention failed: {err}");
        }
        Ok(artifact)
    }

    pub fn restore_all(
        &self,
        instance: &ServerInstance,
        options: &OperationOptions,
    ) -> Result<RestoreReport, BackupError> {
        let settings = self.resolve(instance, &options.overrides)?;
        let _lock = acquire_server_lock(&settings.backup_dir, &instance.server_id)?;
        let backup_dir = instance.backup_dir(&settings.backup_dir);

        run_guarded(
            self.supervisor.as_ref(),
            &instance.server_id,
            guard(options, RestartPolicy::OnSuccess),
            || aggregate::restore_all(instance, &backup_dir, self.codec.as_ref()),
        )
    }

    /// Restore one specific backup file rather than the latest.
    pub fn restore_artifact(
        &self,
        instance: &ServerInstance,
        artifact: &Path,
        options: &OperationOptions,
    ) -> Result<RestoreReport, BackupError> {
        let settings = self.resolve(instance, &options.overrides)?;
        let _lock = acquire_server_lock(&settings.backup_dir, &instance.server_id)?;

        run_guarded(
            self.supervisor.as_ref(),
            &instance.server_id,
            guard(options, RestartPolicy::OnSuccess),
            || aggregate::restore_artifact(instance, artifact, self.codec.as_ref()),
        )
    }

    /// Apply retention to every category.
    ///
    /// All categories are attempted; the first error is returned.
    pub fn prune(
        &self,
        instance: &ServerInstance,
        overrides: &BackupOverrides,
    ) -> Result<BTreeMap<BackupCategory, PruneOutcome>, BackupError> {
        let settings = self.resolve(instance, overrides)?;
        let _lock = acquire_server_lock(&settings.backup_dir, &instance.server_id)?;
        let backup_dir = instance.backup_dir(&settings.backup_dir);

        let mut outcomes = BTreeMap::new();
        let mut first_error = None;
        for category in BackupCategory::ALL {
            match prune_category(instance, category, &backup_dir, settings.backup_keep) {
                Ok(outcome) => {
                    outcomes.insert(category, outcome);
                }
                Err(err) => {
                    warn!(
                        server = %instance.server_id,
                        component = %category,
                        "pruning failed: {err}"
                    );
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(outcomes),
        }
    }

    /// Backups on disk per category, newest first.
    pub fn list_backups(
        &self,
        instance: &ServerInstance,
        overrides: &BackupOverrides,
    ) -> Result<BTreeMap<BackupCategory, Vec<BackupArtifact>>, BackupError> {
        let settings = self.resolve(instance, overrides)?;
        let backup_dir = instance.backup_dir(&settings.backup_dir);
        BackupCategory::ALL
            .into_iter()
            .map(|category| -> Result<_, BackupError> {
                Ok((category, list_artifacts(&backup_dir, category)?))
            })
            .collect()
    }

    fn resolve(
        &self,
        instance: &ServerInstance,
        overrides: &BackupOverrides,
    ) -> Result<BackupSettings, BackupError> {
        instance.validate()?;
        let settings = self.settings.with_overrides(overrides);
        if settings.backup_dir.as_os_str().is_empty() {
            return Err(BackupError::input("backup directory is empty"));
        }
        debug!(
            server = %instance.server_id,
            backup_root = %settings.backup_dir.display(),
            keep = settings.backup_keep,
            "resolved backup settings"
        );
        Ok(settings)
    }
}

fn guard(options: &OperationOptions, restart: RestartPolicy) -> GuardOptions {
    GuardOptions {
        stop_before: options.stop_server,
        restart,
    }
}

/// Worlds are pruned per level name so backups of a previous world are left alone.
fn prune_category(
    instance: &ServerInstance,
    category: BackupCategory,
    backup_dir: &Path,
    keep: usize,
) -> Result<PruneOutcome, BackupError> {
    let filter = match category {
        BackupCategory::World => {
            MatchFilter::new(category.backup_prefix(&instance.world_name()?), WORLD_EXTENSION)?
        }
        _ => category.selection_filter(),
    };
    prune(backup_dir, keep, &filter)
}
