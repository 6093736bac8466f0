use std::path::Path;

use tracing::{info, warn};

use super::{ComponentMap, RestoreReport};
use crate::artifact::latest_artifact;
use crate::category::{BackupCategory, parse_config_backup_name};
use crate::config_file::restore_config_file;
use crate::errors::BackupError;
use crate::instance::ServerInstance;
use crate::world::{ArchiveCodec, restore_world};

/// Which tracked category a backup file belongs to, judged by its name.
pub fn category_of_artifact(artifact: &Path) -> Result<BackupCategory, BackupError> {
    let file_name = artifact
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| BackupError::input(format!("unusable file name: {}", artifact.display())))?;
    if BackupCategory::World.owns_artifact(file_name) {
        return Ok(BackupCategory::World);
    }
    let original = parse_config_backup_name(file_name)
        .ok_or_else(|| BackupError::input(format!("{file_name} is not a recognised backup file")))?;
    BackupCategory::from_live_file_name(&original)
        .ok_or_else(|| BackupError::input(format!("{original} is not a tracked config file")))
}

/// Restore one specific backup file into `instance`.
pub fn restore_artifact(
    instance: &ServerInstance,
    artifact: &Path,
    codec: &dyn ArchiveCodec,
) -> Result<RestoreReport, BackupError> {
    instance.validate()?;
    let category = category_of_artifact(artifact)?;
    let mut report = RestoreReport {
        server_id: instance.server_id.clone(),
        backup_dir: artifact.parent().map(Path::to_path_buf).unwrap_or_default(),
        components: ComponentMap::default(),
        world_name: None,
    };
    restore_one(instance, category, artifact, codec, &mut report)?;
    report.components.record(category, Ok(artifact.to_path_buf()));
    Ok(report)
}

/// Restore the newest backup of every category found in `backup_dir`.
///
/// Categories without backups are skipped. Every category is attempted even
/// after a failure; already-restored components are not rolled back.
pub fn restore_all(
    instance: &ServerInstance,
    backup_dir: &Path,
    codec: &dyn ArchiveCodec,
) -> Result<RestoreReport, BackupError> {
    instance.validate()?;
    info!(server = %instance.server_id, "restoring latest backups from {}", backup_dir.display());

    let mut report = RestoreReport {
        server_id: instance.server_id.clone(),
        backup_dir: backup_dir.to_path_buf(),
        components: ComponentMap::default(),
        world_name: None,
    };

    for category in BackupCategory::ALL {
        let artifact = match latest_artifact(backup_dir, category) {
            Ok(Some(path)) => path,
            Ok(None) => {
                info!(server = %instance.server_id, "no {category} backup found; skipping");
                report.components.skip(category, "no backup found");
                continue;
            }
            Err(err) => {
                report.components.record(category, Err(err));
                continue;
            }
        };
        let result =
            restore_one(instance, category, &artifact, codec, &mut report).map(|()| artifact);
        report.components.record(category, result);
    }

    if report.components.has_failures() {
        warn!(
            server = %instance.server_id,
            "restore incomplete: {}",
            report.components.failure_summary()
        );
        return Err(BackupError::AggregateRestore(Box::new(report)));
    }
    if !report.components.any_succeeded() {
        warn!(server = %instance.server_id, "no backups found to restore");
    }
    Ok(report)
}

fn restore_one(
    instance: &ServerInstance,
    category: BackupCategory,
    artifact: &Path,
    codec: &dyn ArchiveCodec,
    report: &mut RestoreReport,
) -> Result<(), BackupError> {
    match category {
        BackupCategory::World => {
            let world_name =
                restore_world(codec, &instance.server_id, artifact, &instance.install_root)?;
            report.world_name = Some(world_name);
        }
        _ => {
            restore_config_file(artifact, &instance.install_root)?;
        }
    }
    Ok(())
}
