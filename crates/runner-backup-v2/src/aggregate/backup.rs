use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{BackupReport, ComponentMap};
use crate::category::BackupCategory;
use crate::config_file::backup_config_file;
use crate::errors::BackupError;
use crate::instance::ServerInstance;
use crate::world::{ArchiveCodec, backup_world};

/// Back up one category of `instance` into `backup_dir`.
pub fn backup_component(
    instance: &ServerInstance,
    category: BackupCategory,
    backup_dir: &Path,
    codec: &dyn ArchiveCodec,
) -> Result<PathBuf, BackupError> {
    match instance.live_file(category) {
        Some(source) => backup_config_file(&source, backup_dir),
        None => {
            let world_name = instance.world_name()?;
            backup_world(codec, &instance.world_dir(&world_name), &world_name, backup_dir)
        }
    }
}

/// Back up the world and every tracked config file of `instance` into `backup_dir`.
///
/// Config files missing from the server are skipped. The call only fails as a
/// whole when the world backup failed and nothing else succeeded.
pub fn backup_all(
    instance: &ServerInstance,
    backup_dir: &Path,
    codec: &dyn ArchiveCodec,
) -> Result<BackupReport, BackupError> {
    instance.validate()?;
    info!(server = %instance.server_id, "starting full backup into {}", backup_dir.display());

    let mut components = ComponentMap::default();
    components.record(
        BackupCategory::World,
        backup_component(instance, BackupCategory::World, backup_dir, codec),
    );

    for category in BackupCategory::CONFIG_FILES {
        let Some(source) = instance.live_file(category) else {
            continue;
        };
        if !source.is_file() {
            info!(server = %instance.server_id, "{} not present; skipping", source.display());
            components.skip(category, "file not present on the server");
            continue;
        }
        components.record(category, backup_config_file(&source, backup_dir));
    }

    let report = BackupReport {
        server_id: instance.server_id.clone(),
        backup_dir: backup_dir.to_path_buf(),
        components,
        retention: BTreeMap::new(),
        retention_errors: Vec::new(),
    };

    let world_failed = report
        .components
        .get(BackupCategory::World)
        .is_some_and(|outcome| outcome.is_failed());
    if world_failed && !report.components.any_succeeded() {
        return Err(BackupError::AggregateBackup(Box::new(report)));
    }
    if report.components.has_failures() {
        warn!(
            server = %instance.server_id,
            "backup finished with failures: {}",
            report.components.failure_summary()
        );
    } else {
        info!(server = %instance.server_id, "backup finished");
    }
    Ok(report)
}
