use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use runner_v2_utils::ensure_dir;
use tracing::info;

use crate::category::{config_backup_file_name, parse_config_backup_name};
use crate::errors::BackupError;
use crate::timestamp::timestamp;

/// Copy `source` to `{destination_dir}/{stem}_backup_{timestamp}{ext}`.
///
/// Permissions and modification time are carried over from the live file.
pub fn backup_config_file(source: &Path, destination_dir: &Path) -> Result<PathBuf, BackupError> {
    if source.as_os_str().is_empty() {
        return Err(BackupError::input("config file path is empty"));
    }
    if destination_dir.as_os_str().is_empty() {
        return Err(BackupError::input("backup directory is empty"));
    }
    if !source.is_file() {
        return Err(BackupError::NotFound {
            what: "config file",
            path: source.to_path_buf(),
        });
    }
    let file_name = source
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| BackupError::input(format!("unusable file name: {}", source.display())))?;

    ensure_dir(destination_dir)
        .map_err(|err| BackupError::io("creating backup directory", destination_dir, err))?;
    let artifact = destination_dir.join(config_backup_file_name(file_name, &timestamp())?);

    fs::copy(source, &artifact).map_err(|err| BackupError::io("copying", source, err))?;
    let metadata =
        fs::metadata(source).map_err(|err| BackupError::io("reading metadata of", source, err))?;
    filetime::set_file_times(
        &artifact,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )
    .map_err(|err| BackupError::io("copying timestamps to", &artifact, err))?;

    info!("config backup created: {}", artifact.display());
    Ok(artifact)
}

/// Copy a config backup over its live file in `target_dir`. Returns the live path.
pub fn restore_config_file(artifact: &Path, target_dir: &Path) -> Result<PathBuf, BackupError> {
    let file_name = artifact
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| BackupError::input(format!("unusable file name: {}", artifact.display())))?;
    let original = parse_config_backup_name(file_name).ok_or_else(|| {
        BackupError::input(format!(
            "{file_name} is not a config backup name ({{name}}_backup_YYYYMMDD_HHMMSS{{ext}})"
        ))
    })?;
    if !artifact.is_file() {
        return Err(BackupError::NotFound {
            what: "backup file",
            path: artifact.to_path_buf(),
        });
    }

    ensure_dir(target_dir).map_err(|err| BackupError::io("creating", target_dir, err))?;
    let live = target_dir.join(original);
    fs::copy(artifact, &live).map_err(|err| BackupError::io("restoring", &live, err))?;

    info!("restored {} from {}", live.display(), artifact.display());
    Ok(live)
}
