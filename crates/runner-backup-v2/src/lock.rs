use fs2::FileExt;
use std::{fs::File, fs::OpenOptions, path::Path, path::PathBuf};

use runner_v2_utils::ensure_dir;

use crate::errors::BackupError;

/// Held for the duration of one backup/restore call; released on drop.
pub struct ServerLock {
    _file: File,
    path: PathBuf,
}

impl ServerLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn acquire_server_lock(backup_root: &Path, server_id: &str) -> Result<ServerLock, BackupError> {
    ensure_dir(backup_root).map_err(|err| BackupError::io("creating", backup_root, err))?;
    let path = backup_root.join(format!(".{server_id}.lock"));
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&path)
        .map_err(|err| BackupError::io("opening lock file", &path, err))?;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(ServerLock { _file: file, path }),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
            Err(BackupError::Busy(server_id.to_string()))
        }
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            Err(BackupError::Busy(server_id.to_string()))
        }
        Err(e) => Err(BackupError::io("locking", &path, e)),
    }
}
