use std::sync::Arc;

use tokio::task::{self, JoinHandle};

use crate::aggregate::{BackupReport, RestoreReport};
use crate::errors::BackupError;
use crate::instance::ServerInstance;
use crate::manager::{BackupManager, OperationOptions};

/// Run a full backup on the blocking pool so async callers (the daemon's RPC
/// handlers) are not stalled by archive I/O. Must be called inside a tokio runtime.
pub fn spawn_backup_all(
    manager: Arc<BackupManager>,
    instance: ServerInstance,
    options: OperationOptions,
) -> JoinHandle<Result<BackupReport, BackupError>> {
    task::spawn_blocking(move || manager.backup_all(&instance, &options))
}

pub fn spawn_restore_all(
    manager: Arc<BackupManager>,
    instance: ServerInstance,
    options: OperationOptions,
) -> JoinHandle<Result<RestoreReport, BackupError>> {
    task::spawn_blocking(move || manager.restore_all(&instance, &options))
}
