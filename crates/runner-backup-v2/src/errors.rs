use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{BackupReport, RestoreReport};

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("invalid input: {0}")]
    Input(String),

    #[error("{what} not found: {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    #[error("directory error at {}: {reason}", path.display())]
    Directory { path: PathBuf, reason: String },

    #[error("I/O error while {context} {}: {source}", path.display())]
    FileOperation {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pruning {} failed to delete {failed} of {attempted} old backups", directory.display())]
    Prune {
        directory: PathBuf,
        failed: usize,
        attempted: usize,
    },

    #[error("archive codec error: {0}")]
    Codec(String),

    #[error("failed to {action} server {server_id}: {message}")]
    Supervisor {
        action: LifecycleAction,
        server_id: String,
        message: String,
    },

    #[error("server {server_id} was not restarted after the operation: {message}")]
    Restart { server_id: String, message: String },

    #[error("another backup or restore holds the lock for server {0}")]
    Busy(String),

    #[error("settings error: {0}")]
    Settings(String),

    #[error(
        "world backup failed and no other component succeeded: {}",
        .0.components.failure_summary()
    )]
    AggregateBackup(Box<BackupReport>),

    #[error("restore failed for {}", .0.components.failure_summary())]
    AggregateRestore(Box<RestoreReport>),
}

/// Stable classification of [`BackupError`], reported per component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    NotFound,
    Directory,
    FileOperation,
    Codec,
    Supervisor,
    Restart,
    Busy,
    Settings,
    AggregateBackup,
    AggregateRestore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Query,
    Stop,
    Start,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            LifecycleAction::Query => "query",
            LifecycleAction::Stop => "stop",
            LifecycleAction::Start => "start",
        };
        f.write_str(verb)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Input => "input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Directory => "directory",
            ErrorKind::FileOperation => "file_operation",
            ErrorKind::Codec => "codec",
            ErrorKind::Supervisor => "supervisor",
            ErrorKind::Restart => "restart",
            ErrorKind::Busy => "busy",
            ErrorKind::Settings => "settings",
            ErrorKind::AggregateBackup => "aggregate_backup",
            ErrorKind::AggregateRestore => "aggregate_restore",
        };
        f.write_str(name)
    }
}

impl BackupError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub fn io(context: &'static str, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::FileOperation {
            context,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn not_a_directory(path: impl AsRef<Path>) -> Self {
        Self::Directory {
            path: path.as_ref().to_path_buf(),
            reason: "not a directory".into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BackupError::Input(_) => ErrorKind::Input,
            BackupError::NotFound { .. } => ErrorKind::NotFound,
            BackupError::Directory { .. } => ErrorKind::Directory,
            BackupError::FileOperation { .. } | BackupError::Prune { .. } => {
                ErrorKind::FileOperation
            }
            BackupError::Codec(_) => ErrorKind::Codec,
            BackupError::Supervisor { .. } => ErrorKind::Supervisor,
            BackupError::Restart { .. } => ErrorKind::Restart,
            BackupError::Busy(_) => ErrorKind::Busy,
            BackupError::Settings(_) => ErrorKind::Settings,
            BackupError::AggregateBackup(_) => ErrorKind::AggregateBackup,
            BackupError::AggregateRestore(_) => ErrorKind::AggregateRestore,
        }
    }
}
