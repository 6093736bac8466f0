//! Backup, restore and retention for managed dedicated servers.
//!
//! Each server's backups live in `{backup_root}/{server_id}` as flat files whose
//! names carry the category and a `YYYYMMDD_HHMMSS` timestamp; the directory
//! listing (by modification time) is the only index.

pub mod aggregate;
pub mod artifact;
pub mod category;
pub mod codec;
pub mod config_file;
pub mod errors;
pub mod instance;
pub mod lifecycle;
pub mod lock;
pub mod manager;
pub mod offload;
pub mod prune;
pub mod settings;
pub mod timestamp;
pub mod world;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::{BackupReport, ComponentFailure, ComponentMap, ComponentOutcome, RestoreReport};
pub use artifact::{BackupArtifact, MatchFilter};
pub use category::BackupCategory;
pub use codec::TarGzWorldCodec;
pub use errors::{BackupError, ErrorKind};
pub use instance::ServerInstance;
pub use lifecycle::{GuardOptions, RestartPolicy, ServerSupervisor, SupervisorError, run_guarded};
pub use manager::{BackupManager, OperationOptions};
pub use prune::{PruneOutcome, prune_backups};
pub use settings::{BackupOverrides, BackupSettings, load_settings};
pub use world::ArchiveCodec;
