use std::path::{Path, PathBuf};

use runner_v2_utils::ensure_dir;
use tracing::info;

use crate::category::world_backup_file_name;
use crate::errors::BackupError;
use crate::timestamp::timestamp;

/// Serializes a world directory to a single archive file and back.
pub trait ArchiveCodec: Send + Sync {
    fn export(&self, world_dir: &Path, destination: &Path) -> Result<(), BackupError>;

    /// Unpack `archive` into the server at `install_root`; returns the world's name.
    fn import(
        &self,
        server_id: &str,
        archive: &Path,
        install_root: &Path,
    ) -> Result<String, BackupError>;
}

pub fn backup_world(
    codec: &dyn ArchiveCodec,
    world_dir: &Path,
    world_name: &str,
    destination_dir: &Path,
) -> Result<PathBuf, BackupError> {
    if world_name.is_empty() {
        return Err(BackupError::input("world name is empty"));
    }
    if !world_dir.is_dir() {
        return Err(BackupError::Directory {
            path: world_dir.to_path_buf(),
            reason: "world directory does not exist".into(),
        });
    }
    ensure_dir(destination_dir)
        .map_err(|err| BackupError::io("creating backup directory", destination_dir, err))?;

    let artifact = destination_dir.join(world_backup_file_name(world_name, &timestamp()));
    codec.export(world_dir, &artifact)?;

    info!("world backup created: {}", artifact.display());
    Ok(artifact)
}

pub fn restore_world(
    codec: &dyn ArchiveCodec,
    server_id: &str,
    archive: &Path,
    install_root: &Path,
) -> Result<String, BackupError> {
    if !archive.is_file() {
        return Err(BackupError::NotFound {
            what: "world archive",
            path: archive.to_path_buf(),
        });
    }
    let world_name = codec.import(server_id, archive, install_root)?;
    info!(server = server_id, world = %world_name, "world restored from {}", archive.display());
    Ok(world_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::testing::write;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCodec {
        exported: Mutex<Vec<(PathBuf, PathBuf)>>,
        fail: bool,
    }

    impl ArchiveCodec for RecordingCodec {
        fn export(&self, world_dir: &Path, destination: &Path) -> Result<(), BackupError> {
            if self.fail {
                return Err(BackupError::Codec("disk full".into()));
            }
            self.exported
                .lock()
                .expect("lock")
                .push((world_dir.to_path_buf(), destination.to_path_buf()));
            std::fs::write(destination, b"archive")
                .map_err(|err| BackupError::io("writing", destination, err))
        }

        fn import(&self, _: &str, _: &Path, _: &Path) -> Result<String, BackupError> {
            Ok("Imported".into())
        }
    }

    #[test]
    fn writer_names_the_artifact_after_the_world() {
        let root = tempfile::tempdir().expect("temp dir");
        let world = root.path().join("worlds").join("Alpha");
        write(&world, "level.dat", b"x");
        let codec = RecordingCodec::default();

        let artifact =
            backup_world(&codec, &world, "Alpha", &root.path().join("backups")).expect("backup");
        let name = artifact.file_name().and_then(|n| n.to_str()).expect("name");
        assert!(name.starts_with("Alpha_backup_"));
        assert!(name.ends_with(".mcworld"));
        assert_eq!(codec.exported.lock().expect("lock")[0], (world, artifact));
    }

    #[test]
    fn missing_world_directory_is_a_directory_error() {
        let root = tempfile::tempdir().expect("temp dir");
        let codec = RecordingCodec::default();
        let err = backup_world(&codec, &root.path().join("nope"), "nope", root.path())
            .expect_err("missing world");
        assert_eq!(err.kind(), ErrorKind::Directory);
        assert!(codec.exported.lock().expect("lock").is_empty());
    }

    #[test]
    fn codec_errors_pass_through_unchanged() {
        let root = tempfile::tempdir().expect("temp dir");
        let world = root.path().join("w");
        write(&world, "level.dat", b"x");
        let codec = RecordingCodec {
            fail: true,
            ..Default::default()
        };
        let err = backup_world(&codec, &world, "w", root.path()).expect_err("codec failure");
        assert!(matches!(err, BackupError::Codec(ref msg) if msg == "disk full"));
    }

    #[test]
    fn restore_requires_the_archive() {
        let root = tempfile::tempdir().expect("temp dir");
        let codec = RecordingCodec::default();
        let err = restore_world(&codec, "alpha", &root.path().join("x.mcworld"), root.path())
            .expect_err("missing archive");
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let archive = write(root.path(), "x_backup_20240101_120000.mcworld", b"a");
        let name = restore_world(&codec, "alpha", &archive, root.path()).expect("restore");
        assert_eq!(name, "Imported");
    }
}
