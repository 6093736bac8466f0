use std::fs::{self, File};
use std::io;
use std::path::{Component, Path};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use runner_v2_utils::ensure_dir;
use tracing::debug;

use crate::errors::BackupError;
use crate::world::ArchiveCodec;

/// Gzip'd tar holding the world directory as its single top-level entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarGzWorldCodec;

impl ArchiveCodec for TarGzWorldCodec {
    fn export(&self, world_dir: &Path, destination: &Path) -> Result<(), BackupError> {
        let world_name = world_dir
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                BackupError::Codec(format!("unusable world directory: {}", world_dir.display()))
            })?;

        // Write next to the destination, then rename: a partial archive never matches `*.mcworld`.
        let tmp = destination.with_extension("tmp");
        let written = (|| -> io::Result<()> {
            let file = File::create(&tmp)?;
            let mut tar = tar::Builder::new(GzEncoder::new(file, Compression::default()));
            tar.append_dir_all(world_name, world_dir)?;
            tar.into_inner()?.finish()?.sync_all()
        })();
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp);
            return Err(BackupError::io("archiving", world_dir, err));
        }

        fs::rename(&tmp, destination).map_err(|err| BackupError::io("finalizing", destination, err))
    }

    fn import(
        &self,
        server_id: &str,
        archive: &Path,
        install_root: &Path,
    ) -> Result<String, BackupError> {
        let world_name = archive_root(archive)?;
        let worlds = install_root.join("worlds");
        ensure_dir(&worlds).map_err(|err| BackupError::io("creating", &worlds, err))?;

        let target = worlds.join(&world_name);
        if target.exists() {
            debug!(server = server_id, "replacing live world {}", target.display());
            fs::remove_dir_all(&target).map_err(|err| BackupError::io("clearing", &target, err))?;
        }

        let mut tar = open(archive)?;
        tar.unpack(&worlds).map_err(|err| BackupError::io("unpacking", archive, err))?;
        Ok(world_name)
    }
}

fn open(archive: &Path) -> Result<tar::Archive<GzDecoder<File>>, BackupError> {
    let file = File::open(archive).map_err(|err| BackupError::io("opening", archive, err))?;
    Ok(tar::Archive::new(GzDecoder::new(file)))
}

fn unreadable(archive: &Path, err: io::Error) -> BackupError {
    BackupError::Codec(format!("unreadable archive {}: {err}", archive.display()))
}

fn archive_root(archive: &Path) -> Result<String, BackupError> {
    let mut tar = open(archive)?;
    let entries = tar.entries().map_err(|err| unreadable(archive, err))?;

    let mut root: Option<String> = None;
    for entry in entries {
        let entry = entry.map_err(|err| unreadable(archive, err))?;
        let path = entry.path().map_err(|err| {
            BackupError::Codec(format!("bad entry path in {}: {err}", archive.display()))
        })?;
        let first = path.components().find(|c| !matches!(c, Component::CurDir));
        let Some(Component::Normal(name)) = first else {
            return Err(BackupError::Codec(format!(
                "{} has an entry outside of a world directory",
                archive.display()
            )));
        };
        let name = name
            .to_str()
            .ok_or_else(|| BackupError::Codec("world name is not valid UTF-8".into()))?;
        match &root {
            None => root = Some(name.to_string()),
            Some(existing) if existing == name => {}
            Some(existing) => {
                return Err(BackupError::Codec(format!(
                    "{} holds more than one world ({existing}, {name})",
                    archive.display()
                )));
            }
        }
    }

    root.ok_or_else(|| BackupError::Codec(format!("{} is empty", archive.display())))
}
