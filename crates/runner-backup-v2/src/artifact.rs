use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::category::BackupCategory;
use crate::errors::BackupError;

/// Glob-equivalent `{prefix}*{.extension}` over plain file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchFilter {
    prefix: String,
    extension: String,
}

impl MatchFilter {
    /// Unfiltered whole-directory matching is refused.
    pub fn new(
        prefix: impl Into<String>,
        extension: impl Into<String>,
    ) -> Result<Self, BackupError> {
        let prefix = prefix.into();
        let extension = extension.into();
        if prefix.is_empty() && extension.trim_start_matches('.').is_empty() {
            return Err(BackupError::input(
                "a prefix or an extension is required to select backup files",
            ));
        }
        Ok(Self::from_parts(prefix, &extension))
    }

    pub(crate) fn from_parts(prefix: impl Into<String>, extension: &str) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn pattern(&self) -> String {
        format!("{}*{}", self.prefix, self.suffix())
    }

    pub fn matches(&self, file_name: &str) -> bool {
        // A leading wildcard does not match dotfiles (lock files live there).
        if self.prefix.is_empty() && file_name.starts_with('.') {
            return false;
        }
        let suffix = self.suffix();
        file_name.len() >= self.prefix.len() + suffix.len()
            && file_name.starts_with(&self.prefix)
            && file_name.ends_with(&suffix)
    }

    fn suffix(&self) -> String {
        if self.extension.is_empty() {
            String::new()
        } else {
            format!(".{}", self.extension)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MatchedFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Regular files in `directory` matching `filter`, newest first.
///
/// Modification time is the only ordering signal; equal times fall back to the
/// file name so same-second copies of an unchanged file still order by their
/// embedded timestamp. A missing directory yields nothing.
pub(crate) fn scan(
    directory: &Path,
    filter: &MatchFilter,
) -> Result<Vec<MatchedFile>, BackupError> {
    if !directory.exists() {
        return Ok(Vec::new());
    }
    if !directory.is_dir() {
        return Err(BackupError::not_a_directory(directory));
    }

    let mut files = Vec::new();
    let entries = fs::read_dir(directory)
        .map_err(|err| BackupError::io("listing", directory, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| BackupError::io("listing", directory, err))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !filter.matches(name) {
            continue;
        }
        let path = entry.path();
        // Dangling links and files removed since the listing are not backups.
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(BackupError::io("reading metadata of", &path, err)),
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata
            .modified()
            .map_err(|err| BackupError::io("reading modification time of", &path, err))?;
        files.push(MatchedFile { path, modified });
    }

    files.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.path.cmp(&a.path))
    });
    Ok(files)
}

/// A backup file discovered on disk.
#[derive(Debug, Clone, Serialize)]
pub struct BackupArtifact {
    pub category: BackupCategory,
    pub path: PathBuf,
    pub modified_at: DateTime<Local>,
}

/// Artifacts of `category` in `backup_dir`, newest first.
pub fn list_artifacts(
    backup_dir: &Path,
    category: BackupCategory,
) -> Result<Vec<BackupArtifact>, BackupError> {
    let filter = category.selection_filter();
    let artifacts = scan(backup_dir, &filter)?
        .into_iter()
        .filter(|file| {
            file.path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| category.owns_artifact(name))
        })
        .map(|file| BackupArtifact {
            category,
            path: file.path,
            modified_at: DateTime::<Local>::from(file.modified),
        })
        .collect();
    Ok(artifacts)
}

/// The most recently modified artifact of `category`, if any.
pub fn latest_artifact(
    backup_dir: &Path,
    category: BackupCategory,
) -> Result<Option<PathBuf>, BackupError> {
    Ok(list_artifacts(backup_dir, category)?
        .into_iter()
        .next()
        .map(|artifact| artifact.path))
}
