use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::artifact::{MatchFilter, scan};
use crate::errors::BackupError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneOutcome {
    pub kept: usize,
    pub deleted: Vec<PathBuf>,
}

/// Parse a keep-count coming from settings or a caller override.
pub fn parse_keep_count(raw: &str) -> Result<usize, BackupError> {
    let trimmed = raw.trim();
    match trimmed.parse::<i64>() {
        Ok(value) if value >= 0 => usize::try_from(value)
            .map_err(|_| BackupError::input(format!("retention count {value} is too large"))),
        Ok(value) => Err(BackupError::input(format!(
            "retention count must be zero or more, got {value}"
        ))),
        Err(_) => Err(BackupError::input(format!(
            "retention count must be an integer, got {trimmed:?}"
        ))),
    }
}

/// Keep the `keep_count` newest files matching `{prefix}*{.extension}` and delete the rest.
pub fn prune_backups(
    directory: &Path,
    keep_count: usize,
    prefix: &str,
    extension: &str,
) -> Result<PruneOutcome, BackupError> {
    let filter = MatchFilter::new(prefix, extension)?;
    prune(directory, keep_count, &filter)
}

pub fn prune(
    directory: &Path,
    keep_count: usize,
    filter: &MatchFilter,
) -> Result<PruneOutcome, BackupError> {
    prune_with(directory, keep_count, filter, |path| fs::remove_file(path))
}

fn prune_with<R>(
    directory: &Path,
    keep_count: usize,
    filter: &MatchFilter,
    mut remove: R,
) -> Result<PruneOutcome, BackupError>
where
    R: FnMut(&Path) -> io::Result<()>,
{
    if directory.as_os_str().is_empty() {
        return Err(BackupError::input("backup directory is empty"));
    }
    if !directory.exists() {
        debug!(dir = %directory.display(), "backup directory missing; nothing to prune");
        return Ok(PruneOutcome::default());
    }

    let mut files = scan(directory, filter)?;
    if files.len() <= keep_count {
        debug!(
            dir = %directory.display(),
            pattern = %filter.pattern(),
            found = files.len(),
            keep = keep_count,
            "nothing to prune"
        );
        return Ok(PruneOutcome {
            kept: files.len(),
            deleted: Vec::new(),
        });
    }

    let stale = files.split_off(keep_count);
    let attempted = stale.len();
    let mut deleted = Vec::with_capacity(attempted);
    let mut failed = 0;

    for file in stale.into_iter().rev() {
        match remove(&file.path) {
            Ok(()) => deleted.push(file.path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => deleted.push(file.path),
            Err(err) => {
                warn!("failed to delete old backup {}: {}", file.path.display(), err);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(BackupError::Prune {
            directory: directory.to_path_buf(),
            failed,
            attempted,
        });
    }

    info!(
        dir = %directory.display(),
        pattern = %filter.pattern(),
        deleted = deleted.len(),
        "pruned old backups"
    );
    Ok(PruneOutcome {
        kept: files.len(),
        deleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::testing::{set_age, touch};

    fn seed(dir: &Path, count: usize) -> Vec<PathBuf> {
        // index 0 is the oldest
        (0..count)
            .map(|i| {
                let path = touch(dir, &format!("server_backup_2024010{i}_120000.properties"));
                set_age(&path, 1000 - (i as i64) * 10);
                path
            })
            .collect()
    }

    fn remaining(dir: &Path) -> Vec<PathBuf> {
        let mut paths: Vec<_> = fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| entry.expect("entry").path())
            .collect();
        paths.sort();
        paths
    }

    #[test]
    fn keeps_the_newest_and_deletes_the_oldest() {
        let dir = tempfile::tempdir().expect("temp dir");
        let files = seed(dir.path(), 5);

        let outcome = prune_backups(dir.path(), 2, "server_backup_", "properties").expect("prune");

        assert_eq!(outcome.kept, 2);
        assert_eq!(outcome.deleted, files[..3].to_vec());
        assert_eq!(remaining(dir.path()), files[3..].to_vec());
    }

    #[test]
    fn ordering_follows_mtime_not_file_name() {
        let dir = tempfile::tempdir().expect("temp dir");
        let newer_name = touch(dir.path(), "server_backup_20991231_235959.properties");
        let older_name = touch(dir.path(), "server_backup_20000101_000000.properties");
        set_age(&newer_name, 500);
        set_age(&older_name, 5);

        prune_backups(dir.path(), 1, "server_backup_", ".properties").expect("prune");
        assert_eq!(remaining(dir.path()), vec![older_name]);
    }

    #[test]
    fn second_prune_is_a_no_op() {
        let dir = tempfile::tempdir().expect("temp dir");
        seed(dir.path(), 4);
        prune_backups(dir.path(), 1, "server_backup_", "properties").expect("first prune");
        let before = remaining(dir.path());

        let outcome =
            prune_backups(dir.path(), 1, "server_backup_", "properties").expect("second prune");
        assert!(outcome.deleted.is_empty());
        assert_eq!(remaining(dir.path()), before);
    }

    #[test]
    fn keep_count_at_or_above_total_changes_nothing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let files = seed(dir.path(), 3);
        for keep in [3, 10] {
            let outcome = prune_backups(dir.path(), keep, "server_backup_", "").expect("prune");
            assert_eq!(outcome.kept, 3);
            assert!(outcome.deleted.is_empty());
        }
        assert_eq!(remaining(dir.path()), files);
    }

    #[test]
    fn keep_zero_removes_every_match_but_leaves_other_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        seed(dir.path(), 2);
        let unrelated = touch(dir.path(), "server.properties");

        prune_backups(dir.path(), 0, "server_backup_", "properties").expect("prune");
        assert_eq!(remaining(dir.path()), vec![unrelated]);
    }

    #[test]
    fn empty_filter_is_rejected_whatever_the_directory_state() {
        let dir = tempfile::tempdir().expect("temp dir");
        seed(dir.path(), 2);
        let missing = dir.path().join("missing");
        let file = touch(dir.path(), "plain.txt");

        for target in [dir.path(), missing.as_path(), file.as_path()] {
            let err = prune_backups(target, 1, "", "").expect_err("unfiltered prune");
            assert_eq!(err.kind(), ErrorKind::Input);
        }
        assert_eq!(remaining(dir.path()).len(), 3);
    }

    #[test]
    fn missing_directory_is_a_successful_no_op() {
        let dir = tempfile::tempdir().expect("temp dir");
        let outcome = prune_backups(&dir.path().join("absent"), 0, "x", "").expect("prune");
        assert_eq!(outcome, PruneOutcome::default());
    }

    #[test]
    fn file_in_place_of_directory_is_a_directory_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let file = touch(dir.path(), "not-a-dir");
        let err = prune_backups(&file, 1, "x", "").expect_err("directory error");
        assert_eq!(err.kind(), ErrorKind::Directory);
    }

    #[test]
    fn empty_directory_argument_is_an_input_error() {
        let err = prune_backups(Path::new(""), 1, "x", "").expect_err("input error");
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn failed_deletion_does_not_stop_the_others() {
        let dir = tempfile::tempdir().expect("temp dir");
        let files = seed(dir.path(), 5);
        let filter = MatchFilter::new("server_backup_", "properties").expect("filter");
        let stuck = files[1].clone();
        let vanished = files[0].clone();
        let mut tried = Vec::new();

        let err = prune_with(dir.path(), 2, &filter, |path| {
            tried.push(path.to_path_buf());
            if path == stuck {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            if path == vanished {
                fs::remove_file(path)?;
                return Err(io::ErrorKind::NotFound.into());
            }
            fs::remove_file(path)
        })
        .expect_err("one deletion failed");

        assert_eq!(tried, files[..3].to_vec());
        assert_eq!(err.kind(), ErrorKind::FileOperation);
        assert!(matches!(
            err,
            BackupError::Prune {
                failed: 1,
                attempted: 3,
                ..
            }
        ));
        let mut left = vec![stuck];
        left.extend_from_slice(&files[3..]);
        assert_eq!(remaining(dir.path()), left);
    }

    #[test]
    fn keep_counts_must_be_non_negative_integers() {
        assert_eq!(parse_keep_count("3").expect("parse"), 3);
        assert_eq!(parse_keep_count(" 0 ").expect("parse"), 0);
        assert_eq!(parse_keep_count("-1").expect_err("negative").kind(), ErrorKind::Input);
        assert_eq!(parse_keep_count("three").expect_err("text").kind(), ErrorKind::Input);
        assert_eq!(parse_keep_count("").expect_err("empty").kind(), ErrorKind::Input);
    }
}
