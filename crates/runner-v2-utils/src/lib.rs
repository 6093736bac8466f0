use std::path::{Path, PathBuf};

pub struct DataPaths {
    pub data_dir: PathBuf,
    pub settings_path: PathBuf,
    pub backup_root: PathBuf,
}

/// Data namespace shared with runnerd so backups live next to its other state.
const APP_DIR: &str = "atlas";
const DAEMON_DIR: &str = "runnerd";

pub fn data_paths_v2() -> DataPaths {
    if let Some(base) = dirs::data_dir() {
        return mk(base.join(APP_DIR).join(DAEMON_DIR));
    }

    // No platform data dir (minimal containers): fall back to a dotdir in $HOME.
    if let Some(home) = dirs::home_dir() {
        return mk(home.join(format!(".{APP_DIR}")).join(DAEMON_DIR));
    }

    // Last resort fallback
    mk(std::env::temp_dir().join(APP_DIR).join(DAEMON_DIR))
}

fn mk(data_dir: PathBuf) -> DataPaths {
    DataPaths {
        settings_path: data_dir.join("backup-settings.json"),
        backup_root: data_dir.join("backups"),
        data_dir,
    }
}

pub fn ensure_dir(p: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_paths_share_one_root() {
        let paths = data_paths_v2();
        assert!(paths.settings_path.starts_with(&paths.data_dir));
        assert!(paths.backup_root.starts_with(&paths.data_dir));
        assert!(paths.data_dir.ends_with(DAEMON_DIR));
    }

    #[test]
    fn ensure_dir_creates_nested_and_is_idempotent() {
        let root = tempfile::tempdir().expect("create temp dir");
        let nested = root.path().join("a").join("b");
        ensure_dir(&nested).expect("create nested");
        ensure_dir(&nested).expect("create nested again");
        assert!(nested.is_dir());
    }
}
