use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use runner_v2_utils::data_paths_v2;

use crate::errors::BackupError;
use crate::prune::parse_keep_count;

pub const DEFAULT_BACKUP_KEEP: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSettings {
    #[serde(rename = "BACKUP_DIR", default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    #[serde(
        rename = "BACKUP_KEEP",
        default = "default_backup_keep",
        deserialize_with = "deserialize_keep"
    )]
    pub backup_keep: usize,
}

/// Per-call replacements for the configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupOverrides {
    pub backup_dir: Option<PathBuf>,
    pub keep: Option<usize>,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
            backup_keep: DEFAULT_BACKUP_KEEP,
        }
    }
}

impl BackupSettings {
    pub fn with_overrides(&self, overrides: &BackupOverrides) -> BackupSettings {
        BackupSettings {
            backup_dir: overrides
                .backup_dir
                .clone()
                .unwrap_or_else(|| self.backup_dir.clone()),
            backup_keep: overrides.keep.unwrap_or(self.backup_keep),
        }
    }
}

pub fn default_settings_path() -> PathBuf {
    data_paths_v2().settings_path
}

/// Load settings from `path`; a missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<BackupSettings, BackupError> {
    let content = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(BackupSettings::default());
        }
        Err(err) => {
            return Err(BackupError::Settings(format!(
                "Failed to read {}: {err}",
                path.display()
            )));
        }
    };

    let settings = serde_json::from_str::<BackupSettings>(&content)
        .map_err(|err| {
            BackupError::Settings(format!("Failed to parse {}: {err}", path.display()))
        })?;
    if settings.backup_dir.as_os_str().is_empty() {
        return Err(BackupError::Settings("BACKUP_DIR is empty".into()));
    }
    Ok(settings)
}

pub fn save_settings(path: &Path, settings: &BackupSettings) -> Result<(), BackupError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| BackupError::Settings(format!("Failed to create settings dir: {err}")))?;
    }

    let payload = serde_json::to_string_pretty(settings)
        .map_err(|err| BackupError::Settings(format!("Failed to serialize settings: {err}")))?;
    fs::write(path, payload)
        .map_err(|err| BackupError::Settings(format!("Failed to write settings: {err}")))?;

    Ok(())
}

fn default_backup_dir() -> PathBuf {
    data_paths_v2().backup_root
}

fn default_backup_keep() -> usize {
    DEFAULT_BACKUP_KEEP
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawKeep {
    Number(i64),
    Text(String),
}

fn deserialize_keep<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match RawKeep::deserialize(deserializer)? {
        RawKeep::Number(value) => value.to_string(),
        RawKeep::Text(value) => value,
    };
    parse_keep_count(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::testing::write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let settings = load_settings(&dir.path().join("settings.json")).expect("load");
        assert_eq!(settings, BackupSettings::default());
        assert_eq!(settings.backup_keep, DEFAULT_BACKUP_KEEP);
    }

    #[test]
    fn keep_accepts_numbers_and_numeric_strings() {
        let dir = tempfile::tempdir().expect("temp dir");
        let body = br#"{"BACKUP_DIR": "/data/backups", "BACKUP_KEEP": 5}"#;
        let path = write(dir.path(), "a.json", body);
        let settings = load_settings(&path).expect("load numeric");
        assert_eq!(settings.backup_dir, PathBuf::from("/data/backups"));
        assert_eq!(settings.backup_keep, 5);

        let path = write(dir.path(), "b.json", br#"{"BACKUP_KEEP": "7"}"#);
        assert_eq!(load_settings(&path).expect("load text").backup_keep, 7);
    }

    #[test]
    fn negative_or_garbage_keep_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        for (name, body) in [
            ("neg.json", r#"{"BACKUP_KEEP": -1}"#),
            ("text.json", r#"{"BACKUP_KEEP": "many"}"#),
        ] {
            let path = write(dir.path(), name, body.as_bytes());
            let err = load_settings(&path).expect_err(name);
            assert_eq!(err.kind(), ErrorKind::Settings);
        }
    }

    #[test]
    fn overrides_replace_only_what_they_set() {
        let base = BackupSettings {
            backup_dir: PathBuf::from("/data/backups"),
            backup_keep: 3,
        };
        let resolved = base.with_overrides(&BackupOverrides {
            keep: Some(0),
            ..Default::default()
        });
        assert_eq!(resolved.backup_dir, base.backup_dir);
        assert_eq!(resolved.backup_keep, 0);
        assert_eq!(base.with_overrides(&BackupOverrides::default()), base);
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("settings.json");
        let settings = BackupSettings {
            backup_dir: dir.path().join("backups"),
            backup_keep: 9,
        };
        save_settings(&path, &settings).expect("save");
        assert_eq!(load_settings(&path).expect("load"), settings);
    }
}
