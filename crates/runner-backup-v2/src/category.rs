use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::artifact::MatchFilter;
use crate::errors::BackupError;

pub const WORLD_EXTENSION: &str = "mcworld";

static CONFIG_BACKUP_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)_backup_\d{8}_\d{6}(\..*)$").expect("config backup pattern is valid")
});

/// The fixed set of things a server backup covers, in restore order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupCategory {
    World,
    ServerProperties,
    Allowlist,
    Permissions,
}

impl BackupCategory {
    pub const ALL: [BackupCategory; 4] = [
        BackupCategory::World,
        BackupCategory::ServerProperties,
        BackupCategory::Allowlist,
        BackupCategory::Permissions,
    ];

    pub const CONFIG_FILES: [BackupCategory; 3] = [
        BackupCategory::ServerProperties,
        BackupCategory::Allowlist,
        BackupCategory::Permissions,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BackupCategory::World => "world",
            BackupCategory::ServerProperties => "server_properties",
            BackupCategory::Allowlist => "allowlist",
            BackupCategory::Permissions => "permissions",
        }
    }

    /// File name inside the server install root. The world is a directory and has none.
    pub fn live_file_name(self) -> Option<&'static str> {
        match self {
            BackupCategory::World => None,
            BackupCategory::ServerProperties => Some("server.properties"),
            BackupCategory::Allowlist => Some("allowlist.json"),
            BackupCategory::Permissions => Some("permissions.json"),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            BackupCategory::World => WORLD_EXTENSION,
            BackupCategory::ServerProperties => "properties",
            BackupCategory::Allowlist | BackupCategory::Permissions => "json",
        }
    }

    /// Prefix of this category's backup files. Worlds are prefixed by their level name.
    pub fn backup_prefix(self, world_name: &str) -> String {
        match self.live_file_name() {
            Some(live) => format!("{}_backup_", split_name(live).0),
            None => format!("{world_name}_backup_"),
        }
    }

    /// Filter used to pick restore candidates. Worlds match any `*.mcworld`.
    pub fn selection_filter(self) -> MatchFilter {
        let prefix = match self {
            BackupCategory::World => String::new(),
            _ => self.backup_prefix(""),
        };
        MatchFilter::from_parts(prefix, self.extension())
    }

    /// Whether `file_name` is an artifact of this category, beyond the glob match.
    pub fn owns_artifact(self, file_name: &str) -> bool {
        match self.live_file_name() {
            None => file_name.ends_with(&format!(".{WORLD_EXTENSION}")),
            Some(live) => parse_config_backup_name(file_name).as_deref() == Some(live),
        }
    }

    pub fn from_live_file_name(name: &str) -> Option<Self> {
        Self::CONFIG_FILES
            .into_iter()
            .find(|category| category.live_file_name() == Some(name))
    }
}

impl fmt::Display for BackupCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn world_backup_file_name(world_name: &str, timestamp: &str) -> String {
    format!("{world_name}_backup_{timestamp}.{WORLD_EXTENSION}")
}

pub fn config_backup_file_name(source_name: &str, timestamp: &str) -> Result<String, BackupError> {
    if source_name.is_empty() {
        return Err(BackupError::input("config file name is empty"));
    }
    let (stem, ext) = split_name(source_name);
    Ok(format!("{stem}_backup_{timestamp}{ext}"))
}

/// Recover `{original}{ext}` from a config backup file name.
pub fn parse_config_backup_name(file_name: &str) -> Option<String> {
    let caps = CONFIG_BACKUP_NAME.captures(file_name)?;
    Some(format!("{}{}", &caps[1], &caps[2]))
}

// `server.properties` -> ("server", ".properties"); dotfiles keep their name as the stem.
fn split_name(name: &str) -> (&str, &str) {
    let path = Path::new(name);
    match (path.file_stem().and_then(|s| s.to_str()), path.extension()) {
        (Some(stem), Some(_)) => name.split_at(stem.len()),
        _ => (name, ""),
    }
}
