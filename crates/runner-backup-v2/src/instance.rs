use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::category::BackupCategory;
use crate::errors::BackupError;

pub const DEFAULT_WORLD_NAME: &str = "Bedrock level";

/// One managed server: its id (also the name of its backup subdirectory) and install root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInstance {
    pub server_id: String,
    pub install_root: PathBuf,
    #[serde(default)]
    pub world_name: Option<String>,
}

impl ServerInstance {
    pub fn new(server_id: impl Into<String>, install_root: impl Into<PathBuf>) -> Self {
        Self {
            server_id: server_id.into(),
            install_root: install_root.into(),
            world_name: None,
        }
    }

    pub fn with_world_name(mut self, world_name: impl Into<String>) -> Self {
        self.world_name = Some(world_name.into());
        self
    }

    pub fn validate(&self) -> Result<(), BackupError> {
        validate_server_id(&self.server_id)?;
        if self.install_root.as_os_str().is_empty() {
            return Err(BackupError::input("server install root is empty"));
        }
        Ok(())
    }

    pub fn backup_dir(&self, backup_root: &Path) -> PathBuf {
        backup_root.join(&self.server_id)
    }

    /// Explicit name, else `level-name` from the live server.properties, else the default.
    pub fn world_name(&self) -> Result<String, BackupError> {
        if let Some(name) = self.world_name.as_ref().filter(|name| !name.is_empty()) {
            return Ok(name.clone());
        }
        let properties = self.install_root.join("server.properties");
        Ok(read_level_name(&properties)?.unwrap_or_else(|| DEFAULT_WORLD_NAME.to_string()))
    }

    pub fn world_dir(&self, world_name: &str) -> PathBuf {
        self.install_root.join("worlds").join(world_name)
    }

    pub fn live_file(&self, category: BackupCategory) -> Option<PathBuf> {
        category
            .live_file_name()
            .map(|name| self.install_root.join(name))
    }
}

pub fn validate_server_id(server_id: &str) -> Result<(), BackupError> {
    if server_id.trim().is_empty() {
        return Err(BackupError::input("server id is empty"));
    }
    let mut components = Path::new(server_id).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !server_id.contains(['/', '\\']) => Ok(()),
        _ => Err(BackupError::input(format!(
            "server id {server_id:?} must be a single path segment"
        ))),
    }
}

fn read_level_name(properties: &Path) -> Result<Option<String>, BackupError> {
    let content = match fs::read_to_string(properties) {
        Ok(value) => value,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(BackupError::io("reading", properties, err)),
    };

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        if key.trim() == "level-name" {
            let value = value.trim();
            if !value.is_empty() {
                return Ok(Some(value.to_string()));
            }
        }
    }
    Ok(None)
}
