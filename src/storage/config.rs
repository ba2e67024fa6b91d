//! Configuration store
//!
//! All persistent state lives in a single `savekeep.json`: the profile
//! list (owned by [`ProfileRegistry`](crate::domain::ProfileRegistry) as
//! an opaque value) plus the storage-root settings. Writes go through a
//! temp file and rename so a crash never leaves a half-written config; a
//! file that fails to parse is rotated to `savekeep.json.corrupted` and a
//! fresh store is started rather than refusing to run.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::EnvSnapshot;

/// Config file name under the config directory
pub const CONFIG_FILE: &str = "savekeep.json";

/// Where archives are rooted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageRootMode {
    /// `backups/` under the current working directory
    #[default]
    Cwd,
    /// A user-chosen fixed folder
    Fixed,
}

/// Persistent application state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Profile list; parsed by the domain layer, opaque here
    pub profiles: Value,

    pub storage_root_mode: StorageRootMode,

    /// Fixed storage root (contracted form allowed); used when
    /// `storage_root_mode` is `fixed`
    pub storage_fixed_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profiles: Value::Array(vec![]),
            storage_root_mode: StorageRootMode::default(),
            storage_fixed_path: String::new(),
        }
    }
}

impl AppConfig {
    /// Resolves the effective storage root for this configuration
    pub fn storage_root(&self, env: &EnvSnapshot) -> PathBuf {
        if self.storage_root_mode == StorageRootMode::Fixed && !self.storage_fixed_path.is_empty()
        {
            return env.expand(&self.storage_fixed_path);
        }
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("backups")
    }
}

/// Result of loading the config file
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: AppConfig,
    /// Set when a corrupted file was rotated aside during this load
    pub rotated_to: Option<PathBuf>,
}

/// Reads and writes the config file
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store inside the given directory
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(CONFIG_FILE))
    }

    /// Returns the platform config directory for Savekeep
    pub fn default_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "savekeep", "savekeep-cli")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the config. A missing file yields the default config; a file
    /// that fails to parse is renamed to `*.corrupted` and the default is
    /// returned with `rotated_to` set so the caller can warn.
    pub fn load(&self) -> Result<LoadedConfig> {
        if !self.path.exists() {
            return Ok(LoadedConfig {
                config: AppConfig::default(),
                rotated_to: None,
            });
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config: {}", self.path.display()))?;

        match serde_json::from_str(&content) {
            Ok(config) => Ok(LoadedConfig {
                config,
                rotated_to: None,
            }),
            Err(_) => {
                let rotated = self.path.with_extension("json.corrupted");
                fs::rename(&self.path, &rotated).with_context(|| {
                    format!(
                        "Config is corrupted and could not be moved aside: {}",
                        self.path.display()
                    )
                })?;
                Ok(LoadedConfig {
                    config: AppConfig::default(),
                    rotated_to: Some(rotated),
                })
            }
        }
    }

    /// Saves the config atomically (temp file + flush + rename)
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            let content =
                serde_json::to_string_pretty(config).context("Failed to serialize config")?;
            file.write_all(content.as_bytes())
                .context("Failed to write config")?;
            file.sync_all().context("Failed to flush config")?;
        }

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })
    }
}
