//! # Configuration
//!
//! Storage configuration is managed by [`confique`], layering environment
//! variables over an optional TOML file over compiled defaults.
//!
//! ## Resolution Order
//!
//! 1. **Environment variables**: `NOTEKEEP_DATA_DIR`, `NOTEKEEP_BACKEND`, etc.
//! 2. **Config file**: an explicit path, or `notekeep.toml` in the OS config
//!    directory (via the `directories` crate) when it exists.
//! 3. **Compiled Defaults**: `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `data_dir` | OS data dir | Root directory for both engines |
//! | `database_file` | `notes.db` | SQLite file inside `data_dir` |
//! | `kv_dir` | `kv` | Key-value directory inside `data_dir` |
//! | `backend` | `auto` | `auto`, `sqlite` or `kv` |
//! | `busy_timeout_ms` | `5000` | SQLite busy timeout |
//! | `in_memory` | `false` | Keep everything in process memory |

use crate::error::{NotekeepError, Result};
use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_FILE_NAME: &str = "notekeep.toml";

/// Which engine(s) the façade may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// SQLite when supported, key-value store otherwise.
    #[default]
    Auto,
    /// SQLite only. Failing to open it is terminal.
    Sqlite,
    /// Key-value store only.
    Kv,
}

impl FromStr for BackendPreference {
    type Err = NotekeepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(BackendPreference::Auto),
            "sqlite" => Ok(BackendPreference::Sqlite),
            "kv" => Ok(BackendPreference::Kv),
            other => Err(NotekeepError::Config(format!(
                "unknown backend '{other}' (expected auto, sqlite or kv)"
            ))),
        }
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendPreference::Auto => "auto",
            BackendPreference::Sqlite => "sqlite",
            BackendPreference::Kv => "kv",
        };
        f.write_str(name)
    }
}

/// Where the SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

/// Configuration for notekeep storage, stored in `notekeep.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Root directory for the database and the key-value store.
    /// When absent, the OS data directory is used.
    #[config(env = "NOTEKEEP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// SQLite database file name, relative to `data_dir`.
    #[config(default = "notes.db", env = "NOTEKEEP_DATABASE_FILE")]
    pub database_file: String,

    /// Key-value store directory, relative to `data_dir`.
    #[config(default = "kv", env = "NOTEKEEP_KV_DIR")]
    pub kv_dir: String,

    /// Backend selection: "auto", "sqlite" or "kv".
    #[config(default = "auto", env = "NOTEKEEP_BACKEND")]
    pub backend: String,

    /// How long SQLite waits on a locked database before giving up.
    #[config(default = 5000, env = "NOTEKEEP_BUSY_TIMEOUT_MS")]
    pub busy_timeout_ms: u64,

    /// Keep all data in process memory (nothing touches the disk).
    #[config(default = false, env = "NOTEKEEP_IN_MEMORY")]
    pub in_memory: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            database_file: "notes.db".to_string(),
            kv_dir: "kv".to_string(),
            backend: "auto".to_string(),
            busy_timeout_ms: 5000,
            in_memory: false,
        }
    }
}

impl StorageConfig {
    /// Loads configuration from the environment and a TOML file.
    ///
    /// An explicit `file` must exist; the default file is used only when present.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = StorageConfig::builder().env();

        match file {
            Some(path) => {
                if !path.exists() {
                    return Err(NotekeepError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                builder = builder.file(path);
            }
            None => {
                if let Some(path) = default_config_file().filter(|p| p.exists()) {
                    builder = builder.file(path);
                }
            }
        }

        builder
            .load()
            .map_err(|e| NotekeepError::Config(e.to_string()))
    }

    /// Everything in memory; nothing survives the process.
    pub fn in_memory() -> Self {
        Self {
            in_memory: true,
            ..Default::default()
        }
    }

    /// Both engines rooted at `dir`.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(dir.into()),
            ..Default::default()
        }
    }

    pub fn with_backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend.to_string();
        self
    }

    pub fn backend_preference(&self) -> Result<BackendPreference> {
        self.backend.parse()
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| {
                NotekeepError::Config("could not determine a data directory".to_string())
            })
    }

    pub fn database_location(&self) -> Result<DatabaseLocation> {
        if self.in_memory {
            return Ok(DatabaseLocation::Memory);
        }
        Ok(DatabaseLocation::File(
            self.data_dir()?.join(&self.database_file),
        ))
    }

    pub fn kv_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(&self.kv_dir))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "notekeep")
}

/// `notekeep.toml` inside the OS config directory.
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StorageConfig::default();
        assert_eq!(config.database_file, "notes.db");
        assert_eq!(config.kv_dir, "kv");
        assert_eq!(config.backend_preference().unwrap(), BackendPreference::Auto);
        assert!(!config.in_memory);
    }

    #[test]
    fn test_in_memory_location() {
        let config = StorageConfig::in_memory();
        assert_eq!(
            config.database_location().unwrap(),
            DatabaseLocation::Memory
        );
    }

    #[test]
    fn test_paths_resolve_under_data_dir() {
        let config = StorageConfig::at("/tmp/nk");
        assert_eq!(
            config.database_location().unwrap(),
            DatabaseLocation::File(PathBuf::from("/tmp/nk/notes.db"))
        );
        assert_eq!(config.kv_path().unwrap(), PathBuf::from("/tmp/nk/kv"));
    }

    #[test]
    fn test_backend_preference_parsing() {
        assert_eq!(
            " SQLite ".parse::<BackendPreference>().unwrap(),
            BackendPreference::Sqlite
        );
        let config = StorageConfig::default().with_backend(BackendPreference::Kv);
        assert_eq!(config.backend, "kv");

        let bad = StorageConfig {
            backend: "indexeddb".to_string(),
            ..Default::default()
        };
        let err = bad.backend_preference().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(CONFIG_FILE_NAME);
        let on_disk = StorageConfig {
            data_dir: Some(dir.path().join("data")),
            database_file: "custom.db".to_string(),
            ..Default::default()
        };
        std::fs::write(&file, toml::to_string(&on_disk).unwrap()).unwrap();

        let loaded = StorageConfig::load(Some(&file)).unwrap();
        assert_eq!(loaded.database_file, "custom.db");
        assert_eq!(loaded.data_dir, Some(dir.path().join("data")));
        assert_eq!(loaded.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = StorageConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
