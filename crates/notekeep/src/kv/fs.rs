use super::KvEngine;
use crate::error::{NotekeepError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Filesystem key-value engine: each key is a file named after it inside
/// `root`. Writes go to a temp file first and are renamed into place.
pub struct FsKv {
    root: PathBuf,
}

impl FsKv {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if !valid {
            return Err(NotekeepError::Store(format!("Invalid key: {:?}", key)));
        }
        Ok(self.root.join(key))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(NotekeepError::Io)?;
        }
        Ok(())
    }
}

impl KvEngine for FsKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(NotekeepError::Io(err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let target = self.key_path(key)?;
        self.ensure_dir()?;

        // Atomic write
        let tmp = self.root.join(format!(".{}-{}.tmp", key, Uuid::new_v4()));
        fs::write(&tmp, value).map_err(NotekeepError::Io)?;
        if let Err(err) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(NotekeepError::Io(err));
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(NotekeepError::Io(err)),
        }
    }

    /// Creates the root directory if needed.
    fn is_available(&self) -> bool {
        self.ensure_dir().is_ok() && self.root.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let kv = FsKv::new(dir.path());
        assert!(kv.set("../escape", "x").is_err());
        assert!(kv.set(".hidden", "x").is_err());
        assert!(kv.get("").is_err());
    }

    #[test]
    fn unavailable_when_root_is_a_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("blocker");
        fs::write(&file, "not a dir").unwrap();
        let kv = FsKv::new(&file);
        assert!(!kv.is_available());
    }
}
