//! # Key-Value Engines
//!
//! The fallback backend and the preferences store both sit on a flat
//! string-to-string namespace. [`KvEngine`] is that namespace; this module
//! holds the two engines and the well-known keys.
//!
//! ## Keys
//!
//! | Key | Owner |
//! |-----|-------|
//! | `notekeep.notes` | fallback backend: JSON array of every note |
//! | `notekeep.hasSeenWelcome` | [`crate::prefs::Preferences`] |
//! | `notekeep.theme` | [`crate::prefs::Preferences`] |
//!
//! ## Implementations
//!
//! - [`fs::FsKv`]: one file per key inside a directory, atomic writes.
//! - [`mem::MemKv`]: process memory, for in-memory mode and tests.

use crate::config::StorageConfig;
use crate::error::Result;
use std::sync::Arc;

pub mod fs;
pub mod mem;

pub const NOTES_KEY: &str = "notekeep.notes";
pub const WELCOME_KEY: &str = "notekeep.hasSeenWelcome";
pub const THEME_KEY: &str = "notekeep.theme";

/// Abstract interface for a flat key-value namespace.
///
/// All methods take `&self`; implementations handle their own interior
/// mutability so one engine can be shared between collaborators.
pub trait KvEngine: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    /// MUST be atomic: readers see the old or the new value, never a mix.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Whether the engine can be used at all (e.g. its directory exists or
    /// can be created).
    fn is_available(&self) -> bool;
}

impl<K: KvEngine + ?Sized> KvEngine for Arc<K> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// The engine a config points at: [`mem::MemKv`] in memory mode,
/// [`fs::FsKv`] under `data_dir/kv_dir` otherwise.
pub fn engine_for(config: &StorageConfig) -> Result<Arc<dyn KvEngine>> {
    if config.in_memory {
        return Ok(Arc::new(mem::MemKv::new()));
    }
    Ok(Arc::new(fs::FsKv::new(config.kv_path()?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_keys_do_not_collide() {
        assert_ne!(NOTES_KEY, WELCOME_KEY);
        assert_ne!(NOTES_KEY, THEME_KEY);
        assert_ne!(WELCOME_KEY, THEME_KEY);
    }

    #[test]
    fn engine_for_in_memory_config_is_usable() {
        let engine = engine_for(&StorageConfig::in_memory()).unwrap();
        assert!(engine.is_available());
        engine.set("k", "v").unwrap();
        assert_eq!(engine.get("k").unwrap().as_deref(), Some("v"));
    }
}
