//! User preferences kept next to the notes in the key-value namespace.
//!
//! These keys belong to the front end, not the storage core. They live in
//! the same namespace as the fallback's notes blob but never touch it.

use crate::error::{NotekeepError, Result};
use crate::kv::{KvEngine, THEME_KEY, WELCOME_KEY};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl FromStr for Theme {
    type Err = NotekeepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            other => Err(NotekeepError::Config(format!(
                "unknown theme '{other}' (expected light, dark or system)"
            ))),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        };
        f.write_str(name)
    }
}

pub struct Preferences<K: KvEngine> {
    engine: K,
}

impl<K: KvEngine> Preferences<K> {
    pub fn new(engine: K) -> Self {
        Self { engine }
    }

    /// Stored theme, or the default when unset or unrecognized.
    pub fn theme(&self) -> Result<Theme> {
        let stored = self.engine.get(THEME_KEY)?;
        Ok(stored
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default())
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.engine.set(THEME_KEY, &theme.to_string())
    }

    pub fn has_seen_welcome(&self) -> Result<bool> {
        Ok(self.engine.get(WELCOME_KEY)?.as_deref() == Some("true"))
    }

    pub fn mark_welcome_seen(&self) -> Result<()> {
        self.engine.set(WELCOME_KEY, "true")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::mem::MemKv;
    use crate::kv::NOTES_KEY;
    use std::sync::Arc;

    #[test]
    fn theme_defaults_to_system() {
        let prefs = Preferences::new(MemKv::new());
        assert_eq!(prefs.theme().unwrap(), Theme::System);
    }

    #[test]
    fn theme_round_trips_and_ignores_garbage() {
        let engine = Arc::new(MemKv::new());
        let prefs = Preferences::new(engine.clone());
        prefs.set_theme(Theme::Dark).unwrap();
        assert_eq!(prefs.theme().unwrap(), Theme::Dark);

        engine.insert_raw(THEME_KEY, "neon");
        assert_eq!(prefs.theme().unwrap(), Theme::System);
    }

    #[test]
    fn welcome_flag() {
        let prefs = Preferences::new(MemKv::new());
        assert!(!prefs.has_seen_welcome().unwrap());
        prefs.mark_welcome_seen().unwrap();
        assert!(prefs.has_seen_welcome().unwrap());
    }

    #[test]
    fn never_touches_notes_key() {
        let engine = Arc::new(MemKv::new());
        engine.insert_raw(NOTES_KEY, "[]");
        let prefs = Preferences::new(engine.clone());
        prefs.set_theme(Theme::Light).unwrap();
        prefs.mark_welcome_seen().unwrap();
        assert_eq!(engine.get(NOTES_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn theme_parse_is_case_insensitive() {
        assert_eq!(" Dark ".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("blue".parse::<Theme>().is_err());
    }
}
