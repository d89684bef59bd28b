//! # Storage Layer
//!
//! This module defines the adapter contract ([`backend::NoteBackend`]) and
//! its two implementations. The façade ([`crate::storage::NoteStorage`])
//! picks one at init and only ever talks to the trait.
//!
//! ## Backends
//!
//! - [`sqlite::SqliteBackend`]: the primary engine. Transactional, indexed,
//!   schema-versioned through `PRAGMA user_version`.
//! - [`fallback::FallbackBackend`]: the whole collection as one JSON blob in
//!   a [`crate::kv::KvEngine`]. Every operation is
//!   deserialize → compute → reserialize, so writes cost O(total notes).
//!
//! ## Primary Schema (version 1)
//!
//! ```text
//! notes(id PK, title, content, folder, created_at, updated_at)
//!   idx on title, content, folder, created_at, updated_at
//! note_tags(note_id, position, tag)          -- multi-entry tag index
//!   idx on tag
//! ```
//!
//! ## Consistency
//!
//! The primary engine runs every write in a single transaction: a note is
//! either fully present or absent. The fallback rewrites the whole blob per
//! call; writes inside one process are serialized by a mutex, writers in
//! other processes can still lose updates.

use std::fmt;

pub mod backend;
pub mod fallback;
pub mod sqlite;

/// Current schema version. Also stamped on export bundles.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Sqlite,
    KeyValue,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::KeyValue => "key-value",
        };
        f.write_str(name)
    }
}
