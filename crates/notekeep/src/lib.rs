//! # Notekeep Architecture
//!
//! Notekeep is a **UI-agnostic note storage library**. A front end (the
//! bundled CLI, or anything else) talks to one façade, [`NoteStorage`], and
//! never learns which engine sits underneath unless it asks for stats.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Façade (storage.rs)                                        │
//! │  - Backend selection at init, state machine                 │
//! │  - Defaults, timestamps, search, export/import, stats       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Adapters (store/)                                          │
//! │  - NoteBackend trait                                        │
//! │  - SqliteBackend (primary), FallbackBackend (key-value)     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Engines                                                    │
//! │  - rusqlite connection (store/sqlite/pool.rs)               │
//! │  - KvEngine: FsKv, MemKv (kv/)                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## No I/O Assumptions in Core
//!
//! Nothing in this crate writes to stdout/stderr, exits the process, or
//! installs a log subscriber. Diagnostics go through `tracing`; the binary
//! decides where they end up.
//!
//! ## Quick Start
//!
//! ```no_run
//! use notekeep::{NoteDraft, NoteStorage, StorageConfig};
//!
//! # async fn demo() -> notekeep::Result<()> {
//! let mut storage = NoteStorage::open(StorageConfig::load(None)?, None).await;
//! storage.init().await?;
//! let note = storage
//!     .create_note(NoteDraft::new().with_title("Groceries").with_folder("home"))
//!     .await?;
//! assert_eq!(storage.get_notes_by_folder("home").await?, vec![note]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing Strategy
//!
//! - Engines and adapters carry their own unit tests (`kv/`, `store/`).
//! - The façade is tested against both backends in `tests/`, with
//!   in-memory engines so no test touches the user's data directory.

pub mod bundle;
pub mod capability;
pub mod config;
pub mod error;
pub mod id;
pub mod kv;
pub mod model;
pub mod prefs;
pub mod storage;
pub mod store;

pub use bundle::ExportBundle;
pub use config::{BackendPreference, StorageConfig};
pub use error::{ErrorKind, NotekeepError, Result};
pub use model::{sort_notes, LabelCount, Note, NoteDraft, NoteOrder, NoteUpdate};
pub use prefs::{Preferences, Theme};
pub use storage::{NoteStorage, StorageState, StorageStats};
