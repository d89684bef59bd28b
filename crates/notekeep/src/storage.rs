//! # Storage Façade
//!
//! [`NoteStorage`] is the single entry point for note persistence. Callers
//! never see which engine is active except through
//! [`NoteStorage::get_storage_stats`].
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized ──init()──► Initializing ──► Ready
//!                                      └───► Failed (terminal)
//! ```
//!
//! Every operation other than `init` requires `Ready` and fails fast with
//! [`NotekeepError::NotReady`] otherwise. Once `Failed`, the instance stays
//! unusable; build a new one to retry.
//!
//! ## Backend Selection
//!
//! The capability detector runs once, when the façade is constructed
//! ([`NoteStorage::open`] moves it off the async runtime). `init` then:
//!
//! 1. opens the SQLite backend if the detector said yes and the
//!    configuration allows it;
//! 2. on any failure, logs a warning and opens the key-value fallback;
//! 3. fails with `StorageUnavailable` when neither could be opened.
//!
//! With `backend = "sqlite"` step 2 is skipped and a primary failure is
//! terminal. With `backend = "kv"` step 1 is skipped.
//!
//! ## Import
//!
//! Import is a destructive replace, not a merge: the bundle is validated
//! in full, then the store is cleared and every bundled note written in
//! order. A bundle that fails validation leaves the store untouched.

use crate::bundle::{parse_import, ExportBundle};
use crate::capability::is_primary_backend_supported;
use crate::config::{BackendPreference, StorageConfig};
use crate::error::{NotekeepError, Result};
use crate::id::generate_id;
use crate::kv::{self, KvEngine};
use crate::model::{LabelCount, Note, NoteDraft, NoteUpdate};
use crate::store::backend::NoteBackend;
use crate::store::fallback::FallbackBackend;
use crate::store::sqlite::SqliteBackend;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl fmt::Display for StorageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageState::Uninitialized => "uninitialized",
            StorageState::Initializing => "initializing",
            StorageState::Ready => "ready",
            StorageState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub total_notes: usize,
    /// Length in bytes of the whole collection serialized as JSON.
    pub total_size: usize,
    pub backend_name: String,
    pub last_updated: Option<DateTime<Utc>>,
}

pub struct NoteStorage {
    config: StorageConfig,
    kv_engine: Option<Arc<dyn KvEngine>>,
    primary_supported: bool,
    state: StorageState,
    backend: Option<Box<dyn NoteBackend>>,
}

impl NoteStorage {
    /// Runs the capability probe on the calling thread. The probe opens the
    /// configured database (creating the file) and may wait up to
    /// `busy_timeout_ms` on a locked one; from async code prefer
    /// [`NoteStorage::open`].
    pub fn new(config: StorageConfig) -> Self {
        let primary_supported = is_primary_backend_supported(&config);
        Self::assemble(config, None, primary_supported)
    }

    /// Like [`NoteStorage::new`], but the fallback uses `engine` instead of
    /// the one the configuration describes. Lets collaborators share the
    /// key-value namespace with the fallback backend.
    pub fn with_kv_engine(config: StorageConfig, engine: Arc<dyn KvEngine>) -> Self {
        let primary_supported = is_primary_backend_supported(&config);
        Self::assemble(config, Some(engine), primary_supported)
    }

    /// Async constructor: the capability probe runs on the blocking pool.
    /// `engine` has the same meaning as in [`NoteStorage::with_kv_engine`].
    pub async fn open(config: StorageConfig, engine: Option<Arc<dyn KvEngine>>) -> Self {
        let probe_config = config.clone();
        let primary_supported =
            tokio::task::spawn_blocking(move || is_primary_backend_supported(&probe_config))
                .await
                .unwrap_or_else(|err| {
                    warn!(error = %err, "capability probe task failed");
                    false
                });
        Self::assemble(config, engine, primary_supported)
    }

    fn assemble(
        config: StorageConfig,
        kv_engine: Option<Arc<dyn KvEngine>>,
        primary_supported: bool,
    ) -> Self {
        debug!(primary_supported, "capability detection finished");
        Self {
            config,
            kv_engine,
            primary_supported,
            state: StorageState::Uninitialized,
            backend: None,
        }
    }

    pub fn state(&self) -> StorageState {
        self.state
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub async fn init(&mut self) -> Result<()> {
        match self.state {
            StorageState::Ready => return Ok(()),
            StorageState::Failed => {
                return Err(NotekeepError::StorageUnavailable(
                    "storage failed to initialize earlier".to_string(),
                ))
            }
            StorageState::Uninitialized | StorageState::Initializing => {}
        }

        self.state = StorageState::Initializing;
        match self.select_backend().await {
            Ok(backend) => {
                info!(backend = %backend.kind(), "storage ready");
                self.backend = Some(backend);
                self.state = StorageState::Ready;
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "storage initialization failed");
                self.state = StorageState::Failed;
                Err(err)
            }
        }
    }

    async fn select_backend(&self) -> Result<Box<dyn NoteBackend>> {
        let preference = self.config.backend_preference()?;

        if preference != BackendPreference::Kv {
            let primary = if self.primary_supported {
                SqliteBackend::open(&self.config).await
            } else {
                Err(NotekeepError::BackendUnavailable(
                    "sqlite is not usable here".to_string(),
                ))
            };
            match primary {
                Ok(backend) => return Ok(Box::new(backend)),
                Err(err) if preference == BackendPreference::Sqlite => {
                    return Err(NotekeepError::StorageUnavailable(format!(
                        "sqlite backend required but unavailable: {err}"
                    )));
                }
                Err(err) => {
                    warn!(error = %err, "primary backend unavailable; using key-value fallback");
                }
            }
        }

        let engine = match &self.kv_engine {
            Some(engine) => Arc::clone(engine),
            None => kv::engine_for(&self.config).map_err(unavailable)?,
        };
        let fallback = FallbackBackend::open(engine).map_err(unavailable)?;
        Ok(Box::new(fallback))
    }

    fn backend(&self) -> Result<&dyn NoteBackend> {
        match (&self.backend, self.state) {
            (Some(backend), StorageState::Ready) => Ok(backend.as_ref()),
            (_, state) => Err(NotekeepError::NotReady(state)),
        }
    }

    pub async fn create_note(&self, draft: NoteDraft) -> Result<Note> {
        let backend = self.backend()?;
        let note = Note::from_draft(generate_id(), draft, Utc::now());
        backend.create(&note).await?;
        debug!(id = %note.id, "note created");
        Ok(note)
    }

    pub async fn get_note(&self, id: &str) -> Result<Option<Note>> {
        self.backend()?.get(id).await
    }

    /// Engine-native order; see [`crate::model::sort_notes`].
    pub async fn get_all_notes(&self) -> Result<Vec<Note>> {
        self.backend()?.get_all().await
    }

    pub async fn get_notes_by_folder(&self, folder: &str) -> Result<Vec<Note>> {
        self.backend()?.get_by_folder(folder).await
    }

    pub async fn get_notes_by_tag(&self, tag: &str) -> Result<Vec<Note>> {
        self.backend()?.get_by_tag(tag).await
    }

    pub async fn update_note(&self, id: &str, update: NoteUpdate) -> Result<Note> {
        let backend = self.backend()?;
        let mut note = backend
            .get(id)
            .await?
            .ok_or_else(|| NotekeepError::NotFound(id.to_string()))?;
        note.apply(update);
        note.touch();
        backend.update(&note).await?;
        debug!(id = %note.id, "note updated");
        Ok(note)
    }

    /// Always `true` once the backend accepted the call; deleting a missing
    /// id is not an error.
    pub async fn delete_note(&self, id: &str) -> Result<bool> {
        self.backend()?.delete(id).await?;
        debug!(id, "note deleted");
        Ok(true)
    }

    /// Case-insensitive substring search over title, content and tags.
    /// An empty query matches every note.
    pub async fn search_notes(&self, query: &str) -> Result<Vec<Note>> {
        let needle = query.to_lowercase();
        let notes = self.backend()?.get_all().await?;
        Ok(notes.into_iter().filter(|n| n.matches(&needle)).collect())
    }

    pub async fn get_folders(&self) -> Result<Vec<LabelCount>> {
        let notes = self.backend()?.get_all().await?;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for note in notes {
            *counts.entry(note.folder).or_default() += 1;
        }
        Ok(into_labels(counts))
    }

    /// A note tagged `x` twice counts once for `x`.
    pub async fn get_tags(&self) -> Result<Vec<LabelCount>> {
        let notes = self.backend()?.get_all().await?;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for note in notes {
            let distinct: BTreeSet<String> = note.tags.into_iter().collect();
            for tag in distinct {
                *counts.entry(tag).or_default() += 1;
            }
        }
        Ok(into_labels(counts))
    }

    pub async fn export_data(&self) -> Result<ExportBundle> {
        let notes = self.backend()?.get_all().await?;
        info!(count = notes.len(), "exporting notes");
        Ok(ExportBundle::new(notes))
    }

    /// Replaces every stored note with the bundle's notes. Returns how many
    /// were written.
    pub async fn import_data(&self, bundle: &Value) -> Result<usize> {
        let backend = self.backend()?;
        let imported = parse_import(bundle)?;

        backend.clear().await?;
        let now = Utc::now();
        let mut count = 0;
        for entry in imported {
            backend.create(&entry.into_note(now)).await?;
            count += 1;
        }
        info!(count, "notes imported");
        Ok(count)
    }

    pub async fn import_bundle(&self, bundle: ExportBundle) -> Result<usize> {
        let value = serde_json::to_value(&bundle)?;
        self.import_data(&value).await
    }

    pub async fn clear_all_data(&self) -> Result<()> {
        self.backend()?.clear().await?;
        info!("all notes cleared");
        Ok(())
    }

    pub async fn get_storage_stats(&self) -> Result<StorageStats> {
        let backend = self.backend()?;
        let notes = backend.get_all().await?;
        Ok(StorageStats {
            total_notes: notes.len(),
            total_size: serde_json::to_string(&notes)?.len(),
            backend_name: backend.kind().to_string(),
            last_updated: notes.iter().map(|n| n.updated_at).max(),
        })
    }
}

fn unavailable(err: NotekeepError) -> NotekeepError {
    NotekeepError::StorageUnavailable(format!("no storage engine is usable: {err}"))
}

fn into_labels(counts: BTreeMap<String, usize>) -> Vec<LabelCount> {
    counts
        .into_iter()
        .map(|(name, count)| LabelCount { name, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::mem::MemKv;
    use crate::kv::NOTES_KEY;
    use serde_json::json;

    async fn ready(config: StorageConfig) -> NoteStorage {
        let mut storage = NoteStorage::new(config);
        storage.init().await.unwrap();
        storage
    }

    async fn sqlite() -> NoteStorage {
        ready(StorageConfig::in_memory()).await
    }

    async fn fallback() -> NoteStorage {
        ready(StorageConfig::in_memory().with_backend(BackendPreference::Kv)).await
    }

    #[tokio::test]
    async fn operations_before_init_fail_fast() {
        let storage = NoteStorage::new(StorageConfig::in_memory());
        assert_eq!(storage.state(), StorageState::Uninitialized);
        let err = storage.get_all_notes().await.unwrap_err();
        assert!(matches!(
            err,
            NotekeepError::NotReady(StorageState::Uninitialized)
        ));
    }

    #[tokio::test]
    async fn init_is_idempotent_once_ready() {
        let mut storage = sqlite().await;
        storage.create_note(NoteDraft::new()).await.unwrap();
        storage.init().await.unwrap();
        assert_eq!(storage.get_all_notes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn async_constructor_probes_off_runtime() {
        let engine: Arc<dyn KvEngine> = Arc::new(MemKv::new());
        let mut storage = NoteStorage::open(StorageConfig::in_memory(), Some(engine)).await;
        assert_eq!(storage.state(), StorageState::Uninitialized);
        storage.init().await.unwrap();
        let stats = storage.get_storage_stats().await.unwrap();
        assert_eq!(stats.backend_name, "sqlite");
    }

    #[tokio::test]
    async fn default_config_prefers_sqlite() {
        let stats = sqlite().await.get_storage_stats().await.unwrap();
        assert_eq!(stats.backend_name, "sqlite");
    }

    #[tokio::test]
    async fn kv_preference_uses_fallback() {
        let stats = fallback().await.get_storage_stats().await.unwrap();
        assert_eq!(stats.backend_name, "key-value");
    }

    #[tokio::test]
    async fn unusable_fallback_is_terminal() {
        let engine = Arc::new(MemKv::new());
        engine.set_unavailable(true);
        let config = StorageConfig::in_memory().with_backend(BackendPreference::Kv);
        let mut storage = NoteStorage::with_kv_engine(config, engine);

        let err = storage.init().await.unwrap_err();
        assert!(matches!(err, NotekeepError::StorageUnavailable(_)));
        assert_eq!(storage.state(), StorageState::Failed);

        let err = storage.init().await.unwrap_err();
        assert!(matches!(err, NotekeepError::StorageUnavailable(_)));
        assert!(matches!(
            storage.get_all_notes().await.unwrap_err(),
            NotekeepError::NotReady(StorageState::Failed)
        ));
    }

    #[tokio::test]
    async fn invalid_backend_preference_fails_init() {
        let mut config = StorageConfig::in_memory();
        config.backend = "postgres".to_string();
        let mut storage = NoteStorage::new(config);
        let err = storage.init().await.unwrap_err();
        assert!(matches!(err, NotekeepError::Config(_)));
        assert_eq!(storage.state(), StorageState::Failed);
    }

    #[tokio::test]
    async fn shared_engine_sees_fallback_writes() {
        let engine = Arc::new(MemKv::new());
        let config = StorageConfig::in_memory().with_backend(BackendPreference::Kv);
        let mut storage = NoteStorage::with_kv_engine(config, engine.clone());
        storage.init().await.unwrap();
        storage
            .create_note(NoteDraft::new().with_title("shared"))
            .await
            .unwrap();

        let raw = engine.get(NOTES_KEY).unwrap().unwrap();
        assert!(raw.contains("shared"));
    }

    #[tokio::test]
    async fn update_stamps_and_merges() {
        for storage in [sqlite().await, fallback().await] {
            let note = storage
                .create_note(NoteDraft::new().with_title("X").with_tags(["a"]))
                .await
                .unwrap();
            let updated = storage
                .update_note(&note.id, NoteUpdate::new().with_title("Y"))
                .await
                .unwrap();
            assert_eq!(updated.title, "Y");
            assert_eq!(updated.tags, vec!["a"]);
            assert_eq!(updated.created_at, note.created_at);
            assert!(updated.updated_at > note.updated_at);

            let stored = storage.get_note(&note.id).await.unwrap().unwrap();
            assert_eq!(stored, updated);
        }
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let storage = sqlite().await;
        let err = storage
            .update_note("missing", NoteUpdate::new().with_title("Y"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotekeepError::NotFound(_)));
        assert!(storage.get_all_notes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn folders_and_tags_are_counted() {
        let storage = fallback().await;
        for (folder, tags) in [
            ("work", vec!["x", "y"]),
            ("home", vec!["x"]),
            ("work", vec!["y", "y"]),
        ] {
            storage
                .create_note(NoteDraft::new().with_folder(folder).with_tags(tags))
                .await
                .unwrap();
        }

        let folders = storage.get_folders().await.unwrap();
        assert_eq!(
            folders,
            vec![
                LabelCount { name: "home".into(), count: 1 },
                LabelCount { name: "work".into(), count: 2 },
            ]
        );

        let tags = storage.get_tags().await.unwrap();
        assert_eq!(
            tags,
            vec![
                LabelCount { name: "x".into(), count: 2 },
                LabelCount { name: "y".into(), count: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn stats_reflect_collection() {
        let storage = sqlite().await;
        let empty = storage.get_storage_stats().await.unwrap();
        assert_eq!(empty.total_notes, 0);
        assert_eq!(empty.total_size, 2);
        assert_eq!(empty.last_updated, None);

        storage.create_note(NoteDraft::new()).await.unwrap();
        let note = storage.create_note(NoteDraft::new()).await.unwrap();
        let touched = storage
            .update_note(&note.id, NoteUpdate::new().with_content("body"))
            .await
            .unwrap();

        let stats = storage.get_storage_stats().await.unwrap();
        let all = storage.get_all_notes().await.unwrap();
        assert_eq!(stats.total_notes, 2);
        assert_eq!(stats.total_size, serde_json::to_string(&all).unwrap().len());
        assert_eq!(stats.last_updated, Some(touched.updated_at));
    }

    #[tokio::test]
    async fn invalid_import_leaves_store_untouched() {
        let storage = sqlite().await;
        storage.create_note(NoteDraft::new()).await.unwrap();

        let err = storage
            .import_data(&json!({"version": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, NotekeepError::InvalidFormat(_)));

        let err = storage
            .import_data(&json!({"notes": [{"id": "a"}, "junk"]}))
            .await
            .unwrap_err();
        assert!(matches!(err, NotekeepError::InvalidFormat(_)));

        assert_eq!(storage.get_all_notes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn import_bundle_replaces_contents() {
        let source = sqlite().await;
        source
            .create_note(NoteDraft::new().with_title("kept"))
            .await
            .unwrap();
        let bundle = source.export_data().await.unwrap();

        let target = fallback().await;
        target
            .create_note(NoteDraft::new().with_title("dropped"))
            .await
            .unwrap();
        assert_eq!(target.import_bundle(bundle.clone()).await.unwrap(), 1);

        let notes = target.get_all_notes().await.unwrap();
        assert_eq!(notes, bundle.notes);
    }
}
