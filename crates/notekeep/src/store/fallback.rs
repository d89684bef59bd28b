use super::backend::NoteBackend;
use super::BackendKind;
use crate::error::{NotekeepError, Result};
use crate::kv::{KvEngine, NOTES_KEY};
use crate::model::Note;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const PROBE_KEY: &str = "notekeep.probe";

/// Note backend emulated on top of a key-value engine.
///
/// The whole collection lives under [`NOTES_KEY`] as a JSON array. Reads
/// that hit an unreadable or malformed blob are served as an empty
/// collection (and logged) rather than failing. Writes are stricter: a
/// corrupted blob is replaced by the freshly computed collection, but an
/// engine read error fails the write and leaves the stored blob alone.
pub struct FallbackBackend<K: KvEngine> {
    engine: K,
    write_lock: Mutex<()>,
}

impl<K: KvEngine> FallbackBackend<K> {
    /// Checks the engine is usable and seeds an empty collection.
    pub fn open(engine: K) -> Result<Self> {
        if !engine.is_available() {
            return Err(NotekeepError::BackendUnavailable(
                "key-value engine is not available".to_string(),
            ));
        }

        let unavailable =
            |e: NotekeepError| NotekeepError::BackendUnavailable(format!("key-value engine: {e}"));

        engine.set(PROBE_KEY, "1").map_err(unavailable)?;
        engine.remove(PROBE_KEY).map_err(unavailable)?;

        if engine.get(NOTES_KEY).map_err(unavailable)?.is_none() {
            engine.set(NOTES_KEY, "[]").map_err(unavailable)?;
        }

        debug!("key-value backend opened");
        Ok(Self {
            engine,
            write_lock: Mutex::new(()),
        })
    }

    pub fn engine(&self) -> &K {
        &self.engine
    }

    /// Lenient read used by queries: any failure reads as empty.
    fn load(&self) -> Vec<Note> {
        self.load_for_write().unwrap_or_else(|err| {
            warn!(error = %err, "could not read notes blob; treating as empty");
            Vec::new()
        })
    }

    /// Read for a read-modify-write cycle. Engine errors propagate so a
    /// failed read can never be written back as an empty collection; a
    /// corrupted blob still reads as empty and is replaced by the write.
    fn load_for_write(&self) -> Result<Vec<Note>> {
        let Some(raw) = self.engine.get(NOTES_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(notes) => Ok(notes),
            Err(err) => {
                warn!(error = %err, "notes blob is corrupted; treating as empty");
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, notes: &[Note]) -> Result<()> {
        let raw = serde_json::to_string(notes)?;
        self.engine.set(NOTES_KEY, &raw)
    }
}

#[async_trait]
impl<K: KvEngine> NoteBackend for FallbackBackend<K> {
    fn kind(&self) -> BackendKind {
        BackendKind::KeyValue
    }

    async fn create(&self, note: &Note) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut notes = self.load_for_write()?;
        if notes.iter().any(|n| n.id == note.id) {
            return Err(NotekeepError::DuplicateKey(note.id.clone()));
        }
        notes.push(note.clone());
        self.save(&notes)
    }

    async fn get(&self, id: &str) -> Result<Option<Note>> {
        Ok(self.load().into_iter().find(|n| n.id == id))
    }

    async fn get_all(&self) -> Result<Vec<Note>> {
        Ok(self.load())
    }

    async fn get_by_folder(&self, folder: &str) -> Result<Vec<Note>> {
        Ok(self
            .load()
            .into_iter()
            .filter(|n| n.folder == folder)
            .collect())
    }

    async fn get_by_tag(&self, tag: &str) -> Result<Vec<Note>> {
        Ok(self
            .load()
            .into_iter()
            .filter(|n| n.tags.iter().any(|t| t == tag))
            .collect())
    }

    async fn update(&self, note: &Note) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut notes = self.load_for_write()?;
        let slot = notes
            .iter_mut()
            .find(|n| n.id == note.id)
            .ok_or_else(|| NotekeepError::NotFound(note.id.clone()))?;
        *slot = note.clone();
        self.save(&notes)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut notes = self.load_for_write()?;
        let before = notes.len();
        notes.retain(|n| n.id != id);
        if notes.len() == before {
            return Ok(());
        }
        self.save(&notes)
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.save(&[])
    }
}
