use super::BackendKind;
use crate::error::Result;
use crate::model::Note;
use async_trait::async_trait;

/// Abstract interface for note persistence.
///
/// This trait handles the "how" of storage (SQLite vs key-value blob),
/// while `NoteStorage` handles the "what" (defaults, merging, search,
/// export/import). Engine errors are translated into
/// [`crate::error::NotekeepError`] before they leave an implementation.
#[async_trait]
pub trait NoteBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Insert a complete note.
    /// Fails with `DuplicateKey` if the id is already taken.
    async fn create(&self, note: &Note) -> Result<()>;

    /// Look up one note. A missing id is `Ok(None)`, not an error.
    async fn get(&self, id: &str) -> Result<Option<Note>>;

    /// Every note, in engine-native order.
    async fn get_all(&self) -> Result<Vec<Note>>;

    /// Notes whose folder equals `folder` exactly.
    async fn get_by_folder(&self, folder: &str) -> Result<Vec<Note>>;

    /// Notes carrying `tag` (exact match) at least once.
    async fn get_by_tag(&self, tag: &str) -> Result<Vec<Note>>;

    /// Replace a stored note with `note` atomically.
    /// Fails with `NotFound` if the id does not exist.
    async fn update(&self, note: &Note) -> Result<()>;

    /// Remove a note. Removing a missing id succeeds.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Remove every note.
    async fn clear(&self) -> Result<()>;
}
