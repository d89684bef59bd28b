//! Primary backend: notes in an embedded SQLite database.
//!
//! # Invariants
//! - Every write is one transaction covering `notes` and `note_tags`.
//! - Tags keep their order through the `position` column.
//! - Timestamps are stored as fixed-width RFC 3339 text (nanoseconds, `Z`),
//!   so text order equals time order on the timestamp indexes.

use super::backend::NoteBackend;
use super::BackendKind;
use crate::config::StorageConfig;
use crate::error::{NotekeepError, Result};
use crate::model::Note;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, Params, Row, Transaction};
use tracing::debug;

pub mod pool;
pub mod schema;

pub use pool::SqlitePool;

const NOTE_COLUMNS: &str = "id, title, content, folder, created_at, updated_at";

pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Opens the database off the async runtime. Any failure, including
    /// an unsupported schema version, is reported as `BackendUnavailable`.
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        let config = config.clone();
        let pool = tokio::task::spawn_blocking(move || SqlitePool::open(&config))
            .await
            .map_err(|e| NotekeepError::BackendUnavailable(format!("sqlite open task: {e}")))?
            .map_err(|e| match e {
                NotekeepError::BackendUnavailable(_) => e,
                other => NotekeepError::BackendUnavailable(format!("sqlite: {other}")),
            })?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl NoteBackend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn create(&self, note: &Note) -> Result<()> {
        let note = note.clone();
        self.pool
            .run(move |conn| {
                let tx = conn.transaction()?;
                let inserted = tx.execute(
                    "INSERT INTO notes (id, title, content, folder, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        note.id,
                        note.title,
                        note.content,
                        note.folder,
                        encode_time(&note.created_at),
                        encode_time(&note.updated_at),
                    ],
                );
                if let Err(err) = inserted {
                    return Err(if is_constraint_violation(&err) {
                        NotekeepError::DuplicateKey(note.id.clone())
                    } else {
                        err.into()
                    });
                }
                write_tags(&tx, &note)?;
                tx.commit()?;
                debug!(id = %note.id, "note inserted");
                Ok(())
            })
            .await
    }

    async fn get(&self, id: &str) -> Result<Option<Note>> {
        let id = id.to_string();
        self.pool
            .run(move |conn| Ok(load_notes(conn, "WHERE id = ?1", [&id])?.into_iter().next()))
            .await
    }

    async fn get_all(&self) -> Result<Vec<Note>> {
        self.pool.run(|conn| load_notes(conn, "", [])).await
    }

    async fn get_by_folder(&self, folder: &str) -> Result<Vec<Note>> {
        let folder = folder.to_string();
        self.pool
            .run(move |conn| load_notes(conn, "WHERE folder = ?1", [&folder]))
            .await
    }

    async fn get_by_tag(&self, tag: &str) -> Result<Vec<Note>> {
        let tag = tag.to_string();
        self.pool
            .run(move |conn| {
                load_notes(
                    conn,
                    "WHERE id IN (SELECT note_id FROM note_tags WHERE tag = ?1)",
                    [&tag],
                )
            })
            .await
    }

    async fn update(&self, note: &Note) -> Result<()> {
        let note = note.clone();
        self.pool
            .run(move |conn| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE notes
                     SET title = ?2, content = ?3, folder = ?4, created_at = ?5, updated_at = ?6
                     WHERE id = ?1",
                    params![
                        note.id,
                        note.title,
                        note.content,
                        note.folder,
                        encode_time(&note.created_at),
                        encode_time(&note.updated_at),
                    ],
                )?;
                if changed == 0 {
                    return Err(NotekeepError::NotFound(note.id.clone()));
                }
                write_tags(&tx, &note)?;
                tx.commit()?;
                debug!(id = %note.id, "note updated");
                Ok(())
            })
            .await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.pool
            .run(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM note_tags WHERE note_id = ?1", [&id])?;
                tx.execute("DELETE FROM notes WHERE id = ?1", [&id])?;
                tx.commit()?;
                Ok(())
            })
            .await
    }

    async fn clear(&self) -> Result<()> {
        self.pool
            .run(|conn| {
                let tx = conn.transaction()?;
                tx.execute_batch("DELETE FROM note_tags; DELETE FROM notes;")?;
                tx.commit()?;
                Ok(())
            })
            .await
    }
}

fn encode_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_time(column: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        tags: Vec::new(),
        folder: row.get(3)?,
        created_at: decode_time(4, row.get(4)?)?,
        updated_at: decode_time(5, row.get(5)?)?,
    })
}

/// One statement: notes joined with their tags, folded in memory. A single
/// SELECT reads from one snapshot, so tags never belong to a newer write
/// than the rows they are attached to.
fn load_notes<P: Params>(conn: &Connection, filter: &str, params: P) -> Result<Vec<Note>> {
    let sql = format!(
        "SELECT {NOTE_COLUMNS}, note_tags.tag
         FROM notes LEFT JOIN note_tags ON note_tags.note_id = notes.id
         {filter}
         ORDER BY notes.rowid, note_tags.position"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params)?;

    let mut notes: Vec<Note> = Vec::new();
    while let Some(row) = rows.next()? {
        let tag: Option<String> = row.get(6)?;
        let id: String = row.get(0)?;
        match notes.last_mut() {
            Some(last) if last.id == id => last.tags.extend(tag),
            _ => {
                let mut note = note_from_row(row)?;
                note.tags.extend(tag);
                notes.push(note);
            }
        }
    }
    Ok(notes)
}

fn write_tags(tx: &Transaction<'_>, note: &Note) -> Result<()> {
    tx.execute("DELETE FROM note_tags WHERE note_id = ?1", [&note.id])?;
    let mut stmt =
        tx.prepare_cached("INSERT INTO note_tags (note_id, position, tag) VALUES (?1, ?2, ?3)")?;
    for (position, tag) in note.tags.iter().enumerate() {
        stmt.execute(params![note.id, position as i64, tag])?;
    }
    Ok(())
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteDraft;
    use tempfile::TempDir;

    fn note(id: &str, folder: &str, tags: &[&str]) -> Note {
        Note::from_draft(
            id.to_string(),
            NoteDraft::new()
                .with_title(format!("title {id}"))
                .with_folder(folder)
                .with_tags(tags.iter().copied()),
            Utc::now(),
        )
    }

    async fn backend() -> SqliteBackend {
        SqliteBackend::open(&StorageConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn create_then_get_returns_identical_note() {
        let backend = backend().await;
        let original = note("a", "work", &["z", "a", "z"]);
        backend.create(&original).await.unwrap();

        let loaded = backend.get("a").await.unwrap().unwrap();
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let backend = backend().await;
        assert!(backend.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_id_is_surfaced() {
        let backend = backend().await;
        backend.create(&note("a", "work", &["x"])).await.unwrap();
        let err = backend.create(&note("a", "home", &[])).await.unwrap_err();
        assert!(matches!(err, NotekeepError::DuplicateKey(ref id) if id == "a"));

        // the failed insert left the original untouched
        let kept = backend.get("a").await.unwrap().unwrap();
        assert_eq!(kept.folder, "work");
        assert_eq!(kept.tags, vec!["x"]);
    }

    #[tokio::test]
    async fn update_replaces_fields_and_tags() {
        let backend = backend().await;
        let mut n = note("a", "work", &["old"]);
        backend.create(&n).await.unwrap();

        n.title = "new title".into();
        n.tags = vec!["new".into(), "tags".into()];
        n.touch();
        backend.update(&n).await.unwrap();

        let loaded = backend.get("a").await.unwrap().unwrap();
        assert_eq!(loaded, n);
        assert!(backend.get_by_tag("old").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_missing_is_not_found() {
        let backend = backend().await;
        let err = backend.update(&note("ghost", "work", &[])).await.unwrap_err();
        assert!(matches!(err, NotekeepError::NotFound(_)));
        assert!(backend.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let backend = backend().await;
        backend.create(&note("a", "work", &["t"])).await.unwrap();
        backend.delete("a").await.unwrap();
        backend.delete("a").await.unwrap();
        assert!(backend.get("a").await.unwrap().is_none());

        let tag_rows: i64 = backend
            .pool()
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM note_tags", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(tag_rows, 0);
    }

    #[tokio::test]
    async fn folder_and_tag_lookups() {
        let backend = backend().await;
        backend.create(&note("a", "work", &["x", "x"])).await.unwrap();
        backend.create(&note("b", "home", &["x"])).await.unwrap();
        backend.create(&note("c", "work", &[])).await.unwrap();

        let mut work: Vec<_> = backend
            .get_by_folder("work")
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        work.sort();
        assert_eq!(work, vec!["a", "c"]);
        assert!(backend.get_by_folder("empty").await.unwrap().is_empty());

        // a note tagged twice appears once
        assert_eq!(backend.get_by_tag("x").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn read_all_keeps_tags_with_their_notes() {
        let backend = backend().await;
        backend.create(&note("a", "work", &["b", "a", "b"])).await.unwrap();
        backend.create(&note("b", "home", &[])).await.unwrap();
        backend.create(&note("c", "work", &["c"])).await.unwrap();

        let all = backend.get_all().await.unwrap();
        let tags: Vec<(String, Vec<String>)> =
            all.into_iter().map(|n| (n.id, n.tags)).collect();
        assert_eq!(
            tags,
            vec![
                ("a".to_string(), vec!["b".to_string(), "a".to_string(), "b".to_string()]),
                ("b".to_string(), vec![]),
                ("c".to_string(), vec!["c".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn folder_lookup_uses_index() {
        let backend = backend().await;
        let plan: Vec<String> = backend
            .pool()
            .with_connection(|conn| {
                let mut stmt = conn.prepare(
                    "EXPLAIN QUERY PLAN SELECT id FROM notes WHERE folder = 'work'",
                )?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, String>(3))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .unwrap();
        assert!(plan.iter().any(|detail| detail.contains("idx_notes_folder")));
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let backend = backend().await;
        backend.create(&note("a", "work", &["x"])).await.unwrap();
        backend.create(&note("b", "home", &[])).await.unwrap();
        backend.clear().await.unwrap();
        assert!(backend.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let config = StorageConfig::at(dir.path());
        let original = note("a", "work", &["keep"]);
        {
            let backend = SqliteBackend::open(&config).await.unwrap();
            backend.create(&original).await.unwrap();
        }
        let reopened = SqliteBackend::open(&config).await.unwrap();
        assert_eq!(reopened.get("a").await.unwrap(), Some(original));
    }

    #[tokio::test]
    async fn unopenable_path_is_backend_unavailable() {
        let dir = TempDir::new().unwrap();
        // a directory where the database file should be
        std::fs::create_dir_all(dir.path().join("notes.db")).unwrap();
        let err = SqliteBackend::open(&StorageConfig::at(dir.path()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, NotekeepError::BackendUnavailable(_)));
    }
}
