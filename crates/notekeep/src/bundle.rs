//! # Export Bundles
//!
//! A bundle is a point-in-time snapshot of every note:
//!
//! ```json
//! { "version": 1, "exportDate": "2024-05-01T10:00:00Z", "notes": [ ... ] }
//! ```
//!
//! Import validates the whole bundle before the store is touched: the
//! top level must be an object with a `notes` array, every element must be
//! a note-shaped object, and ids must not repeat. Missing note fields get
//! the usual defaults; supplied fields are preserved as given, so a note
//! whose title was updated to `""` comes back with an empty title. The
//! `version` field is carried but not interpreted.

use crate::error::{NotekeepError, Result};
use crate::id::generate_id;
use crate::model::{normalize_tags, Note, DEFAULT_FOLDER, DEFAULT_TITLE};
use crate::store::SCHEMA_VERSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::io::{Read, Write};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: u32,
    pub export_date: DateTime<Utc>,
    pub notes: Vec<Note>,
}

impl ExportBundle {
    pub fn new(notes: Vec<Note>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            export_date: Utc::now(),
            notes,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Reads raw JSON for [`crate::storage::NoteStorage::import_data`].
    /// Malformed JSON is an `InvalidFormat` error.
    pub fn read_json<R: Read>(reader: R) -> Result<Value> {
        serde_json::from_reader(reader)
            .map_err(|e| NotekeepError::InvalidFormat(format!("not valid JSON: {e}")))
    }
}

/// One element of a bundle's `notes` array, as loosely as it may arrive.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ImportedNote {
    id: Option<String>,
    title: Option<String>,
    content: Option<String>,
    tags: Option<Vec<String>>,
    folder: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl ImportedNote {
    pub(crate) fn into_note(self, now: DateTime<Utc>) -> Note {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(generate_id);
        let created_at = self.created_at.unwrap_or(now);
        let updated_at = self.updated_at.unwrap_or(created_at).max(created_at);

        // supplied fields are kept verbatim, blank ones included
        Note {
            id,
            title: self.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            content: self.content.unwrap_or_default(),
            tags: normalize_tags(self.tags.unwrap_or_default()),
            folder: self.folder.unwrap_or_else(|| DEFAULT_FOLDER.to_string()),
            created_at,
            updated_at,
        }
    }
}

/// Validates a bundle and returns its notes. Nothing is written here.
pub(crate) fn parse_import(bundle: &Value) -> Result<Vec<ImportedNote>> {
    let object = bundle
        .as_object()
        .ok_or_else(|| NotekeepError::InvalidFormat("bundle must be a JSON object".into()))?;
    let notes = object
        .get("notes")
        .ok_or_else(|| NotekeepError::InvalidFormat("bundle has no `notes` field".into()))?;
    let items = notes
        .as_array()
        .ok_or_else(|| NotekeepError::InvalidFormat("`notes` must be an array".into()))?;

    let mut seen = HashSet::new();
    let mut parsed = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if !item.is_object() {
            return Err(NotekeepError::InvalidFormat(format!(
                "note #{index} is not an object"
            )));
        }
        let note = ImportedNote::deserialize(item)
            .map_err(|e| NotekeepError::InvalidFormat(format!("note #{index}: {e}")))?;
        if let Some(id) = note.id.as_deref().filter(|id| !id.trim().is_empty()) {
            if !seen.insert(id.to_string()) {
                return Err(NotekeepError::InvalidFormat(format!(
                    "note #{index} repeats id {id}"
                )));
            }
        }
        parsed.push(note);
    }
    Ok(parsed)
}
