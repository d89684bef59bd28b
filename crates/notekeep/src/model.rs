//! # Domain Model
//!
//! [`Note`] is the only persisted record. Callers never build one directly:
//! they describe what they want with a [`NoteDraft`] (create) or a
//! [`NoteUpdate`] (merge patch) and the storage façade fills in the rest.
//!
//! ## Defaults
//!
//! | Field | Default when absent |
//! |-------|---------------------|
//! | `title` | `"Untitled Note"` (also for blank titles) |
//! | `content` | `""` |
//! | `tags` | `[]` (blank tags are dropped) |
//! | `folder` | `"default"` (also for blank folders) |
//!
//! ## Timestamps
//!
//! `created_at` is stamped once. `updated_at` starts equal to `created_at`
//! and moves strictly forward on every update, even when two updates land
//! within the same clock tick.
//!
//! ## Wire Shape
//!
//! Notes serialize with camelCase keys (`createdAt`, `updatedAt`) and
//! RFC 3339 timestamps. This is the shape used in export bundles and in the
//! key-value fallback blob.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_TITLE: &str = "Untitled Note";
pub const DEFAULT_FOLDER: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub folder: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Builds a fresh note from a draft, applying field defaults.
    pub fn from_draft(id: String, draft: NoteDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: non_blank_or(draft.title, DEFAULT_TITLE),
            content: draft.content.unwrap_or_default(),
            tags: normalize_tags(draft.tags.unwrap_or_default()),
            folder: non_blank_or(draft.folder, DEFAULT_FOLDER),
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges the fields present in `update` over this note.
    /// Timestamps are left alone; see [`Note::touch`].
    pub fn apply(&mut self, update: NoteUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        if let Some(tags) = update.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(folder) = update.folder {
            self.folder = folder;
        }
    }

    /// Stamps `updated_at`, guaranteeing it moves strictly forward.
    pub fn touch(&mut self) {
        self.touch_at(Utc::now());
    }

    pub(crate) fn touch_at(&mut self, now: DateTime<Utc>) {
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::milliseconds(1)
        };
    }

    /// Case-insensitive substring match on title, content, or any tag.
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.content.to_lowercase().contains(needle)
            || self
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(needle))
    }
}

/// Input for creating a note. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteDraft {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub folder: Option<String>,
}

impl NoteDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }
}

/// Merge patch for an existing note. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub folder: Option<String>,
}

impl NoteUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.folder.is_none()
    }
}

/// A label (folder or tag) with the number of notes carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub name: String,
    pub count: usize,
}

/// Sort orders for note listings. Engines return notes in their native
/// order, so callers that care pick one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteOrder {
    #[default]
    UpdatedDesc,
    CreatedDesc,
    TitleAsc,
}

impl FromStr for NoteOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "updated" => Ok(NoteOrder::UpdatedDesc),
            "created" => Ok(NoteOrder::CreatedDesc),
            "title" => Ok(NoteOrder::TitleAsc),
            other => Err(format!(
                "unknown sort order '{other}' (expected updated, created or title)"
            )),
        }
    }
}

impl fmt::Display for NoteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NoteOrder::UpdatedDesc => "updated",
            NoteOrder::CreatedDesc => "created",
            NoteOrder::TitleAsc => "title",
        };
        f.write_str(name)
    }
}

pub fn sort_notes(notes: &mut [Note], order: NoteOrder) {
    notes.sort_by(|a, b| compare(a, b, order));
}

fn compare(a: &Note, b: &Note, order: NoteOrder) -> Ordering {
    let primary = match order {
        NoteOrder::UpdatedDesc => b.updated_at.cmp(&a.updated_at),
        NoteOrder::CreatedDesc => b.created_at.cmp(&a.created_at),
        NoteOrder::TitleAsc => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
    };
    // ids break ties so listings are stable across engines
    primary.then_with(|| a.id.cmp(&b.id))
}

fn non_blank_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => fallback.to_string(),
    }
}

pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .filter(|tag| !tag.trim().is_empty())
        .collect()
}
