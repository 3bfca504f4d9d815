//! A single note.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{NoteId, SafeId};

/// A note inside a [`Repository`](crate::Repository).
///
/// Two timestamps track changes. `modified_at` moves whenever the content
/// changes. `meta_modified_at` records later changes to metadata only (tags,
/// recycle-bin flag) and is only ever stored when it is strictly later than
/// `modified_at`; otherwise it is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Stable identity, generated on first load if missing.
    #[serde(default = "NoteId::new")]
    pub id: NoteId,
    /// Content payload. Holds envelope text when the note belongs to a safe.
    #[serde(default)]
    pub content: String,
    /// User tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Whether the note sits in the recycling bin.
    #[serde(default)]
    pub in_recycling_bin: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last content modification.
    pub modified_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta_modified_at: Option<DateTime<Utc>>,
    /// Safe whose key encrypts the content, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_id: Option<SafeId>,
}

impl Note {
    /// Create an empty note stamped with the current time.
    pub fn new() -> Self {
        Self::with_content(String::new())
    }

    /// Create a note holding the given content.
    pub fn with_content(content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: NoteId::new(),
            content: content.into(),
            tags: Vec::new(),
            in_recycling_bin: false,
            created_at: now,
            modified_at: now,
            meta_modified_at: None,
            safe_id: None,
        }
    }

    /// Metadata modification time, present only when strictly later than
    /// `modified_at`.
    pub fn meta_modified_at(&self) -> Option<DateTime<Utc>> {
        self.meta_modified_at.filter(|meta| *meta > self.modified_at)
    }

    /// Record a metadata modification. Values not strictly later than
    /// `modified_at` are discarded.
    pub fn set_meta_modified_at(&mut self, at: Option<DateTime<Utc>>) {
        self.meta_modified_at = at.filter(|meta| *meta > self.modified_at);
    }

    /// The time used when comparing two copies of this note.
    pub fn effective_modified_at(&self) -> DateTime<Utc> {
        match self.meta_modified_at() {
            Some(meta) => meta.max(self.modified_at),
            None => self.modified_at,
        }
    }

    /// Mark the content as modified now.
    pub fn touch(&mut self) {
        self.touch_at(Utc::now());
    }

    /// Mark the content as modified at a given time.
    pub fn touch_at(&mut self, at: DateTime<Utc>) {
        self.modified_at = at;
        self.normalize();
    }

    /// Mark the metadata as modified now.
    pub fn touch_meta(&mut self) {
        self.set_meta_modified_at(Some(Utc::now()));
    }

    /// Drop a stored `meta_modified_at` that is no longer later than
    /// `modified_at`.
    pub fn normalize(&mut self) {
        self.meta_modified_at = self.meta_modified_at();
    }
}

impl Default for Note {
    fn default() -> Self {
        Self::new()
    }
}
