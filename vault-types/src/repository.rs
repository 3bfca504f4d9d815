//! The note repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::ModelError;
use crate::ids::{NoteId, RepositoryId, SafeId};
use crate::note::Note;
use crate::safe::Safe;

/// Highest repository schema revision this build reads and writes.
pub const CURRENT_REVISION: u32 = 1;

fn current_revision() -> u32 {
    CURRENT_REVISION
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// A user's notes, tombstones and safes.
///
/// The `id` is the repository's identity across devices: it is generated
/// once and never replaced. `notes` and `deleted_notes` are disjoint in a
/// consistent repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Stable identity.
    #[serde(default = "RepositoryId::new")]
    pub id: RepositoryId,
    /// Schema revision.
    #[serde(default = "current_revision")]
    pub revision: u32,
    /// Last manual reordering of `notes`.
    #[serde(default = "epoch")]
    pub order_modified_at: DateTime<Utc>,
    /// Notes in display order.
    #[serde(default)]
    pub notes: Vec<Note>,
    /// Tombstones of removed notes.
    #[serde(default)]
    pub deleted_notes: BTreeSet<NoteId>,
    /// Encrypted key containers.
    #[serde(default)]
    pub safes: Vec<Safe>,
}

impl Repository {
    /// Create an empty repository with a fresh identity.
    pub fn new() -> Self {
        Self {
            id: RepositoryId::new(),
            revision: CURRENT_REVISION,
            order_modified_at: Utc::now(),
            notes: Vec::new(),
            deleted_notes: BTreeSet::new(),
            safes: Vec::new(),
        }
    }

    /// Find a note by id.
    pub fn find_note(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Find a note by id for modification.
    pub fn find_note_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.iter_mut().find(|n| n.id == id)
    }

    /// Find a safe by id.
    pub fn find_safe(&self, id: SafeId) -> Option<&Safe> {
        self.safes.iter().find(|s| s.id == id)
    }

    /// Find a safe by id for modification.
    pub fn find_safe_mut(&mut self, id: SafeId) -> Option<&mut Safe> {
        self.safes.iter_mut().find(|s| s.id == id)
    }

    /// Insert a note at the top of the list.
    pub fn add_note(&mut self, note: Note) {
        self.deleted_notes.remove(&note.id);
        self.notes.insert(0, note);
    }

    /// Remove a note permanently, leaving a tombstone so the deletion
    /// propagates on the next sync. Returns `false` if the note is unknown.
    pub fn delete_note(&mut self, id: NoteId) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        if self.notes.len() == before {
            return false;
        }
        self.deleted_notes.insert(id);
        true
    }

    /// Move a note to a new position, recording the reorder time.
    pub fn move_note(&mut self, id: NoteId, position: usize) -> bool {
        let Some(from) = self.notes.iter().position(|n| n.id == id) else {
            return false;
        };
        let note = self.notes.remove(from);
        let to = position.min(self.notes.len());
        self.notes.insert(to, note);
        self.order_modified_at = Utc::now();
        true
    }

    /// Whether the note list and the tombstones are disjoint.
    pub fn is_consistent(&self) -> bool {
        self.notes.iter().all(|n| !self.deleted_notes.contains(&n.id))
    }

    /// Close every safe, zeroing all decrypted keys.
    pub fn close_all_safes(&mut self) {
        for safe in &mut self.safes {
            safe.close();
        }
    }

    /// Drop stale metadata timestamps on all notes.
    pub fn normalize(&mut self) {
        for note in &mut self.notes {
            note.normalize();
        }
    }

    /// Encode as JSON.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ModelError> {
        serde_json::to_vec(self).map_err(ModelError::Serialization)
    }

    /// Decode from JSON, rejecting newer schema revisions.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let mut repo: Self = serde_json::from_slice(bytes).map_err(ModelError::Deserialization)?;
        if repo.revision > CURRENT_REVISION {
            return Err(ModelError::UnsupportedRevision {
                found: repo.revision,
                supported: CURRENT_REVISION,
            });
        }
        repo.normalize();
        Ok(repo)
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}
