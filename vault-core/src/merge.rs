//! Repository merge resolver.
//!
//! Pure functions comparing and combining two snapshots of the same
//! repository: the local copy and the copy downloaded from the cloud.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use vault_types::{Note, NoteId, Repository, Safe, SafeId};

/// Errors from single-note merges.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// The cloud repository lacks the note.
    #[error("note {0} not found in cloud repository")]
    MissingInCloud(NoteId),

    /// The local repository lacks the note.
    #[error("note {0} not found in local repository")]
    MissingInLocal(NoteId),
}

/// Which copy of a note is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDirection {
    /// Copy the cloud note onto the local note.
    Pull,
    /// Copy the local note onto the cloud note.
    Push,
}

/// What a single-note merge changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteMergeOutcome {
    /// Both copies already had the same modification time.
    Unchanged,
    /// The local repository now holds the cloud copy.
    PulledToLocal,
    /// The cloud repository now holds the local copy and must be uploaded.
    PushedToCloud,
}

/// Whether two snapshots are copies of the same repository.
///
/// Only the identity is compared. Snapshots of different repositories
/// cannot be merged.
pub fn same_repository(local: &Repository, cloud: &Repository) -> bool {
    local.id == cloud.id
}

/// Deterministic summary of everything a sync would compare.
///
/// Covers the revision, the reorder time, every (note id, effective
/// modification time) pair and the tombstones. Note order and content do
/// not contribute.
pub fn modification_fingerprint(repo: &Repository) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(repo.revision.to_le_bytes());
    update_time(&mut hasher, repo.order_modified_at);

    let mut pairs: Vec<(NoteId, DateTime<Utc>)> = repo
        .notes
        .iter()
        .map(|n| (n.id, n.effective_modified_at()))
        .collect();
    pairs.sort_by_key(|(id, _)| *id);

    hasher.update((pairs.len() as u64).to_le_bytes());
    for (id, at) in &pairs {
        hasher.update(id.as_bytes());
        update_time(&mut hasher, *at);
    }

    hasher.update((repo.deleted_notes.len() as u64).to_le_bytes());
    for id in &repo.deleted_notes {
        hasher.update(id.as_bytes());
    }

    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

fn update_time(hasher: &mut Sha256, at: DateTime<Utc>) {
    hasher.update(at.timestamp().to_le_bytes());
    hasher.update(at.timestamp_subsec_nanos().to_le_bytes());
}

/// Merge one note between the two repositories, using the current time for
/// pushes.
pub fn merge_single_note(
    local: &mut Repository,
    cloud: &mut Repository,
    note_id: NoteId,
    direction: MergeDirection,
) -> Result<NoteMergeOutcome, MergeError> {
    merge_single_note_at(local, cloud, note_id, direction, Utc::now())
}

/// Merge one note between the two repositories.
///
/// A push first stamps the local note with `now`, asserting this device's
/// copy, then overwrites the cloud note. A pull overwrites the local note
/// with every field of the cloud note. When the copied note references a
/// safe the destination lacks, the sealed safe record is copied along.
pub fn merge_single_note_at(
    local: &mut Repository,
    cloud: &mut Repository,
    note_id: NoteId,
    direction: MergeDirection,
    now: DateTime<Utc>,
) -> Result<NoteMergeOutcome, MergeError> {
    let cloud_note = cloud
        .find_note(note_id)
        .ok_or(MergeError::MissingInCloud(note_id))?;
    let local_note = local
        .find_note(note_id)
        .ok_or(MergeError::MissingInLocal(note_id))?;

    if local_note.effective_modified_at() == cloud_note.effective_modified_at() {
        return Ok(NoteMergeOutcome::Unchanged);
    }

    match direction {
        MergeDirection::Pull => {
            let copy = cloud_note.clone();
            copy_note_safe(cloud, local, &copy);
            if let Some(target) = local.find_note_mut(note_id) {
                *target = copy;
            }
            tracing::debug!(%note_id, "pulled note from cloud");
            Ok(NoteMergeOutcome::PulledToLocal)
        }
        MergeDirection::Push => {
            let mut copy = local_note.clone();
            copy.touch_at(now);
            if let Some(target) = local.find_note_mut(note_id) {
                *target = copy.clone();
            }
            copy_note_safe(local, cloud, &copy);
            if let Some(target) = cloud.find_note_mut(note_id) {
                *target = copy;
            }
            tracing::debug!(%note_id, "pushed note to cloud");
            Ok(NoteMergeOutcome::PushedToCloud)
        }
    }
}

fn copy_note_safe(source: &Repository, destination: &mut Repository, note: &Note) {
    let Some(safe_id) = note.safe_id else {
        return;
    };
    if destination.find_safe(safe_id).is_some() {
        return;
    }
    if let Some(safe) = source.find_safe(safe_id) {
        destination.safes.push(safe.clone());
    }
}

/// Merge two snapshots of the same repository into a new one.
///
/// The caller checks [`same_repository`] first; the result always carries
/// the local identity. Notes present on both sides keep the copy with the
/// later effective modification time (ties keep local). Tombstones from
/// either side remove notes. Order follows the side with the later
/// `order_modified_at`; notes only known to the other side are appended.
/// Safes are unioned and always come out closed.
pub fn merge_repositories(local: &Repository, cloud: &Repository) -> Repository {
    let deleted_notes: BTreeSet<NoteId> = local
        .deleted_notes
        .union(&cloud.deleted_notes)
        .copied()
        .collect();

    let local_leads = local.order_modified_at >= cloud.order_modified_at;
    let (leading, trailing) = if local_leads {
        (local, cloud)
    } else {
        (cloud, local)
    };
    let trailing_by_id: HashMap<NoteId, &Note> =
        trailing.notes.iter().map(|n| (n.id, n)).collect();

    let mut notes = Vec::with_capacity(leading.notes.len().max(trailing.notes.len()));
    let mut seen = BTreeSet::new();
    for note in &leading.notes {
        if deleted_notes.contains(&note.id) || !seen.insert(note.id) {
            continue;
        }
        let winner = match trailing_by_id.get(&note.id) {
            Some(other) if local_leads => newer_note(note, other),
            Some(other) => newer_note(other, note),
            None => note,
        };
        notes.push(winner.clone());
    }
    for note in &trailing.notes {
        if deleted_notes.contains(&note.id) || !seen.insert(note.id) {
            continue;
        }
        notes.push(note.clone());
    }

    Repository {
        id: local.id,
        revision: local.revision.max(cloud.revision),
        order_modified_at: local.order_modified_at.max(cloud.order_modified_at),
        notes,
        deleted_notes,
        safes: merge_safes(&local.safes, &cloud.safes),
    }
}

fn newer_note<'a>(local: &'a Note, cloud: &'a Note) -> &'a Note {
    if cloud.effective_modified_at() > local.effective_modified_at() {
        cloud
    } else {
        local
    }
}

fn merge_safes(local: &[Safe], cloud: &[Safe]) -> Vec<Safe> {
    let cloud_by_id: HashMap<SafeId, &Safe> = cloud.iter().map(|s| (s.id, s)).collect();
    let mut merged: Vec<Safe> = local
        .iter()
        .map(|safe| match cloud_by_id.get(&safe.id) {
            Some(other) if other.modified_at > safe.modified_at => (*other).clone(),
            _ => safe.clone(),
        })
        .collect();
    for safe in cloud {
        if !local.iter().any(|s| s.id == safe.id) {
            merged.push(safe.clone());
        }
    }
    merged
}
