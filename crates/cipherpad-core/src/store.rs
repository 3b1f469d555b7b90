//! In-memory working set of decrypted folders and notes.
//!
//! `NoteStore` is the only owner of the decrypted collection. It is shared
//! between the session, the edit debouncer and callers as a [`SharedStore`];
//! every mutation goes through one of the `apply_*`/`update_*` methods below.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::{Folder, Note};

/// Store handle shared across the session's tasks.
pub type SharedStore = Arc<Mutex<NoteStore>>;

/// Status of the most recent store operation. Observability only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreStatus {
    #[default]
    Idle,
    Fetching,
    Fetched,
    FetchRejected,
    Adding,
    Added,
    AddRejected,
    Deleting,
    Deleted,
    DeleteRejected,
}

impl StoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreStatus::Idle => "idle",
            StoreStatus::Fetching => "fetching",
            StoreStatus::Fetched => "fetched",
            StoreStatus::FetchRejected => "fetchRejected",
            StoreStatus::Adding => "adding",
            StoreStatus::Added => "added",
            StoreStatus::AddRejected => "addRejected",
            StoreStatus::Deleting => "deleting",
            StoreStatus::Deleted => "deleted",
            StoreStatus::DeleteRejected => "deleteRejected",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            StoreStatus::Fetching | StoreStatus::Adding | StoreStatus::Deleting
        )
    }

    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            StoreStatus::FetchRejected | StoreStatus::AddRejected | StoreStatus::DeleteRejected
        )
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the local-then-remote edit flush for one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    /// Applied locally, waiting for the connection
    Queued,
    /// Handed to the transport (no acknowledgement is tracked)
    Sent,
    /// Encryption or channel failure; the local edit is kept unconfirmed
    Rejected(String),
}

/// Decrypted folder/note collection plus status bookkeeping.
#[derive(Debug, Default)]
pub struct NoteStore {
    folders: Vec<Folder>,
    status: StoreStatus,
    error: Option<String>,
    decrypt_failed: bool,
    selected: Option<String>,
    sync: HashMap<String, SyncState>,
    revision: u64,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn status(&self) -> StoreStatus {
        self.status
    }

    /// Message of the last rejected operation, cleared by the next success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the last fetch hit ciphertext the current key cannot open.
    pub fn decrypt_failed(&self) -> bool {
        self.decrypt_failed
    }

    /// Counter bumped by every local mutation of the collection.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn note_count(&self) -> usize {
        self.folders.iter().map(|f| f.notes.len()).sum()
    }

    pub fn find(&self, id: &str) -> Option<&Note> {
        self.folders
            .iter()
            .flat_map(|f| f.notes.iter())
            .find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Mark an operation as in flight.
    pub fn begin(&mut self, status: StoreStatus) {
        self.status = status;
    }

    /// Mark an operation as failed with a user-facing message.
    pub fn reject(&mut self, status: StoreStatus, error: impl Into<String>) {
        self.status = status;
        self.error = Some(error.into());
    }

    /// Fetch success: replace the collection wholesale.
    ///
    /// `started_at` is the revision observed when the fetch was issued. A newer
    /// local revision means this snapshot may drop recent local changes; it
    /// still wins.
    pub fn replace_all(&mut self, folders: Vec<Folder>, started_at: u64) {
        if self.revision != started_at {
            tracing::warn!(
                started_at,
                revision = self.revision,
                "fetched snapshot predates local changes; replacing anyway"
            );
        }
        self.folders = folders;
        self.status = StoreStatus::Fetched;
        self.error = None;
        self.decrypt_failed = false;
        if let Some(id) = self.selected.clone() {
            if !self.contains(&id) {
                self.selected = None;
            }
        }
        self.sync.retain(|id, _| {
            self.folders
                .iter()
                .any(|f| f.notes.iter().any(|n| &n.id == id))
        });
        self.revision += 1;
    }

    /// Fetch hit the wrong key: show nothing rather than undecryptable bytes.
    pub fn mark_decrypt_failure(&mut self) {
        self.folders.clear();
        self.selected = None;
        self.sync.clear();
        self.decrypt_failed = true;
        self.status = StoreStatus::FetchRejected;
        self.error = Some("Notes could not be decrypted with the current key".to_string());
        self.revision += 1;
    }

    /// Create success: append the server's note to its folder, creating the
    /// folder if needed. Any older copy with the same id is dropped first.
    pub fn apply_created(&mut self, note: Note) {
        self.remove_everywhere(&note.id);
        match self.folders.iter_mut().find(|f| f.name == note.folder) {
            Some(folder) => folder.notes.push(note),
            None => {
                let mut folder = Folder::new(note.folder.clone());
                folder.notes.push(note);
                self.folders.push(folder);
            }
        }
        self.status = StoreStatus::Added;
        self.error = None;
        self.revision += 1;
    }

    /// Delete success: filter `id` out of every folder. Returns whether
    /// anything was removed.
    pub fn apply_deleted(&mut self, id: &str) -> bool {
        let removed = self.remove_everywhere(id);
        self.sync.remove(id);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        self.status = StoreStatus::Deleted;
        self.error = None;
        self.revision += 1;
        removed
    }

    /// Overwrite one note in place, matched by folder name and id.
    ///
    /// Returns `false` (and changes nothing) when no such note exists.
    pub fn update_note(&mut self, note: &Note) -> bool {
        let Some(slot) = self
            .folders
            .iter_mut()
            .filter(|f| f.name == note.folder)
            .flat_map(|f| f.notes.iter_mut())
            .find(|n| n.id == note.id)
        else {
            return false;
        };
        slot.title = note.title.clone();
        slot.content = note.content.clone();
        slot.datecreated = note.datecreated;
        self.revision += 1;
        true
    }

    /// Select a note as the active one. Unknown ids clear the selection.
    pub fn select(&mut self, id: Option<&str>) -> bool {
        self.selected = id.filter(|id| self.contains(id)).map(str::to_string);
        self.selected.is_some() || id.is_none()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected(&self) -> Option<&Note> {
        self.selected.as_deref().and_then(|id| self.find(id))
    }

    pub fn set_sync_state(&mut self, id: &str, state: SyncState) {
        if let SyncState::Rejected(reason) = &state {
            self.error = Some(reason.clone());
        }
        self.sync.insert(id.to_string(), state);
    }

    pub fn sync_state(&self, id: &str) -> Option<&SyncState> {
        self.sync.get(id)
    }

    fn remove_everywhere(&mut self, id: &str) -> bool {
        let mut removed = false;
        for folder in &mut self.folders {
            let before = folder.notes.len();
            folder.notes.retain(|n| n.id != id);
            removed |= folder.notes.len() != before;
        }
        removed
    }
}
