//! One logged-in account's working session.
//!
//! `NotesSession` owns the collaborators that used to be process-wide state:
//! key manager, REST fetcher, note store, sync channel and edit debouncer.
//! [`NotesSession::start`] is the explicit init; [`shutdown`](NotesSession::shutdown)
//! and [`logout`](NotesSession::logout) are the explicit teardown.

use std::sync::Arc;

use crate::config::{DebounceConfig, SyncConfig};
use crate::editor::EditDebouncer;
use crate::error::{NotesError, Result};
use crate::keys::KeyManager;
use crate::remote::{FetchOutcome, NoteTransport, RemoteFetcher};
use crate::store::{NoteStore, SharedStore, StoreStatus};
use crate::sync::{ConnectionState, Connector, SyncChannel};
use crate::types::{NewNote, Note};

/// Timing knobs for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub sync: SyncConfig,
    pub debounce: DebounceConfig,
}

pub struct NotesSession {
    keys: Arc<KeyManager>,
    fetcher: RemoteFetcher,
    store: SharedStore,
    channel: Arc<SyncChannel>,
    editor: EditDebouncer,
}

impl NotesSession {
    /// Start a session for an unlocked key. Spawns the sync channel and the
    /// debouncer, so this must run inside a Tokio runtime.
    pub fn start(
        keys: Arc<KeyManager>,
        transport: Arc<dyn NoteTransport>,
        connector: Arc<dyn Connector>,
        options: SessionOptions,
    ) -> Result<Self> {
        if !keys.is_unlocked() {
            return Err(NotesError::NotAuthenticated);
        }
        let store = NoteStore::shared();
        let channel = Arc::new(SyncChannel::open(connector, options.sync)?);
        let editor = EditDebouncer::spawn(
            store.clone(),
            keys.clone(),
            channel.clone(),
            options.debounce,
        );
        tracing::debug!(account = ?keys.account(), "session started");
        Ok(Self {
            keys,
            fetcher: RemoteFetcher::new(transport),
            store,
            channel,
            editor,
        })
    }

    pub fn keys(&self) -> &KeyManager {
        &self.keys
    }

    pub fn store(&self) -> SharedStore {
        self.store.clone()
    }

    pub fn channel(&self) -> &SyncChannel {
        &self.channel
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    /// Fetch everything and replace the store's collection.
    pub async fn refresh(&self) -> Result<FetchOutcome> {
        let started = {
            let mut store = self.store.lock();
            store.begin(StoreStatus::Fetching);
            store.revision()
        };
        match self.fetcher.fetch_all(&self.keys.get_key()).await {
            Ok(FetchOutcome::Decrypted(folders)) => {
                self.store.lock().replace_all(folders.clone(), started);
                Ok(FetchOutcome::Decrypted(folders))
            }
            Ok(FetchOutcome::DecryptFailed) => {
                self.store.lock().mark_decrypt_failure();
                Ok(FetchOutcome::DecryptFailed)
            }
            Err(e) => {
                self.store
                    .lock()
                    .reject(StoreStatus::FetchRejected, e.to_string());
                Err(e)
            }
        }
    }

    /// Create a note remotely, then add the server's copy to the store.
    pub async fn create_note(&self, note: NewNote) -> Result<Note> {
        self.store.lock().begin(StoreStatus::Adding);
        match self.fetcher.create(&note, &self.keys.get_key()).await {
            Ok(created) => {
                self.store.lock().apply_created(created.clone());
                Ok(created)
            }
            Err(e) => {
                self.store.lock().reject(StoreStatus::AddRejected, e.to_string());
                Err(e)
            }
        }
    }

    /// Delete a note remotely; it leaves the store only once the server confirms.
    pub async fn delete_note(&self, id: &str) -> Result<()> {
        self.store.lock().begin(StoreStatus::Deleting);
        match self.fetcher.delete(id).await {
            Ok(deleted) => {
                if deleted != id {
                    tracing::warn!(
                        requested = id,
                        confirmed = %deleted,
                        "server confirmed a different note id"
                    );
                }
                self.store.lock().apply_deleted(id);
                Ok(())
            }
            Err(e) => {
                self.store
                    .lock()
                    .reject(StoreStatus::DeleteRejected, e.to_string());
                Err(e)
            }
        }
    }

    /// Make `id` the active note for subsequent edits (`None` deselects).
    pub fn select(&self, id: Option<&str>) -> Result<()> {
        if let Some(id) = id {
            if !self.store.lock().select(Some(id)) {
                return Err(NotesError::NotFound(format!("note {}", id)));
            }
        }
        self.editor.select(id)
    }

    pub fn edit_title(&self, title: impl Into<String>) -> Result<()> {
        self.editor.edit_title(title)
    }

    pub fn edit_content(&self, content: impl Into<String>) -> Result<()> {
        self.editor.edit_content(content)
    }

    /// Flush pending edits without waiting for their windows.
    pub async fn flush_edits(&self) -> Result<()> {
        self.editor.flush().await
    }

    /// Register a handler for raw inbound sync messages.
    pub fn on_inbound<F>(&self, handler: F) -> Result<()>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.channel.receive(handler)
    }

    /// Stop background tasks, keeping the stored key for the next start.
    pub async fn shutdown(self) {
        self.stop().await;
        tracing::debug!("session shut down");
    }

    /// Stop background tasks and forget the key.
    pub async fn logout(self) -> Result<()> {
        self.stop().await;
        self.keys.forget()
    }

    async fn stop(&self) {
        self.editor.close().await;
        self.channel.close().await;
    }
}

impl std::fmt::Debug for NotesSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotesSession")
            .field("keys", &self.keys)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
