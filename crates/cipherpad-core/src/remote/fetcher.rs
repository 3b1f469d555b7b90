use std::sync::Arc;

use super::transport::NoteTransport;
use crate::crypto::SecretKey;
use crate::error::{NotesError, Result};
use crate::types::{Folder, NewNote, Note};

/// Result of a bulk fetch.
///
/// A key that cannot open the stored ciphertext yields `DecryptFailed`,
/// never an empty `Decrypted` list and never a partial one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Decrypted(Vec<Folder>),
    DecryptFailed,
}

impl FetchOutcome {
    pub fn is_decrypt_failure(&self) -> bool {
        matches!(self, FetchOutcome::DecryptFailed)
    }
}

/// REST operations with encryption applied at the boundary.
///
/// No retries: transport failures surface as `NotesError::Network` and the
/// caller's local state is left as it was.
#[derive(Clone)]
pub struct RemoteFetcher {
    transport: Arc<dyn NoteTransport>,
}

impl RemoteFetcher {
    pub fn new(transport: Arc<dyn NoteTransport>) -> Self {
        Self { transport }
    }

    /// Fetch and decrypt every folder.
    pub async fn fetch_all(&self, key: &SecretKey) -> Result<FetchOutcome> {
        require_key(key)?;
        let sealed = self.transport.fetch_folders().await?;

        let mut folders = Vec::with_capacity(sealed.len());
        for sealed_folder in sealed {
            let mut folder = Folder::new(sealed_folder.name);
            for sealed_note in &sealed_folder.notes {
                match sealed_note.open(key) {
                    Ok(note) => folder.notes.push(note),
                    Err(NotesError::Decrypt) => {
                        tracing::warn!(
                            folder = %folder.name,
                            note = sealed_note.id.as_deref().unwrap_or(""),
                            "stored note does not decrypt with the current key"
                        );
                        return Ok(FetchOutcome::DecryptFailed);
                    }
                    Err(e) => return Err(e),
                }
            }
            folders.push(folder);
        }

        tracing::debug!(folders = folders.len(), "fetched notes");
        Ok(FetchOutcome::Decrypted(folders))
    }

    /// Encrypt and create `note`, returning the server's decrypted echo.
    pub async fn create(&self, note: &NewNote, key: &SecretKey) -> Result<Note> {
        require_key(key)?;
        let stored = self.transport.create_note(note.seal(key)?).await?;
        if stored.id.as_deref().map_or(true, str::is_empty) {
            return Err(NotesError::Protocol(
                "Server did not assign an id to the created note".to_string(),
            ));
        }
        let created = stored.open(key)?;
        tracing::debug!(id = %created.id, folder = %created.folder, "note created");
        Ok(created)
    }

    /// Delete `id` remotely. Purging it locally is the caller's job.
    pub async fn delete(&self, id: &str) -> Result<String> {
        let deleted = self.transport.delete_note(id.to_string()).await?;
        tracing::debug!(id = %deleted, "note deleted");
        Ok(deleted)
    }
}

impl std::fmt::Debug for RemoteFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFetcher").finish_non_exhaustive()
    }
}

fn require_key(key: &SecretKey) -> Result<()> {
    if key.is_empty() {
        return Err(NotesError::NotAuthenticated);
    }
    Ok(())
}
