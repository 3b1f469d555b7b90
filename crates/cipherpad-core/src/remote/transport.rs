//! REST transport seam.
//!
//! Implementations move sealed (ciphertext) shapes only; encryption and
//! decryption happen one layer up in [`RemoteFetcher`](super::RemoteFetcher).

use futures_util::future::BoxFuture;

use crate::error::Result;
use crate::types::{SealedFolder, SealedNote};

pub trait NoteTransport: Send + Sync {
    /// `GET /notes`
    fn fetch_folders(&self) -> BoxFuture<'_, Result<Vec<SealedFolder>>>;

    /// `POST /note`, returning the server's stored copy.
    fn create_note(&self, note: SealedNote) -> BoxFuture<'_, Result<SealedNote>>;

    /// `DELETE /note/{id}`, returning the deleted id.
    fn delete_note(&self, id: String) -> BoxFuture<'_, Result<String>>;
}
