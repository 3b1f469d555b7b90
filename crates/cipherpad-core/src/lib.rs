//! # Cipherpad Core
//!
//! Core library for Cipherpad - an end-to-end encrypted note client that keeps
//! notes in sync across devices without the server ever seeing plaintext.
//!
//! This crate provides the encryption, key handling, REST and real-time sync
//! logic independent of any front end.
//!
//! ## Architecture
//!
//! - **crypto**: Field cipher (XChaCha20-Poly1305) and Argon2id key derivation
//! - **keys**: Client-only key manager and durable local key stores
//! - **remote**: REST transport, auth client and the encrypting fetcher
//! - **store**: Decrypted folder/note working set and status bookkeeping
//! - **sync**: Duplex sync channel with heartbeat, reconnect and offline queue
//! - **editor**: Debounced flushing of local edits
//! - **session**: Per-account session context tying the above together

pub mod config;
pub mod crypto;
pub mod editor;
pub mod error;
pub mod fs;
pub mod keys;
pub mod remote;
pub mod session;
pub mod store;
pub mod sync;
pub mod types;

pub use error::{NotesError, Result};
pub use keys::KeyManager;
pub use session::{NotesSession, SessionOptions};
pub use store::{NoteStore, StoreStatus, SyncState};
pub use types::{Folder, NewNote, Note};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
