//! Error types for cipherpad core operations.
//!
//! This module defines the error hierarchy for all core operations.
//! Errors are descriptive at the core level; the CLI layer will map these
//! to user-friendly messages and exit codes.

use thiserror::Error;

/// Result type alias for cipherpad operations.
pub type Result<T> = std::result::Result<T, NotesError>;

/// Core error type for cipherpad operations.
#[derive(Debug, Error)]
pub enum NotesError {
    /// Encryption attempted without a usable key, or cipher setup failed
    #[error("Encryption error: {0}")]
    Crypto(String),

    /// Authentication tag mismatch: wrong key or tampered ciphertext
    #[error("Decryption failed (wrong key or tampered ciphertext)")]
    Decrypt,

    /// REST or socket transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Unexpected response or malformed sync payload
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Durable key store failure
    #[error("Key store error: {0}")]
    KeyStore(String),

    /// The server has no such note or account
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation requires a logged-in session with a key
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The sync channel task is no longer running
    #[error("Sync channel closed")]
    ChannelClosed,

    /// Invalid user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl NotesError {
    /// Whether this error means the key does not match the stored ciphertext.
    pub fn is_decrypt_failure(&self) -> bool {
        matches!(self, NotesError::Decrypt)
    }
}

impl From<reqwest::Error> for NotesError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            NotesError::Protocol(err.to_string())
        } else {
            NotesError::Network(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for NotesError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        NotesError::Network(err.to_string())
    }
}
