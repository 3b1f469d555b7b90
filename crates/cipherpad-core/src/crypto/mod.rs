//! Cryptographic operations for cipherpad.
//!
//! - **XChaCha20-Poly1305**: authenticated encryption of each note field
//! - **Argon2id**: memory-hard derivation of the note key from the credential
//! - **blake3**: one-way login secret sent to the server instead of the credential
//!
//! ## Threat Model
//!
//! We defend against:
//! - The note server (or anyone reading its database or traffic) learning
//!   note titles or content
//! - Undetected modification of stored ciphertext
//!
//! The credential itself never leaves the device. The server sees only the
//! login secret, a blake3 derivation of the note key that cannot be turned
//! back into it.
//!
//! We do NOT defend against:
//! - Compromised client device / keylogger
//! - Offline guessing of weak credentials: the salt is public, so a server
//!   holding the login secret can test guesses at the cost of one Argon2id
//!   run each
//! - Metadata: folder names, note ids, timestamps and edit timing are visible
//!   to the server

pub mod cipher;
pub mod key;

pub use cipher::{decrypt, encrypt};
pub use key::{account_salt, derive_key, login_secret, KdfParams, SecretKey, KEY_LENGTH};
