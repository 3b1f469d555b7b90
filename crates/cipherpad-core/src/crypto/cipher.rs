//! Field-level authenticated encryption for note titles and content.
//!
//! Uses XChaCha20-Poly1305 with a random 24-byte nonce per call, so the same
//! plaintext encrypted twice under one key yields unrelated ciphertexts.
//!
//! Wire format of one encrypted field (standard base64):
//!   [ nonce (24 bytes) | ciphertext + tag (16 bytes) ]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    XChaCha20Poly1305, XNonce,
};

use super::key::{SecretKey, KEY_LENGTH};
use crate::error::{NotesError, Result};

const NONCE_LENGTH: usize = 24;
const TAG_LENGTH: usize = 16;

fn cipher_for(key: &SecretKey) -> Result<XChaCha20Poly1305> {
    if key.is_empty() {
        return Err(NotesError::Crypto("No encryption key is set".to_string()));
    }
    if key.as_bytes().len() != KEY_LENGTH {
        return Err(NotesError::Crypto(format!(
            "Encryption key must be {} bytes (got {})",
            KEY_LENGTH,
            key.as_bytes().len()
        )));
    }
    XChaCha20Poly1305::new_from_slice(key.as_bytes())
        .map_err(|e| NotesError::Crypto(format!("Failed to create cipher: {}", e)))
}

/// Encrypt one text field.
///
/// # Errors
///
/// Returns `NotesError::Crypto` if the key is empty or has the wrong length.
/// Nothing is produced in that case, so callers can never fall back to
/// transmitting plaintext.
///
/// # Examples
///
/// ```
/// use cipherpad_core::crypto::{decrypt, derive_key, encrypt, KdfParams};
///
/// let key = derive_key("p@55word", "me@example.com", KdfParams::light()).unwrap();
/// let sealed = encrypt("groceries", &key).unwrap();
/// assert_eq!(decrypt(&sealed, &key).unwrap(), "groceries");
/// ```
pub fn encrypt(plaintext: &str, key: &SecretKey) -> Result<String> {
    let cipher = cipher_for(key)?;
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| NotesError::Crypto("Encryption failed".to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(out))
}

/// Decrypt one text field.
///
/// Failure is binary: any malformed encoding, truncated input, wrong key or
/// flipped bit yields `NotesError::Decrypt` and no plaintext at all.
///
/// # Errors
///
/// Returns `NotesError::Crypto` if the key itself is unusable, and
/// `NotesError::Decrypt` for every ciphertext-side failure.
pub fn decrypt(ciphertext: &str, key: &SecretKey) -> Result<String> {
    let cipher = cipher_for(key)?;

    let data = STANDARD
        .decode(ciphertext.as_bytes())
        .map_err(|_| NotesError::Decrypt)?;
    if data.len() < NONCE_LENGTH + TAG_LENGTH {
        return Err(NotesError::Decrypt);
    }

    let (nonce_bytes, sealed) = data.split_at(NONCE_LENGTH);
    let nonce = XNonce::from_slice(nonce_bytes);
    let plaintext = cipher
        .decrypt(nonce, sealed)
        .map_err(|_| NotesError::Decrypt)?;

    String::from_utf8(plaintext).map_err(|_| NotesError::Decrypt)
}
