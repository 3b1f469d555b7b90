//! Client-held note key and its derivation from the account credential.
//!
//! The key is derived with Argon2id from the credential the user types at
//! login/signup. The salt is a deterministic function of the account name so
//! that every device of the same account arrives at the same key.
//!
//! The server authenticates with a login secret hashed one-way out of the
//! note key under its own blake3 context, so what the server stores and
//! receives never yields the note key.

use argon2::Argon2;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::SecretString;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{NotesError, Result};

/// Length of the note key in bytes (XChaCha20-Poly1305 key size).
pub const KEY_LENGTH: usize = 32;

/// Domain separator mixed into the per-account salt.
const SALT_DOMAIN: &str = "cipherpad/v1/";

/// Length of the per-account salt in bytes.
const SALT_LENGTH: usize = 16;

/// blake3 key-derivation context for the server login secret.
const LOGIN_SECRET_CONTEXT: &str = "cipherpad v1 server login secret";

/// Argon2id cost parameters.
///
/// The defaults balance security and login latency:
/// - Memory: 64 MB (64 * 1024 KB)
/// - Iterations: 3
/// - Parallelism: 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub memory_kb: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kb: 64 * 1024,
            iterations: 3,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Cheap parameters for tests. Never use for real accounts.
    pub fn light() -> Self {
        Self {
            memory_kb: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// The symmetric note key, or the empty sentinel when nobody is logged in.
///
/// Key material is zeroized from memory when dropped.
#[derive(Clone, Default, PartialEq, Eq, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    /// The empty sentinel returned while unauthenticated.
    pub fn empty() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Wrap raw key bytes.
    ///
    /// No length check happens here; the cipher rejects keys of the wrong size
    /// at use time so that a corrupted stored key surfaces as a `Crypto` error.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Decode a key previously produced by [`SecretKey::to_encoded`].
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim().as_bytes())
            .map_err(|e| NotesError::KeyStore(format!("Stored key is not valid base64: {}", e)))?;
        Ok(Self { bytes })
    }

    /// Encode for the durable local key store.
    pub fn to_encoded(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow the raw key bytes.
    ///
    /// Avoid storing or logging this value. Use only for immediate cipher calls.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.is_empty() { "[EMPTY]" } else { "[REDACTED]" };
        f.debug_struct("SecretKey").field("key", &state).finish()
    }
}

/// Deterministic per-account salt: the first 16 bytes of
/// `blake3("cipherpad/v1/" + account)`.
pub fn account_salt(account: &str) -> [u8; SALT_LENGTH] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(SALT_DOMAIN.as_bytes());
    hasher.update(account.trim().to_lowercase().as_bytes());
    let hash = hasher.finalize();
    let mut salt = [0u8; SALT_LENGTH];
    salt.copy_from_slice(&hash.as_bytes()[..SALT_LENGTH]);
    salt
}

/// Derive the note key for `account` from the user's credential.
///
/// Same credential + account always produces the same key.
pub fn derive_key(credential: &str, account: &str, params: KdfParams) -> Result<SecretKey> {
    if credential.is_empty() {
        return Err(NotesError::InvalidInput(
            "Credential cannot be empty".to_string(),
        ));
    }
    if account.trim().is_empty() {
        return Err(NotesError::InvalidInput(
            "Account cannot be empty".to_string(),
        ));
    }

    let argon_params = argon2::Params::new(
        params.memory_kb,
        params.iterations,
        params.parallelism,
        Some(KEY_LENGTH),
    )
    .map_err(|e| NotesError::Crypto(format!("Failed to create Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon_params,
    );

    let salt = account_salt(account);
    let mut key_bytes = vec![0u8; KEY_LENGTH];
    argon2
        .hash_password_into(credential.as_bytes(), &salt, &mut key_bytes)
        .map_err(|e| NotesError::Crypto(format!("Key derivation failed: {}", e)))?;

    Ok(SecretKey::from_bytes(key_bytes))
}

/// The secret sent to the server's login/signup endpoints in place of the
/// credential. One-way from `key`, and distinct from it.
pub fn login_secret(key: &SecretKey) -> Result<SecretString> {
    if key.is_empty() {
        return Err(NotesError::Crypto(
            "Cannot derive a login secret without a key".to_string(),
        ));
    }
    let mut bytes = blake3::derive_key(LOGIN_SECRET_CONTEXT, key.as_bytes());
    let secret = STANDARD.encode(bytes);
    bytes.zeroize();
    Ok(SecretString::from(secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_derivation_deterministic() {
        let key1 = derive_key("p@55word", "me@example.com", KdfParams::light()).unwrap();
        let key2 = derive_key("p@55word", "me@example.com", KdfParams::light()).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());
        assert_eq!(key1.as_bytes().len(), KEY_LENGTH);
    }

    #[test]
    fn test_account_normalized_for_salt() {
        assert_eq!(account_salt("Me@Example.com "), account_salt("me@example.com"));
    }

    #[test]
    fn test_different_account_different_key() {
        let key1 = derive_key("p@55word", "a@example.com", KdfParams::light()).unwrap();
        let key2 = derive_key("p@55word", "b@example.com", KdfParams::light()).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_different_credential_different_key() {
        let key1 = derive_key("credential-one", "me@example.com", KdfParams::light()).unwrap();
        let key2 = derive_key("credential-two", "me@example.com", KdfParams::light()).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_empty_credential_rejected() {
        let result = derive_key("", "me@example.com", KdfParams::light());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Credential cannot be empty"));
    }

    #[test]
    fn test_login_secret_is_not_the_key() {
        use secrecy::ExposeSecret;

        let key = derive_key("p@55word", "me@example.com", KdfParams::light()).unwrap();
        let secret = login_secret(&key).unwrap();
        assert_eq!(
            secret.expose_secret(),
            login_secret(&key).unwrap().expose_secret()
        );
        assert_ne!(secret.expose_secret(), key.to_encoded());
        assert!(!secret.expose_secret().contains("p@55word"));

        let other = derive_key("p@55word", "you@example.com", KdfParams::light()).unwrap();
        assert_ne!(
            secret.expose_secret(),
            login_secret(&other).unwrap().expose_secret()
        );
        assert!(login_secret(&SecretKey::empty()).is_err());
    }

    #[test]
    fn test_encoded_round_trip() {
        let key = derive_key("p@55word", "me@example.com", KdfParams::light()).unwrap();
        let decoded = SecretKey::from_encoded(&key.to_encoded()).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_debug_redacts() {
        let key = derive_key("p@55word", "me@example.com", KdfParams::light()).unwrap();
        let debug_output = format!("{:?}", key);
        assert!(debug_output.contains("REDACTED"));

        let key_hex = hex::encode(&key.as_bytes()[..4]);
        assert!(!debug_output.contains(&key_hex));
        assert!(format!("{:?}", SecretKey::empty()).contains("EMPTY"));
    }
}
