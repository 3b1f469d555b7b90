//! Client-only key management.
//!
//! `KeyManager` owns the note key for the lifetime of a logged-in session.
//! The key is read by cipher call sites only: no REST body or sync message
//! type in this crate has a field that could carry it.

mod store;

pub use store::{FileKeyStore, KeyStore, MemoryKeyStore};

use parking_lot::RwLock;

use crate::crypto::{derive_key, KdfParams, SecretKey};
use crate::error::{NotesError, Result};

#[derive(Default)]
struct KeyState {
    account: Option<String>,
    key: SecretKey,
}

/// Holds the session's note key in memory and mirrors it to a durable
/// local [`KeyStore`] keyed by account.
pub struct KeyManager {
    store: Box<dyn KeyStore>,
    kdf: KdfParams,
    state: RwLock<KeyState>,
}

impl KeyManager {
    pub fn new(store: Box<dyn KeyStore>) -> Self {
        Self::with_kdf(store, KdfParams::default())
    }

    pub fn with_kdf(store: Box<dyn KeyStore>, kdf: KdfParams) -> Self {
        Self {
            store,
            kdf,
            state: RwLock::new(KeyState::default()),
        }
    }

    /// Store `key` in memory and in the durable store under `account`.
    pub fn set_key(&self, account: &str, key: SecretKey) -> Result<()> {
        if key.is_empty() {
            return Err(NotesError::InvalidInput(
                "Refusing to store an empty key".to_string(),
            ));
        }
        self.store.save(account, &key.to_encoded())?;
        let mut state = self.state.write();
        state.account = Some(account.to_string());
        state.key = key;
        tracing::debug!(account, "note key set");
        Ok(())
    }

    /// Current key, or the empty sentinel when unauthenticated.
    pub fn get_key(&self) -> SecretKey {
        self.state.read().key.clone()
    }

    /// Account the current key belongs to.
    pub fn account(&self) -> Option<String> {
        self.state.read().account.clone()
    }

    pub fn is_unlocked(&self) -> bool {
        !self.state.read().key.is_empty()
    }

    /// Derive the key for `account` with this manager's cost parameters,
    /// without storing it.
    pub fn derive(&self, account: &str, credential: &str) -> Result<SecretKey> {
        derive_key(credential, account, self.kdf)
    }

    /// Derive the key from the credential typed at login/signup and set it.
    pub fn unlock(&self, account: &str, credential: &str) -> Result<()> {
        let key = self.derive(account, credential)?;
        self.set_key(account, key)
    }

    /// Load a previously stored key for `account` (startup path).
    ///
    /// Returns `false` when the store has nothing for this account.
    pub fn restore(&self, account: &str) -> Result<bool> {
        let Some(encoded) = self.store.load(account)? else {
            return Ok(false);
        };
        let key = SecretKey::from_encoded(&encoded)?;
        let mut state = self.state.write();
        state.account = Some(account.to_string());
        state.key = key;
        tracing::debug!(account, "note key restored from local store");
        Ok(true)
    }

    /// Logout: drop the key from memory and from the durable store.
    pub fn forget(&self) -> Result<()> {
        let account = {
            let mut state = self.state.write();
            state.key = SecretKey::empty();
            state.account.take()
        };
        if let Some(account) = account {
            self.store.clear(&account)?;
            tracing::debug!(account = %account, "note key forgotten");
        }
        Ok(())
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("KeyManager")
            .field("account", &state.account)
            .field("key", &state.key)
            .finish()
    }
}
