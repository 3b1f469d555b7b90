//! Local secrets: the keychain-backed key store, the saved server session and
//! credential prompts.

use std::io::IsTerminal;
use std::path::Path;

use dialoguer::{Input, Password};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use cipherpad_core::fs::write_private;
use cipherpad_core::keys::KeyStore;
use cipherpad_core::NotesError;

use crate::constants::{env, KEYCHAIN_SERVICE};
use crate::errors::CliError;

/// Note keys held in the OS keychain, one entry per account.
#[derive(Debug, Default)]
pub struct KeychainStore;

impl KeyStore for KeychainStore {
    fn load(&self, account: &str) -> cipherpad_core::Result<Option<String>> {
        keychain_get(account).map_err(keystore_error)
    }

    fn save(&self, account: &str, encoded_key: &str) -> cipherpad_core::Result<()> {
        keychain_set(account, encoded_key).map_err(keystore_error)
    }

    fn clear(&self, account: &str) -> cipherpad_core::Result<()> {
        keychain_clear(account).map_err(keystore_error)
    }
}

fn keystore_error(err: anyhow::Error) -> NotesError {
    NotesError::KeyStore(err.to_string())
}

pub fn keychain_get(account: &str) -> anyhow::Result<Option<String>> {
    let entry = keychain_entry(account)?;
    match entry.get_password() {
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(anyhow::anyhow!("Keychain read failed: {}", err)),
    }
}

pub fn keychain_set(account: &str, encoded_key: &str) -> anyhow::Result<()> {
    let entry = keychain_entry(account)?;
    entry
        .set_password(encoded_key)
        .map_err(|e| anyhow::anyhow!("Keychain write failed: {}", e))
}

pub fn keychain_clear(account: &str) -> anyhow::Result<()> {
    let entry = keychain_entry(account)?;
    match entry.delete_password() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(err) => Err(anyhow::anyhow!("Keychain delete failed: {}", err)),
    }
}

fn keychain_entry(account: &str) -> anyhow::Result<keyring::Entry> {
    keyring::Entry::new(KEYCHAIN_SERVICE, account)
        .map_err(|e| anyhow::anyhow!("Keychain entry failed: {}", e))
}

/// Server session kept between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    pub account: String,
    /// REST base URL the cookie was issued for
    pub server: String,
    /// `name=value` pairs as sent in a `Cookie` header
    pub cookie: String,
}

pub fn read_session(path: &Path) -> anyhow::Result<Option<SavedSession>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read session {}: {}", path.display(), e))?;
    let session = serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse session {}: {}", path.display(), e))?;
    Ok(Some(session))
}

pub fn write_session(path: &Path, session: &SavedSession) -> anyhow::Result<()> {
    let contents = serde_json::to_vec_pretty(session)?;
    write_private(path, &contents)
        .map_err(|e| anyhow::anyhow!("Failed to write session {}: {}", path.display(), e))
}

pub fn clear_session(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::anyhow!(
            "Failed to remove session {}: {}",
            path.display(),
            e
        )),
    }
}

/// Account credential from `CIPHERPAD_PASSWORD`, else an interactive prompt.
pub fn read_credential(confirm: bool) -> anyhow::Result<SecretString> {
    if let Ok(value) = std::env::var(env::PASSWORD) {
        if !value.is_empty() {
            return Ok(SecretString::from(value));
        }
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::auth_failed_with_hint(
            "No credential available",
            format!("Set {} when running non-interactively", env::PASSWORD),
        )
        .into());
    }

    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Repeat password", "Passwords do not match");
    }
    let credential = prompt.interact()?;
    if credential.is_empty() {
        return Err(CliError::invalid_input("Password cannot be empty").into());
    }
    Ok(SecretString::from(credential))
}

/// Use `value` if given, else prompt for it on a terminal.
pub fn value_or_prompt(value: Option<String>, label: &str) -> anyhow::Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::invalid_input(format!(
            "{} is required (pass --{})",
            label,
            label.to_lowercase()
        ))
        .into());
    }
    Ok(Input::<String>::new().with_prompt(label).interact_text()?)
}
