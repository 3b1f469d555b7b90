use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use cipherpad_core::config::{DebounceConfig, SyncConfig};

use crate::constants::{env, DEFAULT_SERVER_URL};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CipherpadConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub account: AccountSection,
    #[serde(default)]
    pub keystore: KeystoreSection,
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub editor: EditorSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerSection {
    pub url: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AccountSection {
    pub email: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct KeystoreSection {
    #[serde(default)]
    pub backend: KeystoreBackend,
    pub path: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeystoreBackend {
    #[default]
    Keychain,
    File,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    pub ping_interval_ms: u64,
    pub reconnect_delay_ms: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        let defaults = SyncConfig::default();
        Self {
            ping_interval_ms: defaults.ping_interval.as_millis() as u64,
            reconnect_delay_ms: defaults.reconnect_delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSection {
    pub content_debounce_ms: u64,
    pub title_debounce_ms: u64,
}

impl Default for EditorSection {
    fn default() -> Self {
        let defaults = DebounceConfig::default();
        Self {
            content_debounce_ms: defaults.content.as_millis() as u64,
            title_debounce_ms: defaults.title.as_millis() as u64,
        }
    }
}

impl CipherpadConfig {
    /// Heartbeat and reconnect timing. Both must be positive.
    pub fn sync_config(&self) -> anyhow::Result<SyncConfig> {
        Ok(SyncConfig {
            ping_interval: positive_millis("sync.ping_interval_ms", self.sync.ping_interval_ms)?,
            reconnect_delay: positive_millis(
                "sync.reconnect_delay_ms",
                self.sync.reconnect_delay_ms,
            )?,
        })
    }

    /// Debounce windows. Both must be positive.
    pub fn debounce_config(&self) -> anyhow::Result<DebounceConfig> {
        Ok(DebounceConfig {
            content: positive_millis(
                "editor.content_debounce_ms",
                self.editor.content_debounce_ms,
            )?,
            title: positive_millis("editor.title_debounce_ms", self.editor.title_debounce_ms)?,
        })
    }
}

fn positive_millis(key: &str, value: u64) -> anyhow::Result<Duration> {
    if value == 0 {
        anyhow::bail!("{} must be greater than zero", key);
    }
    Ok(Duration::from_millis(value))
}

/// Config file location: `CIPHERPAD_CONFIG`, else the XDG config dir.
pub fn config_path() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var(env::CONFIG) {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_session_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("session.json"))
}

pub fn default_keyfile_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("keys.json"))
}

/// Read the config, or the defaults if the file does not exist yet.
pub fn load_config(path: &Path) -> anyhow::Result<CipherpadConfig> {
    if !path.exists() {
        return Ok(CipherpadConfig::default());
    }
    read_config(path)
}

pub fn read_config(path: &Path) -> anyhow::Result<CipherpadConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

pub fn write_config(path: &Path, config: &CipherpadConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            anyhow::anyhow!(
                "Failed to create config directory {}: {}",
                parent.display(),
                e
            )
        })?;
    }
    let contents =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {}", e))?;
    std::fs::write(path, contents)
        .map_err(|e| anyhow::anyhow!("Failed to write config {}: {}", path.display(), e))?;
    Ok(())
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("cipherpad"));
        }
    }
    Ok(home_dir()?.join(".config").join("cipherpad"))
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("cipherpad"));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join("cipherpad"))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}
