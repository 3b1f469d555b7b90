//! Runtime settings for the sync engine.
//!
//! These are plain values with defaults; the CLI fills them from its TOML
//! config file.

use std::time::Duration;

use reqwest::Url;

use crate::error::{NotesError, Result};

/// Default heartbeat and reconnect period.
pub const DEFAULT_SYNC_PERIOD: Duration = Duration::from_secs(5);

/// Default quiet period before a content edit is flushed.
pub const DEFAULT_CONTENT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Default quiet period before a title edit is flushed.
pub const DEFAULT_TITLE_DEBOUNCE: Duration = Duration::from_millis(1);

/// Sync channel timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Interval between `ping` messages while connected
    pub ping_interval: Duration,

    /// Fixed delay between a disconnect and the next connection attempt
    pub reconnect_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ping_interval: DEFAULT_SYNC_PERIOD,
            reconnect_delay: DEFAULT_SYNC_PERIOD,
        }
    }
}

impl SyncConfig {
    /// Both periods must be non-zero: a zero heartbeat cannot be scheduled
    /// and a zero reconnect delay would spin against a dead server.
    pub fn validate(&self) -> Result<()> {
        if self.ping_interval.is_zero() {
            return Err(NotesError::InvalidInput(
                "Ping interval must be greater than zero".to_string(),
            ));
        }
        if self.reconnect_delay.is_zero() {
            return Err(NotesError::InvalidInput(
                "Reconnect delay must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Edit debounce windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    pub content: Duration,
    pub title: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            content: DEFAULT_CONTENT_DEBOUNCE,
            title: DEFAULT_TITLE_DEBOUNCE,
        }
    }
}

/// URLs of the note server, derived from its REST base (e.g. `http://localhost:3000/api`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    base: Url,
}

impl ServerEndpoint {
    pub fn parse(base: &str) -> Result<Self> {
        let trimmed = base.trim().trim_end_matches('/');
        let base = Url::parse(trimmed)
            .map_err(|e| NotesError::InvalidInput(format!("Invalid server URL {}: {}", base, e)))?;
        match base.scheme() {
            "http" | "https" => Ok(Self { base }),
            other => Err(NotesError::InvalidInput(format!(
                "Server URL must use http or https (got {})",
                other
            ))),
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Build `<base>/<path>`.
    pub fn url(&self, path: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| NotesError::InvalidInput(format!("Invalid URL {}: {}", joined, e)))
    }

    /// `GET` target for the bulk fetch.
    pub fn notes(&self) -> Result<Url> {
        self.url("notes")
    }

    /// `POST` target for note creation.
    pub fn note(&self) -> Result<Url> {
        self.url("note")
    }

    /// `DELETE` target for one note.
    pub fn note_by_id(&self, id: &str) -> Result<Url> {
        if id.is_empty() || id.contains('/') {
            return Err(NotesError::InvalidInput(format!("Invalid note id: {:?}", id)));
        }
        self.url(&format!("note/{}", id))
    }

    /// Duplex connection target: same host, `ws`/`wss` scheme, `/notes/socket`.
    pub fn socket(&self) -> Result<Url> {
        let mut url = self.url("notes/socket")?;
        let scheme = if self.base.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| NotesError::InvalidInput(format!("Cannot derive socket URL from {}", self.base)))?;
        Ok(url)
    }
}
