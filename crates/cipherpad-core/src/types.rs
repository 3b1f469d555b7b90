//! Core data types for notes and folders.
//!
//! Plaintext types (`Note`, `NewNote`, `Folder`) only ever live in client
//! memory. Their `Sealed*` counterparts carry ciphertext in `title` and
//! `content` and are the only shapes that cross the network.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{decrypt, encrypt, SecretKey};
use crate::error::Result;

/// Folder name for unfiled notes.
pub const ROOT_FOLDER: &str = "root";

/// Map an empty folder name to the unfiled sentinel.
pub fn normalize_folder(folder: &str) -> String {
    let trimmed = folder.trim();
    if trimmed.is_empty() {
        ROOT_FOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

/// A decrypted note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// Server-assigned identifier
    pub id: String,

    pub title: String,

    pub content: String,

    /// Name of the folder holding this note
    pub folder: String,

    /// When this note was created (client clock)
    pub datecreated: DateTime<Utc>,
}

/// Builder for notes that do not have a server id yet.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub folder: String,
    pub datecreated: DateTime<Utc>,
}

impl NewNote {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: String::new(),
            folder: ROOT_FOLDER.to_string(),
            datecreated: Utc::now(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn in_folder(mut self, folder: impl AsRef<str>) -> Self {
        self.folder = normalize_folder(folder.as_ref());
        self
    }

    /// Encrypt title and content for `POST /note`.
    pub fn seal(&self, key: &SecretKey) -> Result<SealedNote> {
        Ok(SealedNote {
            id: None,
            title: encrypt(&self.title, key)?,
            content: encrypt(&self.content, key)?,
            folder: normalize_folder(&self.folder),
            datecreated: self.datecreated,
        })
    }
}

/// A note as it travels over the wire: `title` and `content` are ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedNote {
    /// Absent until the server assigns one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub title: String,

    pub content: String,

    #[serde(default)]
    pub folder: String,

    pub datecreated: DateTime<Utc>,
}

impl SealedNote {
    /// Decrypt both fields. Either both succeed or the whole note fails.
    pub fn open(&self, key: &SecretKey) -> Result<Note> {
        let title = decrypt(&self.title, key)?;
        let content = decrypt(&self.content, key)?;
        Ok(Note {
            id: self.id.clone().unwrap_or_default(),
            title,
            content,
            folder: normalize_folder(&self.folder),
            datecreated: self.datecreated,
        })
    }
}

impl Note {
    /// Encrypt title and content for a sync `modify` message.
    pub fn seal(&self, key: &SecretKey) -> Result<SealedNote> {
        Ok(SealedNote {
            id: Some(self.id.clone()),
            title: encrypt(&self.title, key)?,
            content: encrypt(&self.content, key)?,
            folder: self.folder.clone(),
            datecreated: self.datecreated,
        })
    }
}

/// A named group of decrypted notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub name: String,
    pub notes: Vec<Note>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notes: Vec::new(),
        }
    }
}

/// A folder as returned by `GET /notes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedFolder {
    pub name: String,

    #[serde(default)]
    pub notes: Vec<SealedNote>,
}
