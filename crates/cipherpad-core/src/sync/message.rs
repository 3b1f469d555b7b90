//! Messages carried by the sync channel.

use serde::{Deserialize, Serialize};

use crate::crypto::SecretKey;
use crate::error::{NotesError, Result};
use crate::types::{Note, SealedNote};

/// Outbound wire message. Closed set: any other `type` tag is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SyncMessage {
    /// `{ "type": "modify", "new": <note with ciphertext fields> }`
    Modify {
        #[serde(rename = "new")]
        note: SealedNote,
    },

    /// `{ "type": "ping" }`
    Ping,
}

impl SyncMessage {
    /// Validate and decode a message at the deserialization boundary.
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| NotesError::Protocol(format!("Invalid sync message: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::Modify { .. } => "modify",
            SyncMessage::Ping => "ping",
        }
    }
}

/// A message as the caller hands it to the channel, before encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Modify(Note),
    Ping,
}

impl Outgoing {
    /// Encrypt note fields; an unusable key aborts here, before anything is queued.
    pub fn seal(&self, key: &SecretKey) -> Result<SyncMessage> {
        match self {
            Outgoing::Modify(note) => Ok(SyncMessage::Modify {
                note: note.seal(key)?,
            }),
            Outgoing::Ping => Ok(SyncMessage::Ping),
        }
    }
}
