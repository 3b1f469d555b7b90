//! In-memory stand-ins for the note server and its socket.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use cipherpad_core::crypto::{derive_key, KdfParams, SecretKey};
use cipherpad_core::keys::{KeyManager, MemoryKeyStore};
use cipherpad_core::remote::NoteTransport;
use cipherpad_core::sync::{Connector, Link, SyncMessage};
use cipherpad_core::types::{normalize_folder, NewNote, SealedFolder, SealedNote};
use cipherpad_core::{NotesError, Result};
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const ACCOUNT: &str = "tester@example.com";
pub const CREDENTIAL: &str = "p@55word";

pub fn key_for(credential: &str) -> SecretKey {
    derive_key(credential, ACCOUNT, KdfParams::light()).expect("derive key")
}

pub fn unlocked_keys(credential: &str) -> Arc<KeyManager> {
    let keys = KeyManager::with_kdf(Box::new(MemoryKeyStore::new()), KdfParams::light());
    keys.unlock(ACCOUNT, credential).expect("unlock");
    Arc::new(keys)
}

/// Note server holding ciphertext only.
#[derive(Default)]
pub struct FakeServer {
    folders: Mutex<Vec<SealedFolder>>,
    next_id: AtomicU64,
    offline: AtomicBool,
    delete_reply: Mutex<Option<String>>,
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store a note sealed with `key` under a fixed id.
    pub fn seed(&self, id: &str, note: NewNote, key: &SecretKey) {
        let mut sealed = note.seal(key).expect("seal");
        sealed.id = Some(id.to_string());
        self.insert(sealed);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Answer every later delete with `id` instead of the requested one.
    pub fn reply_to_deletes_with(&self, id: &str) {
        *self.delete_reply.lock() = Some(id.to_string());
    }

    pub fn folders(&self) -> Vec<SealedFolder> {
        self.folders.lock().clone()
    }

    fn insert(&self, note: SealedNote) {
        let mut folders = self.folders.lock();
        let name = normalize_folder(&note.folder);
        match folders.iter_mut().find(|f| f.name == name) {
            Some(folder) => folder.notes.push(note),
            None => folders.push(SealedFolder {
                name,
                notes: vec![note],
            }),
        }
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(NotesError::Network("connection refused".to_string()));
        }
        Ok(())
    }
}

impl NoteTransport for FakeServer {
    fn fetch_folders(&self) -> BoxFuture<'_, Result<Vec<SealedFolder>>> {
        Box::pin(async move {
            self.check_online()?;
            Ok(self.folders())
        })
    }

    fn create_note(&self, mut note: SealedNote) -> BoxFuture<'_, Result<SealedNote>> {
        Box::pin(async move {
            self.check_online()?;
            let id = 100 + self.next_id.fetch_add(1, Ordering::SeqCst);
            note.id = Some(id.to_string());
            note.folder = normalize_folder(&note.folder);
            self.insert(note.clone());
            Ok(note)
        })
    }

    fn delete_note(&self, id: String) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            self.check_online()?;
            let mut folders = self.folders.lock();
            let mut removed = false;
            for folder in folders.iter_mut() {
                let before = folder.notes.len();
                folder.notes.retain(|n| n.id.as_deref() != Some(id.as_str()));
                removed |= folder.notes.len() != before;
            }
            if removed {
                Ok(self.delete_reply.lock().clone().unwrap_or(id))
            } else {
                Err(NotesError::NotFound(format!("note {}", id)))
            }
        })
    }
}

/// Socket whose server halves are handed to the test; can be switched off.
pub struct FakeSocket {
    peers: mpsc::UnboundedSender<Link>,
    up: AtomicBool,
    dead_links: AtomicUsize,
    attempts: Mutex<Vec<Instant>>,
}

impl FakeSocket {
    pub fn new(up: bool) -> (Arc<Self>, mpsc::UnboundedReceiver<Link>) {
        let (peers, peers_rx) = mpsc::unbounded_channel();
        let socket = Arc::new(Self {
            peers,
            up: AtomicBool::new(up),
            dead_links: AtomicUsize::new(0),
            attempts: Mutex::new(Vec::new()),
        });
        (socket, peers_rx)
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    /// The next `count` connections succeed but their server half is gone,
    /// so the first write on them fails.
    pub fn hand_out_dead_links(&self, count: usize) {
        self.dead_links.store(count, Ordering::SeqCst);
    }

    /// Times at which a connection was attempted.
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }

    fn take_dead_link(&self) -> bool {
        self.dead_links
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Connector for FakeSocket {
    fn connect(&self) -> BoxFuture<'static, Result<Link>> {
        self.attempts.lock().push(Instant::now());
        let result = if !self.up.load(Ordering::SeqCst) {
            Err(NotesError::Network("connection refused".to_string()))
        } else if self.take_dead_link() {
            let (client, _server) = Link::pair();
            Ok(client)
        } else {
            let (client, server) = Link::pair();
            self.peers
                .send(server)
                .map(|_| client)
                .map_err(|_| NotesError::Network("test dropped the socket".to_string()))
        };
        Box::pin(async move { result })
    }
}

/// Everything the server side of `link` has received so far, parsed.
pub fn drain(link: &mut Link) -> Vec<SyncMessage> {
    let mut messages = Vec::new();
    while let Ok(frame) = link.inbound.try_recv() {
        messages.push(SyncMessage::parse(&frame).expect("well-formed frame"));
    }
    messages
}

/// Decrypted content of every `modify` among `messages`.
pub fn modified_contents(messages: &[SyncMessage], key: &SecretKey) -> Vec<String> {
    messages
        .iter()
        .filter_map(|m| match m {
            SyncMessage::Modify { note } => Some(note.open(key).expect("open").content),
            SyncMessage::Ping => None,
        })
        .collect()
}
