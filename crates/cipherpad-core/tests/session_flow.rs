mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use cipherpad_core::remote::FetchOutcome;
use cipherpad_core::sync::{ConnectionState, Link};
use cipherpad_core::types::{NewNote, ROOT_FOLDER};
use cipherpad_core::{KeyManager, NotesError, NotesSession, SessionOptions, StoreStatus, SyncState};
use tokio::sync::mpsc;

use common::{drain, key_for, modified_contents, unlocked_keys, FakeServer, FakeSocket, CREDENTIAL};

struct Harness {
    session: NotesSession,
    server: Arc<FakeServer>,
    socket: Link,
}

async fn start(credential: &str, server: Arc<FakeServer>) -> Harness {
    start_with(unlocked_keys(credential), server).await
}

async fn start_with(keys: Arc<KeyManager>, server: Arc<FakeServer>) -> Harness {
    let (connector, mut peers): (_, mpsc::UnboundedReceiver<Link>) = FakeSocket::new(true);
    let session = NotesSession::start(
        keys,
        server.clone(),
        connector,
        SessionOptions::default(),
    )
    .expect("start session");
    let socket = peers.recv().await.expect("socket");
    session
        .channel()
        .wait_for(ConnectionState::Connected)
        .await
        .expect("connected");
    Harness {
        session,
        server,
        socket,
    }
}

fn seeded() -> Arc<FakeServer> {
    let server = FakeServer::new();
    server.seed("1", NewNote::new("T").with_content("C"), &key_for(CREDENTIAL));
    server
}

#[tokio::test(start_paused = true)]
async fn test_login_fetch_edit_delete() {
    let mut h = start(CREDENTIAL, seeded()).await;

    let outcome = h.session.refresh().await.expect("refresh");
    let FetchOutcome::Decrypted(folders) = outcome else {
        panic!("expected decrypted notes");
    };
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].name, ROOT_FOLDER);
    let note = &folders[0].notes[0];
    assert_eq!((note.id.as_str(), note.title.as_str(), note.content.as_str()), ("1", "T", "C"));

    h.session.select(Some("1")).expect("select");
    h.session.edit_content("C2").expect("edit");
    tokio::time::sleep(Duration::from_millis(600)).await;

    let sent = drain(&mut h.socket);
    assert_eq!(modified_contents(&sent, &key_for(CREDENTIAL)), vec!["C2"]);
    {
        let store = h.session.store();
        let store = store.lock();
        assert_eq!(store.find("1").map(|n| n.content.as_str()), Some("C2"));
        assert_eq!(store.sync_state("1"), Some(&SyncState::Sent));
    }

    h.session.delete_note("1").await.expect("delete");
    {
        let store = h.session.store();
        let store = store.lock();
        assert!(store.folders().iter().all(|f| f.notes.iter().all(|n| n.id != "1")));
        assert_eq!(store.status(), StoreStatus::Deleted);
    }
    assert!(h.server.folders().iter().all(|f| f.notes.is_empty()));

    h.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_rapid_edits_coalesce_into_one_flush() {
    let mut h = start(CREDENTIAL, seeded()).await;
    h.session.refresh().await.expect("refresh");
    h.session.select(Some("1")).expect("select");

    for content in ["a", "ab", "abc", "abcd"] {
        h.session.edit_content(content).expect("edit");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(drain(&mut h.socket).is_empty());

    tokio::time::sleep(Duration::from_millis(500)).await;
    let sent = drain(&mut h.socket);
    assert_eq!(modified_contents(&sent, &key_for(CREDENTIAL)), vec!["abcd"]);

    h.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_title_flushes_ahead_of_content() {
    let mut h = start(CREDENTIAL, seeded()).await;
    h.session.refresh().await.expect("refresh");
    h.session.select(Some("1")).expect("select");

    h.session.edit_content("draft").expect("edit content");
    h.session.edit_title("New title").expect("edit title");
    tokio::time::sleep(Duration::from_millis(50)).await;

    let key = key_for(CREDENTIAL);
    let early = drain(&mut h.socket);
    assert_eq!(early.len(), 1);
    assert_eq!(modified_contents(&early, &key), vec!["C"]);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(modified_contents(&drain(&mut h.socket), &key), vec!["draft"]);

    h.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_edits_without_selection_are_ignored() {
    let mut h = start(CREDENTIAL, seeded()).await;
    h.session.refresh().await.expect("refresh");

    h.session.edit_content("orphan").expect("edit");
    tokio::time::sleep(Duration::from_secs(1)).await;
    h.session.flush_edits().await.expect("flush");

    assert!(drain(&mut h.socket).is_empty());
    let store = h.session.store();
    assert_eq!(store.lock().find("1").map(|n| n.content.clone()), Some("C".to_string()));
    drop(store);

    h.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_flush_for_deleted_note_is_dropped() {
    let mut h = start(CREDENTIAL, seeded()).await;
    h.session.refresh().await.expect("refresh");
    h.session.select(Some("1")).expect("select");
    h.session.edit_content("late").expect("edit");

    h.session.delete_note("1").await.expect("delete");
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(drain(&mut h.socket).is_empty());
    h.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_wrong_key_reports_decrypt_failure() {
    let h = start("not the password", seeded()).await;

    let outcome = h.session.refresh().await.expect("refresh");
    assert!(outcome.is_decrypt_failure());

    let store = h.session.store();
    let guard = store.lock();
    assert!(guard.decrypt_failed());
    assert_eq!(guard.status(), StoreStatus::FetchRejected);
    assert_eq!(guard.note_count(), 0);
    drop(guard);

    h.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_notes_stay_in_exactly_one_folder() {
    let h = start(CREDENTIAL, seeded()).await;
    h.session.refresh().await.expect("refresh");

    let work = h
        .session
        .create_note(NewNote::new("W").in_folder("work"))
        .await
        .expect("create work");
    let unfiled = h
        .session
        .create_note(NewNote::new("U").in_folder(""))
        .await
        .expect("create unfiled");
    assert_eq!(unfiled.folder, ROOT_FOLDER);

    {
        let store = h.session.store();
        let store = store.lock();
        let mut seen = HashSet::new();
        for folder in store.folders() {
            for note in &folder.notes {
                assert!(seen.insert(note.id.clone()), "{} in two folders", note.id);
            }
        }
        assert_eq!(seen.len(), 3);
    }

    h.session.delete_note(&work.id).await.expect("delete");
    let store = h.session.store();
    let store = store.lock();
    assert!(!store.contains(&work.id));
    assert!(store.contains("1"));
    assert!(store.contains(&unfiled.id));
    let work_folder = store.folders().iter().find(|f| f.name == "work").expect("work folder");
    assert!(work_folder.notes.is_empty());
    drop(store);

    h.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_delete_leaves_note_in_place() {
    let h = start(CREDENTIAL, seeded()).await;
    h.session.refresh().await.expect("refresh");

    h.server.set_offline(true);
    let err = h.session.delete_note("1").await.unwrap_err();
    assert!(matches!(err, NotesError::Network(_)));

    let store = h.session.store();
    let guard = store.lock();
    assert!(guard.contains("1"));
    assert_eq!(guard.status(), StoreStatus::DeleteRejected);
    assert!(guard.error().is_some());
    drop(guard);

    h.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_delete_purges_only_requested_note() {
    let server = seeded();
    server.seed("2", NewNote::new("Other").with_content("keep"), &key_for(CREDENTIAL));
    let h = start(CREDENTIAL, server).await;
    h.session.refresh().await.expect("refresh");

    h.server.reply_to_deletes_with("2");
    h.session.delete_note("1").await.expect("delete");

    let store = h.session.store();
    let guard = store.lock();
    assert!(!guard.contains("1"));
    assert!(guard.contains("2"));
    assert_eq!(guard.status(), StoreStatus::Deleted);
    drop(guard);

    h.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_start_rejects_zero_sync_period() {
    let (connector, _peers) = FakeSocket::new(true);
    let mut options = SessionOptions::default();
    options.sync.ping_interval = Duration::ZERO;
    let err = NotesSession::start(unlocked_keys(CREDENTIAL), FakeServer::new(), connector, options)
        .unwrap_err();
    assert!(matches!(err, NotesError::InvalidInput(_)));
}

#[tokio::test(start_paused = true)]
async fn test_select_unknown_note() {
    let h = start(CREDENTIAL, seeded()).await;
    h.session.refresh().await.expect("refresh");
    let err = h.session.select(Some("missing")).unwrap_err();
    assert!(matches!(err, NotesError::NotFound(_)));
    h.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_logout_forgets_key() {
    let keys = unlocked_keys(CREDENTIAL);
    let h = start_with(keys.clone(), seeded()).await;
    assert!(h.session.keys().is_unlocked());

    h.session.logout().await.expect("logout");
    assert!(!keys.is_unlocked());
    assert!(keys.get_key().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_start_requires_key() {
    let keys = Arc::new(KeyManager::new(Box::new(
        cipherpad_core::keys::MemoryKeyStore::new(),
    )));
    let (connector, _peers) = FakeSocket::new(true);
    let err = NotesSession::start(keys, FakeServer::new(), connector, SessionOptions::default())
        .unwrap_err();
    assert!(matches!(err, NotesError::NotAuthenticated));
}
