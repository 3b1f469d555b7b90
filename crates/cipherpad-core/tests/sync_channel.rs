mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cipherpad_core::config::SyncConfig;
use cipherpad_core::sync::{ConnectionState, Delivery, Link, Outgoing, SyncChannel, SyncMessage};
use cipherpad_core::types::Note;
use cipherpad_core::NotesError;

use common::{drain, key_for, modified_contents, FakeSocket, CREDENTIAL};

const DELAY: Duration = Duration::from_secs(5);

fn config() -> SyncConfig {
    SyncConfig {
        ping_interval: DELAY,
        reconnect_delay: DELAY,
    }
}

fn note(content: &str) -> Note {
    Note {
        id: "1".to_string(),
        title: "T".to_string(),
        content: content.to_string(),
        folder: "root".to_string(),
        datecreated: Utc::now(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_offline_queue_flushes_in_order_exactly_once() {
    let key = key_for(CREDENTIAL);
    let (socket, mut peers) = FakeSocket::new(false);
    let channel = SyncChannel::open(socket.clone(), config()).expect("open");

    for i in 0..5 {
        let delivery = channel
            .send(&Outgoing::Modify(note(&format!("edit {}", i))), &key)
            .await
            .expect("send");
        assert_eq!(delivery, Delivery::Queued);
    }
    assert_eq!(channel.queued(), 5);

    socket.set_up(true);
    let mut server = peers.recv().await.expect("reconnect");
    channel.wait_drained().await.expect("drained");

    let received = drain(&mut server);
    assert_eq!(
        modified_contents(&received, &key),
        vec!["edit 0", "edit 1", "edit 2", "edit 3", "edit 4"]
    );

    // A second reconnect must not replay anything.
    drop(server);
    let mut server = peers.recv().await.expect("second reconnect");
    tokio::time::sleep(DELAY + Duration::from_millis(10)).await;
    assert_eq!(drain(&mut server), vec![SyncMessage::Ping]);

    channel.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_send_while_connected_is_immediate() {
    let key = key_for(CREDENTIAL);
    let (socket, mut peers) = FakeSocket::new(true);
    let channel = SyncChannel::open(socket, config()).expect("open");
    let mut server = peers.recv().await.expect("connect");
    channel.wait_for(ConnectionState::Connected).await.expect("connected");

    let delivery = channel
        .send(&Outgoing::Modify(note("C2")), &key)
        .await
        .expect("send");
    assert_eq!(delivery, Delivery::Sent);
    assert_eq!(modified_contents(&drain(&mut server), &key), vec!["C2"]);

    channel.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_reconnects_after_fixed_delay() {
    let (socket, mut peers) = FakeSocket::new(true);
    let channel = SyncChannel::open(socket.clone(), config()).expect("open");

    let server = peers.recv().await.expect("connect");
    channel.wait_for(ConnectionState::Connected).await.expect("connected");

    drop(server);
    channel
        .wait_for(ConnectionState::Disconnected)
        .await
        .expect("disconnected");
    let dropped_at = tokio::time::Instant::now();

    let _server = peers.recv().await.expect("reconnect");
    channel.wait_for(ConnectionState::Connected).await.expect("connected again");

    let attempts = socket.attempts();
    assert_eq!(attempts.len(), 2);
    assert!(attempts[1] - dropped_at <= DELAY);
    assert!(attempts[1] - attempts[0] >= DELAY);

    channel.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_keeps_retrying_unreachable_endpoint() {
    let (socket, _peers) = FakeSocket::new(false);
    let channel = SyncChannel::open(socket.clone(), config()).expect("open");

    tokio::time::sleep(DELAY * 4 + Duration::from_millis(10)).await;
    assert_eq!(socket.attempts().len(), 5);
    assert_eq!(channel.state(), ConnectionState::Disconnected);

    channel.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_empty_key_aborts_send() {
    let (socket, mut peers) = FakeSocket::new(true);
    let channel = SyncChannel::open(socket, config()).expect("open");
    let mut server = peers.recv().await.expect("connect");

    let err = channel
        .send(&Outgoing::Modify(note("secret")), &cipherpad_core::crypto::SecretKey::empty())
        .await
        .unwrap_err();
    assert!(matches!(err, NotesError::Crypto(_)));
    assert_eq!(channel.queued(), 0);
    assert!(drain(&mut server).is_empty());

    channel.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_close_stops_heartbeat() {
    let (socket, mut peers) = FakeSocket::new(true);
    let channel = Arc::new(SyncChannel::open(socket, config()).expect("open"));
    let mut server = peers.recv().await.expect("connect");

    channel.close().await;
    tokio::time::sleep(DELAY * 3).await;

    assert!(drain(&mut server).is_empty());
    assert!(server.inbound.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_flush_onto_dead_link_requeues_in_order() {
    let key = key_for(CREDENTIAL);
    let (socket, mut peers) = FakeSocket::new(false);
    let channel = SyncChannel::open(socket.clone(), config()).expect("open");

    for i in 0..3 {
        let delivery = channel
            .send(&Outgoing::Modify(note(&format!("edit {}", i))), &key)
            .await
            .expect("send");
        assert_eq!(delivery, Delivery::Queued);
    }

    socket.hand_out_dead_links(1);
    socket.set_up(true);
    let mut server = peers.recv().await.expect("healthy reconnect");
    channel.wait_drained().await.expect("drained");

    assert!(socket.attempts().len() >= 2);
    assert_eq!(
        modified_contents(&drain(&mut server), &key),
        vec!["edit 0", "edit 1", "edit 2"]
    );

    drop(server);
    let mut server = peers.recv().await.expect("next reconnect");
    tokio::time::sleep(DELAY + Duration::from_millis(10)).await;
    assert_eq!(drain(&mut server), vec![SyncMessage::Ping]);

    channel.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_send_on_dead_link_is_queued_for_reconnect() {
    let key = key_for(CREDENTIAL);
    let (socket, mut peers) = FakeSocket::new(true);
    let channel = SyncChannel::open(socket, config()).expect("open");
    let server = peers.recv().await.expect("connect");
    channel.wait_for(ConnectionState::Connected).await.expect("connected");

    // The peer stops reading but never closes its side.
    let Link {
        outbound: _still_open,
        inbound,
        ..
    } = server;
    drop(inbound);

    let delivery = channel
        .send(&Outgoing::Modify(note("C3")), &key)
        .await
        .expect("send");
    assert_eq!(delivery, Delivery::Queued);
    assert_eq!(channel.queued(), 1);

    let mut server = peers.recv().await.expect("reconnect");
    channel.wait_drained().await.expect("drained");
    assert_eq!(modified_contents(&drain(&mut server), &key), vec!["C3"]);

    channel.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_zero_ping_interval_rejected() {
    let (socket, _peers) = FakeSocket::new(true);
    let zero = SyncConfig {
        ping_interval: Duration::ZERO,
        ..config()
    };
    let err = SyncChannel::open(socket, zero).unwrap_err();
    assert!(matches!(err, NotesError::InvalidInput(_)));
}
