//! Resilient duplex sync channel.
//!
//! A single background task owns the connection state and the outbound
//! queue. Callers talk to it through commands, so every queue mutation
//! happens in one place: on reconnect the queue is swapped out whole and
//! flushed before any later send is looked at.
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> (close|error) -> Disconnected
//!      ^                                                          |
//!      +---------------------- reconnect_delay -------------------+
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::connector::{Connector, Link};
use super::message::{Outgoing, SyncMessage};
use crate::config::SyncConfig;
use crate::crypto::SecretKey;
use crate::error::{NotesError, Result};

/// Connection lifecycle as observed by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        })
    }
}

/// What `send` did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to the open connection
    Sent,
    /// Held in the outbound queue until the next connect
    Queued,
}

type InboundHandler = Arc<dyn Fn(&str) + Send + Sync>;
type SentHook = Box<dyn FnOnce() + Send>;

struct Pending {
    frame: String,
    on_sent: Option<SentHook>,
}

enum Command {
    Send {
        pending: Pending,
        reply: oneshot::Sender<Delivery>,
    },
    Receive(InboundHandler),
    Close,
}

/// Handle to the sync channel task.
pub struct SyncChannel {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    queued: watch::Receiver<usize>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SyncChannel {
    /// Spawn the channel task and start connecting. Must be called inside a
    /// Tokio runtime. Zero periods in `config` are rejected as `InvalidInput`.
    pub fn open(connector: Arc<dyn Connector>, config: SyncConfig) -> Result<Self> {
        config.validate()?;
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (queued_tx, queued_rx) = watch::channel(0usize);

        let actor = Actor {
            connector,
            config,
            commands: commands_rx,
            state: state_tx,
            queued: queued_tx,
            queue: Vec::new(),
            handlers: Vec::new(),
        };
        let task = tokio::spawn(actor.run());

        Ok(Self {
            commands: commands_tx,
            state: state_rx,
            queued: queued_rx,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Number of messages waiting for a connection.
    pub fn queued(&self) -> usize {
        *self.queued.borrow()
    }

    /// Encrypt `message` with `key` and send it, or queue it when offline.
    ///
    /// Encryption happens before routing, so the queue never holds plaintext
    /// and a missing key fails here without sending anything.
    pub async fn send(&self, message: &Outgoing, key: &SecretKey) -> Result<Delivery> {
        self.dispatch(message.seal(key)?, None).await
    }

    /// Like [`send`](Self::send), running `on_sent` once the message is
    /// actually handed to a live connection (immediately or after a reconnect).
    pub async fn send_tracked<F>(
        &self,
        message: &Outgoing,
        key: &SecretKey,
        on_sent: F,
    ) -> Result<Delivery>
    where
        F: FnOnce() + Send + 'static,
    {
        self.dispatch(message.seal(key)?, Some(Box::new(on_sent))).await
    }

    async fn dispatch(&self, message: SyncMessage, on_sent: Option<SentHook>) -> Result<Delivery> {
        let frame = message.to_json()?;
        let (reply, delivered) = oneshot::channel();
        self.commands
            .send(Command::Send {
                pending: Pending { frame, on_sent },
                reply,
            })
            .map_err(|_| NotesError::ChannelClosed)?;
        let delivery = delivered.await.map_err(|_| NotesError::ChannelClosed)?;
        tracing::debug!(kind = message.kind(), ?delivery, "sync message dispatched");
        Ok(delivery)
    }

    /// Register `handler` for every raw inbound message. Inbound content is
    /// passed through untouched; nothing is merged into the note store.
    pub fn receive<F>(&self, handler: F) -> Result<()>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.commands
            .send(Command::Receive(Arc::new(handler)))
            .map_err(|_| NotesError::ChannelClosed)
    }

    /// Wait until the channel reaches `target`.
    pub async fn wait_for(&self, target: ConnectionState) -> Result<()> {
        let mut state = self.state.clone();
        state
            .wait_for(|current| *current == target)
            .await
            .map(|_| ())
            .map_err(|_| NotesError::ChannelClosed)
    }

    /// Wait until the outbound queue is empty.
    pub async fn wait_drained(&self) -> Result<()> {
        let mut queued = self.queued.clone();
        queued
            .wait_for(|count| *count == 0)
            .await
            .map(|_| ())
            .map_err(|_| NotesError::ChannelClosed)
    }

    /// Tear down the transport and cancel the heartbeat and any pending
    /// reconnect. Frames already handed to a live link are written out
    /// first; messages still queued for a connection are discarded.
    pub async fn close(&self) {
        let _ = self.commands.send(Command::Close);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "sync channel task ended abnormally");
            }
        }
    }
}

impl fmt::Debug for SyncChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncChannel")
            .field("state", &self.state())
            .field("queued", &self.queued())
            .finish()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

struct Actor {
    connector: Arc<dyn Connector>,
    config: SyncConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<ConnectionState>,
    queued: watch::Sender<usize>,
    queue: Vec<Pending>,
    handlers: Vec<InboundHandler>,
}

impl Actor {
    async fn run(mut self) {
        loop {
            self.set_state(ConnectionState::Connecting);
            let mut connect = self.connector.connect();
            let result = loop {
                tokio::select! {
                    result = &mut connect => break result,
                    command = self.commands.recv() => {
                        if self.handle_offline(command) == Flow::Stop {
                            self.set_state(ConnectionState::Disconnected);
                            return;
                        }
                    }
                }
            };

            match result {
                Ok(link) => {
                    if self.serve(link).await == Flow::Stop {
                        self.set_state(ConnectionState::Disconnected);
                        return;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "sync connection attempt failed"),
            }

            self.set_state(ConnectionState::Disconnected);
            tracing::debug!(
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "scheduling reconnect"
            );
            let delay = time::sleep(self.config.reconnect_delay);
            tokio::pin!(delay);
            loop {
                tokio::select! {
                    _ = &mut delay => break,
                    command = self.commands.recv() => {
                        if self.handle_offline(command) == Flow::Stop {
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Run one live connection until it drops or the channel is closed.
    async fn serve(&mut self, link: Link) -> Flow {
        let Link {
            outbound,
            mut inbound,
            writer,
        } = link;
        self.set_state(ConnectionState::Connected);

        // Single swap: nothing can be enqueued between the take and the flush.
        let mut pending = std::mem::take(&mut self.queue).into_iter();
        let count = pending.len();
        while let Some(item) = pending.next() {
            if let Err(item) = Self::write(&outbound, item) {
                self.queue.push(item);
                self.queue.extend(pending);
                self.publish_queued();
                tracing::warn!(remaining = self.queue.len(), "connection dropped during queue flush");
                return Flow::Continue;
            }
        }
        self.publish_queued();
        if count > 0 {
            tracing::debug!(count, "flushed outbound queue");
        }

        let period = self.config.ping_interval;
        let mut heartbeat = time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let flow = loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let ping = Pending { frame: PING_FRAME.to_string(), on_sent: None };
                    if Self::write(&outbound, ping).is_err() {
                        break Flow::Continue;
                    }
                }
                frame = inbound.recv() => match frame {
                    Some(text) => {
                        for handler in &self.handlers {
                            handler(&text);
                        }
                    }
                    None => break Flow::Continue,
                },
                command = self.commands.recv() => match command {
                    Some(Command::Send { pending, reply }) => match Self::write(&outbound, pending) {
                        Ok(()) => {
                            let _ = reply.send(Delivery::Sent);
                        }
                        Err(pending) => {
                            self.queue.push(pending);
                            self.publish_queued();
                            let _ = reply.send(Delivery::Queued);
                            break Flow::Continue;
                        }
                    },
                    Some(Command::Receive(handler)) => self.handlers.push(handler),
                    Some(Command::Close) | None => break Flow::Stop,
                },
            }
        };

        if flow == Flow::Stop {
            // Frames already accepted by the link must reach the socket
            // before close returns.
            drop(outbound);
            if let Some(writer) = writer {
                match time::timeout(WRITER_DRAIN_TIMEOUT, writer).await {
                    Ok(Ok(())) => tracing::debug!("sync link drained"),
                    Ok(Err(e)) => tracing::warn!(error = %e, "sync link writer failed"),
                    Err(_) => tracing::warn!("sync link writer did not drain in time"),
                }
            }
            return Flow::Stop;
        }

        tracing::info!("sync connection lost");
        Flow::Continue
    }

    fn handle_offline(&mut self, command: Option<Command>) -> Flow {
        match command {
            Some(Command::Send { pending, reply }) => {
                self.queue.push(pending);
                self.publish_queued();
                let _ = reply.send(Delivery::Queued);
                Flow::Continue
            }
            Some(Command::Receive(handler)) => {
                self.handlers.push(handler);
                Flow::Continue
            }
            Some(Command::Close) | None => Flow::Stop,
        }
    }

    /// Hand one frame to the link; gives it back if the link is gone.
    fn write(
        outbound: &mpsc::UnboundedSender<String>,
        pending: Pending,
    ) -> std::result::Result<(), Pending> {
        let Pending { frame, on_sent } = pending;
        match outbound.send(frame) {
            Ok(()) => {
                if let Some(hook) = on_sent {
                    hook();
                }
                Ok(())
            }
            Err(mpsc::error::SendError(frame)) => Err(Pending { frame, on_sent }),
        }
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(from = %previous, to = %next, "sync channel state");
        }
    }

    fn publish_queued(&self) {
        self.queued.send_replace(self.queue.len());
    }
}

const PING_FRAME: &str = r#"{"type":"ping"}"#;

/// Upper bound on how long `close` waits for the link to write out frames
/// it already accepted.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
