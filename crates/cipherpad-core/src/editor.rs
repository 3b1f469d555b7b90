//! Debounced propagation of local edits to the active note.
//!
//! Title and content have independent quiet windows. When a window elapses
//! the pending value is written into the [`NoteStore`](crate::store::NoteStore)
//! first and then sent as a `modify` message over the sync channel with the
//! key held at that moment.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::DebounceConfig;
use crate::error::{NotesError, Result};
use crate::keys::KeyManager;
use crate::store::{SharedStore, SyncState};
use crate::sync::{Delivery, Outgoing, SyncChannel};

enum EditCommand {
    Select(Option<String>),
    Title(String),
    Content(String),
    Flush(oneshot::Sender<()>),
    Close,
}

/// Handle to the debouncer task.
pub struct EditDebouncer {
    commands: mpsc::UnboundedSender<EditCommand>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EditDebouncer {
    pub fn spawn(
        store: SharedStore,
        keys: Arc<KeyManager>,
        channel: Arc<SyncChannel>,
        config: DebounceConfig,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let worker = Worker {
            store,
            keys,
            channel,
            config,
            commands: commands_rx,
            draft: None,
        };
        Self {
            commands: commands_tx,
            task: Mutex::new(Some(tokio::spawn(worker.run()))),
        }
    }

    /// Make `id` the active note. Pending edits for the previous note are
    /// flushed first.
    pub fn select(&self, id: Option<&str>) -> Result<()> {
        self.command(EditCommand::Select(id.map(str::to_string)))
    }

    pub fn edit_title(&self, title: impl Into<String>) -> Result<()> {
        self.command(EditCommand::Title(title.into()))
    }

    pub fn edit_content(&self, content: impl Into<String>) -> Result<()> {
        self.command(EditCommand::Content(content.into()))
    }

    /// Flush pending edits now and wait until they are handed to the channel.
    pub async fn flush(&self) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.command(EditCommand::Flush(reply))?;
        done.await.map_err(|_| NotesError::ChannelClosed)
    }

    /// Flush pending edits and stop the task.
    pub async fn close(&self) {
        let _ = self.commands.send(EditCommand::Close);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "edit debouncer ended abnormally");
            }
        }
    }

    fn command(&self, command: EditCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| NotesError::ChannelClosed)
    }
}

impl std::fmt::Debug for EditDebouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditDebouncer").finish_non_exhaustive()
    }
}

/// Edits collected for one note since its last flush.
struct Draft {
    id: String,
    title: Option<(String, Instant)>,
    content: Option<(String, Instant)>,
}

impl Draft {
    fn new(id: String) -> Self {
        Self {
            id,
            title: None,
            content: None,
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        let title = self.title.as_ref().map(|(_, at)| *at);
        let content = self.content.as_ref().map(|(_, at)| *at);
        match (title, content) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Take the values whose window has elapsed at `now` (all of them when `now` is `None`).
    fn take_due(&mut self, now: Option<Instant>) -> (Option<String>, Option<String>) {
        (take_slot(&mut self.title, now), take_slot(&mut self.content, now))
    }
}

fn take_slot(slot: &mut Option<(String, Instant)>, now: Option<Instant>) -> Option<String> {
    let elapsed = match (slot.as_ref(), now) {
        (Some((_, at)), Some(now)) => *at <= now,
        _ => true,
    };
    if elapsed {
        slot.take().map(|(value, _)| value)
    } else {
        None
    }
}

struct Worker {
    store: SharedStore,
    keys: Arc<KeyManager>,
    channel: Arc<SyncChannel>,
    config: DebounceConfig,
    commands: mpsc::UnboundedReceiver<EditCommand>,
    draft: Option<Draft>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            let deadline = self.draft.as_ref().and_then(Draft::next_deadline);
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(EditCommand::Select(id)) => {
                        self.flush(None).await;
                        self.select(id);
                    }
                    Some(EditCommand::Title(title)) => self.stage(|draft, window| {
                        draft.title = Some((title, Instant::now() + window.title));
                    }),
                    Some(EditCommand::Content(content)) => self.stage(|draft, window| {
                        draft.content = Some((content, Instant::now() + window.content));
                    }),
                    Some(EditCommand::Flush(reply)) => {
                        self.flush(None).await;
                        let _ = reply.send(());
                    }
                    Some(EditCommand::Close) | None => {
                        self.flush(None).await;
                        return;
                    }
                },
                _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.flush(Some(Instant::now())).await;
                }
            }
        }
    }

    fn select(&mut self, id: Option<String>) {
        let mut store = self.store.lock();
        store.select(id.as_deref());
        self.draft = store.selected_id().map(|id| Draft::new(id.to_string()));
    }

    fn stage(&mut self, apply: impl FnOnce(&mut Draft, &DebounceConfig)) {
        match self.draft.as_mut() {
            Some(draft) => apply(draft, &self.config),
            None => tracing::debug!("edit ignored: no note selected"),
        }
    }

    async fn flush(&mut self, now: Option<Instant>) {
        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        let (title, content) = draft.take_due(now);
        if title.is_none() && content.is_none() {
            return;
        }
        let id = draft.id.clone();

        // Local phase: optimistic write, only if the note is still there.
        let note = {
            let mut store = self.store.lock();
            let Some(mut note) = store.find(&id).cloned() else {
                tracing::debug!(id = %id, "dropping edit flush for a note no longer in the store");
                return;
            };
            if let Some(title) = title {
                note.title = title;
            }
            if let Some(content) = content {
                note.content = content;
            }
            store.update_note(&note);
            store.set_sync_state(&id, SyncState::Queued);
            note
        };

        // Remote phase: encrypt with the current key and propagate.
        let key = self.keys.get_key();
        let store = self.store.clone();
        let sent_id = id.clone();
        let result = self
            .channel
            .send_tracked(&Outgoing::Modify(note), &key, move || {
                store.lock().set_sync_state(&sent_id, SyncState::Sent);
            })
            .await;

        match result {
            Ok(Delivery::Sent) => tracing::debug!(id = %id, "edit flushed"),
            Ok(Delivery::Queued) => tracing::debug!(id = %id, "edit flushed while offline; queued"),
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "edit flush rejected");
                self.store
                    .lock()
                    .set_sync_state(&id, SyncState::Rejected(e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_due_respects_windows() {
        let start = Instant::now();
        let mut draft = Draft::new("1".to_string());
        draft.title = Some(("T".to_string(), start + time::Duration::from_millis(1)));
        draft.content = Some(("C".to_string(), start + time::Duration::from_millis(500)));

        assert_eq!(draft.next_deadline(), Some(start + time::Duration::from_millis(1)));

        let (title, content) = draft.take_due(Some(start + time::Duration::from_millis(10)));
        assert_eq!(title.as_deref(), Some("T"));
        assert_eq!(content, None);
        assert!(draft.content.is_some());

        let (title, content) = draft.take_due(None);
        assert_eq!(title, None);
        assert_eq!(content.as_deref(), Some("C"));
        assert_eq!(draft.next_deadline(), None);
    }
}
