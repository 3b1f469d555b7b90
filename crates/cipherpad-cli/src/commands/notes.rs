//! Note commands: `list`, `new`, `delete` and `edit`.

use std::io::{IsTerminal, Read};
use std::time::Duration;

use serde_json::{json, Value};

use cipherpad_core::remote::FetchOutcome;
use cipherpad_core::types::{Folder, NewNote, Note};
use cipherpad_core::{NotesError, NotesSession, SyncState};

use crate::app::AppContext;
use crate::cli::{DeleteArgs, EditArgs, ListArgs, NewArgs};
use crate::constants::DELIVERY_TIMEOUT_SECS;
use crate::errors::CliError;
use crate::ui::{self, UiContext};

pub async fn handle_list(ctx: &AppContext<'_>, args: &ListArgs) -> anyhow::Result<()> {
    let ui_ctx = ctx.ui(args.json);
    let session = ctx.open_session().await?;
    let result = session.refresh().await;
    session.shutdown().await;

    let folders = match result? {
        FetchOutcome::Decrypted(folders) => folders,
        FetchOutcome::DecryptFailed => return Err(CliError::decrypt_failed().into()),
    };

    if ui_ctx.mode.is_json() {
        let body: Vec<Value> = folders.iter().map(folder_json).collect();
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let count: usize = folders.iter().map(|f| f.notes.len()).sum();
    let summary = format!("{} notes", count);
    ui::print(&ui_ctx, &ui::header(&ui_ctx, "list", Some(summary.as_str())));
    if count == 0 {
        ui::print(&ui_ctx, &ui::hint(&ui_ctx, "cipherpad new --title <TITLE>"));
        return Ok(());
    }
    ui::print(&ui_ctx, &ui::simple_table(&ui_ctx, &LIST_COLUMNS, &list_rows(&ui_ctx, &folders)));
    Ok(())
}

const LIST_COLUMNS: [&str; 5] = ["Folder", "ID", "Title", "Created", "Content"];

fn list_rows(ui_ctx: &UiContext, folders: &[Folder]) -> Vec<Vec<String>> {
    let pretty = ui_ctx.mode.is_pretty();
    let preview = (ui_ctx.width / 3).max(12);
    folders
        .iter()
        .flat_map(|folder| folder.notes.iter())
        .map(|note| {
            vec![
                note.folder.clone(),
                note.id.clone(),
                ui::truncate(&note.title, preview),
                ui::format_datetime(&note.datecreated, pretty),
                ui::truncate(&note.content, preview),
            ]
        })
        .collect()
}

fn folder_json(folder: &Folder) -> Value {
    json!({
        "name": folder.name,
        "notes": folder.notes.iter().map(note_json).collect::<Vec<_>>(),
    })
}

fn note_json(note: &Note) -> Value {
    json!({
        "id": note.id,
        "title": note.title,
        "content": note.content,
        "folder": note.folder,
        "datecreated": note.datecreated.to_rfc3339(),
    })
}

pub async fn handle_new(ctx: &AppContext<'_>, args: &NewArgs) -> anyhow::Result<()> {
    let ui_ctx = ctx.ui(args.json);
    let mut note = NewNote::new(args.title.clone());
    if let Some(content) = &args.content {
        note = note.with_content(content.clone());
    }
    if let Some(folder) = &args.folder {
        note = note.in_folder(folder);
    }

    let session = ctx.open_session().await?;
    let result = session.create_note(note).await;
    session.shutdown().await;
    let created = result?;

    if ui_ctx.mode.is_json() {
        println!("{}", serde_json::to_string_pretty(&note_json(&created))?);
    } else if !ctx.quiet() {
        ui::print(
            &ui_ctx,
            &ui::receipt(
                &ui_ctx,
                "Note created",
                &[
                    ("ID", created.id.as_str()),
                    ("Folder", created.folder.as_str()),
                    ("Title", created.title.as_str()),
                ],
            ),
        );
    } else {
        println!("{}", created.id);
    }
    Ok(())
}

pub async fn handle_delete(ctx: &AppContext<'_>, args: &DeleteArgs) -> anyhow::Result<()> {
    let ui_ctx = ctx.ui(false);
    let session = ctx.open_session().await?;
    let result = session.delete_note(&args.id).await;
    session.shutdown().await;
    result.map_err(|e| not_found_as_cli(e, &args.id))?;

    if !ctx.quiet() {
        ui::print(
            &ui_ctx,
            &ui::receipt(&ui_ctx, "Note deleted", &[("ID", args.id.as_str())]),
        );
    }
    Ok(())
}

/// Apply `--title`/`--content` (or piped content) to one note and wait
/// until the change has been handed to the sync connection.
///
/// When `--content` is omitted and stdin is piped, stdin becomes the new
/// content; empty stdin alongside `--title` leaves the content alone.
pub async fn handle_edit(ctx: &AppContext<'_>, args: &EditArgs) -> anyhow::Result<()> {
    let ui_ctx = ctx.ui(false);
    let content = match &args.content {
        Some(content) => Some(content.clone()),
        None if !std::io::stdin().is_terminal() => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            if buffer.is_empty() && args.title.is_some() {
                None
            } else {
                Some(buffer)
            }
        }
        None => None,
    };
    if args.title.is_none() && content.is_none() {
        return Err(CliError::invalid_input(
            "Nothing to change: pass --title, --content, or pipe content on stdin",
        )
        .into());
    }

    let session = ctx.open_session().await?;
    let result = apply_edit(&session, &args.id, args.title.clone(), content).await;
    session.shutdown().await;
    result?;

    if !ctx.quiet() {
        ui::print(
            &ui_ctx,
            &ui::receipt(
                &ui_ctx,
                "Note updated",
                &[("ID", args.id.as_str()), ("Sync", "sent")],
            ),
        );
    }
    Ok(())
}

async fn apply_edit(
    session: &NotesSession,
    id: &str,
    title: Option<String>,
    content: Option<String>,
) -> anyhow::Result<()> {
    if session.refresh().await?.is_decrypt_failure() {
        return Err(CliError::decrypt_failed().into());
    }
    session
        .select(Some(id))
        .map_err(|e| not_found_as_cli(e, id))?;
    if let Some(title) = title {
        session.edit_title(title)?;
    }
    if let Some(content) = content {
        session.edit_content(content)?;
    }
    session.flush_edits().await?;

    let timeout = Duration::from_secs(DELIVERY_TIMEOUT_SECS);
    match tokio::time::timeout(timeout, session.channel().wait_drained()).await {
        Ok(drained) => drained?,
        Err(_) => anyhow::bail!(
            "Sync server unreachable after {}s; the edit was not delivered",
            DELIVERY_TIMEOUT_SECS
        ),
    }

    let state = session.store().lock().sync_state(id).cloned();
    match state {
        Some(SyncState::Rejected(reason)) => anyhow::bail!("Edit rejected: {}", reason),
        _ => Ok(()),
    }
}

fn not_found_as_cli(err: NotesError, id: &str) -> anyhow::Error {
    match err {
        NotesError::NotFound(_) => {
            CliError::not_found(format!("Note {} not found", id), "Run: cipherpad list").into()
        }
        other => other.into(),
    }
}
