//! `watch`: hold the sync channel open and report what happens on it.

use serde_json::{json, Value};

use cipherpad_core::sync::ConnectionState;

use crate::app::AppContext;
use crate::cli::WatchArgs;
use crate::ui::{self, Badge, UiContext};

pub async fn handle_watch(ctx: &AppContext<'_>, args: &WatchArgs) -> anyhow::Result<()> {
    let ui_ctx = ctx.ui(args.json);
    let session = ctx.open_session().await?;

    let json_mode = ui_ctx.mode.is_json();
    session.on_inbound(move |raw| print_inbound(json_mode, raw))?;
    ui::print(&ui_ctx, &ui::header(&ui_ctx, "watch", Some("Ctrl-C to stop")));

    let mut state = session.channel().subscribe_state();
    let initial = *state.borrow_and_update();
    print_state(&ui_ctx, initial);

    let result = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal.map_err(anyhow::Error::from),
            changed = state.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = *state.borrow_and_update();
                print_state(&ui_ctx, current);
            }
        }
    };

    session.shutdown().await;
    result
}

fn print_state(ui_ctx: &UiContext, state: ConnectionState) {
    if ui_ctx.mode.is_json() {
        println!("{}", json!({ "event": "state", "state": state.to_string() }));
        return;
    }
    let kind = match state {
        ConnectionState::Connected => Badge::Ok,
        ConnectionState::Connecting => Badge::Info,
        ConnectionState::Disconnected => Badge::Warn,
    };
    ui::print(ui_ctx, &ui::badge(ui_ctx, kind, &state.to_string()));
}

/// Inbound messages are printed as received; ciphertext stays ciphertext.
fn print_inbound(json_mode: bool, raw: &str) {
    if json_mode {
        println!("{}", inbound_event(raw));
    } else {
        println!("{}", raw);
    }
}

fn inbound_event(raw: &str) -> Value {
    let data = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    json!({ "event": "message", "data": data })
}
