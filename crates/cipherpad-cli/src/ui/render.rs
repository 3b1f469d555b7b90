//! Rendering primitives for CLI output.
//!
//! Every helper returns a `String` shaped by [`OutputMode`]: pretty output is
//! for people at a terminal, plain output is `key=value` lines for scripts.

use chrono::{DateTime, Utc};
use comfy_table::presets::NOTHING;
use comfy_table::{Attribute, Cell, ContentArrangement, Table as ComfyTable};

use super::context::UiContext;
use super::mode::OutputMode;
use super::theme::{styled, styles, Badge};

/// `Cipherpad · list (3 notes)` when pretty, `cipherpad list` when plain.
pub fn header(ctx: &UiContext, command: &str, context: Option<&str>) -> String {
    match ctx.mode {
        OutputMode::Json => String::new(),
        OutputMode::Plain => format!("cipherpad {}", command),
        OutputMode::Pretty => {
            let mut line = format!(
                "{} \u{00B7} {}",
                styled("Cipherpad", styles::bold(), ctx.color),
                command
            );
            if let Some(context) = context {
                line.push_str(&format!(" ({})", context));
            }
            line
        }
    }
}

pub fn badge(ctx: &UiContext, kind: Badge, message: &str) -> String {
    let mark = styled(kind.display(ctx.unicode), kind.style(), ctx.color);
    if message.is_empty() {
        mark
    } else {
        format!("{} {}", mark, message)
    }
}

/// Pretty: dim `Key:` label. Plain: `key=value` with a snake_case key.
pub fn kv(ctx: &UiContext, key: &str, value: &str) -> String {
    if !ctx.mode.is_pretty() {
        return format!("{}={}", key.to_lowercase().replace(' ', "_"), value);
    }
    format!("{} {}", dim_label(ctx, key), value)
}

pub fn hint(ctx: &UiContext, text: &str) -> String {
    kv(ctx, "Hint", text)
}

fn dim_label(ctx: &UiContext, label: &str) -> String {
    styled(&format!("{}:", label), styles::dim(), ctx.color)
}

/// Summary block printed after a successful action.
pub fn receipt(ctx: &UiContext, title: &str, items: &[(&str, &str)]) -> String {
    let (first, indent) = if ctx.mode.is_pretty() {
        (badge(ctx, Badge::Ok, title), "  ")
    } else {
        ("status=ok".to_string(), "")
    };
    std::iter::once(first)
        .chain(
            items
                .iter()
                .map(|(key, value)| format!("{}{}", indent, kv(ctx, key, value))),
        )
        .collect::<Vec<_>>()
        .join("\n")
}

/// Borderless table with a dim header when pretty; tab-separated rows
/// without a header otherwise.
pub fn simple_table(ctx: &UiContext, columns: &[&str], rows: &[Vec<String>]) -> String {
    if !ctx.mode.is_pretty() {
        return rows
            .iter()
            .map(|row| row.join("\t"))
            .collect::<Vec<_>>()
            .join("\n");
    }

    let mut table = ComfyTable::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(u16::try_from(ctx.width).unwrap_or(u16::MAX))
        .set_header(columns.iter().map(|name| {
            let cell = Cell::new(name);
            if ctx.color {
                cell.add_attribute(Attribute::Dim)
            } else {
                cell
            }
        }));
    for column in table.column_iter_mut() {
        column.set_padding((0, 2));
    }
    for row in rows {
        table.add_row(row);
    }
    table.to_string()
}

/// Print to stdout; JSON mode prints its own payload instead.
pub fn print(ctx: &UiContext, message: &str) {
    if !ctx.mode.is_json() && !message.is_empty() {
        println!("{}", message);
    }
}

pub fn error_message(ctx: &UiContext, message: &str, error_hint: Option<&str>) -> String {
    let first = if ctx.mode.is_pretty() {
        badge(ctx, Badge::Err, message)
    } else {
        format!("error={}", message)
    };
    match error_hint {
        Some(h) => format!("{}\n{}", first, hint(ctx, h)),
        None => first,
    }
}

/// Errors always go to stderr, whatever the output mode.
pub fn print_error(ctx: &UiContext, message: &str, error_hint: Option<&str>) {
    eprintln!("{}", error_message(ctx, message, error_hint));
}

/// First line of `s`, cut to `max_len` characters with a trailing `...`
/// whenever anything was dropped.
pub fn truncate(s: &str, max_len: usize) -> String {
    let line = s.lines().next().unwrap_or("");
    let multiline = line.len() < s.len();
    if !multiline && line.chars().count() <= max_len {
        return line.to_string();
    }
    if max_len <= 3 {
        return line.chars().take(max_len).collect();
    }
    let kept: String = line.chars().take(max_len - 3).collect();
    format!("{}...", kept)
}

pub fn format_datetime(dt: &DateTime<Utc>, pretty: bool) -> String {
    if pretty {
        dt.format("%Y-%m-%d %H:%M UTC").to_string()
    } else {
        dt.to_rfc3339()
    }
}
