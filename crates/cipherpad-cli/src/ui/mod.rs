//! UI primitives for the Cipherpad CLI.
//!
//! - **Context**: Environment detection (TTY, width, color, unicode)
//! - **Mode**: Output mode resolution (json, plain, pretty)
//! - **Theme**: Badges and text styles
//! - **Render**: Tables, headers, receipts, hints, errors

mod context;
mod mode;
pub mod render;
pub mod theme;

pub use context::UiContext;
pub use theme::Badge;

pub use render::{
    badge, format_datetime, header, hint, print, print_error, receipt, simple_table, truncate,
};
