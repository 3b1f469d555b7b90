//! Application-level helpers for the CLI.

mod context;

pub use context::AppContext;
