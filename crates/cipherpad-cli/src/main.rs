//! Cipherpad CLI - end-to-end encrypted notes from the terminal
//!
//! Thin front end over `cipherpad-core`: every command opens a session for
//! the logged-in account, does its work and tears the session down again.

mod app;
mod cli;
mod commands;
mod config;
mod constants;
mod errors;
mod security;
mod ui;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use app::AppContext;
use cli::{Cli, Commands};
use constants::{env, DEFAULT_LOG_FILTER};
use errors::{exit_code_for, hint_for};
use ui::print_error;

fn main() {
    let cli = Cli::parse();
    init_tracing();
    let ctx = AppContext::new(&cli);

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| runtime.block_on(run(&ctx, &cli)));

    if let Err(e) = result {
        let ui_ctx = ctx.ui(false);
        let hint = hint_for(&e);
        print_error(&ui_ctx, &format!("{:#}", e), hint.as_deref());
        std::process::exit(exit_code_for(&e));
    }
}

/// Diagnostics go to stderr so stdout stays scriptable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(env::LOG)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(ctx: &AppContext<'_>, cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Login(args) => commands::handle_login(ctx, args).await,
        Commands::Signup(args) => commands::handle_signup(ctx, args).await,
        Commands::Logout => commands::handle_logout(ctx).await,
        Commands::List(args) => commands::handle_list(ctx, args).await,
        Commands::New(args) => commands::handle_new(ctx, args).await,
        Commands::Delete(args) => commands::handle_delete(ctx, args).await,
        Commands::Edit(args) => commands::handle_edit(ctx, args).await,
        Commands::Watch(args) => commands::handle_watch(ctx, args).await,
        Commands::Completions { shell } => commands::handle_completions(*shell),
    }
}
