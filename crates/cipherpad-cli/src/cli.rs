use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use cipherpad_core::VERSION;

/// Cipherpad - end-to-end encrypted notes, synced in real time
#[derive(Parser)]
#[command(name = "cipherpad")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// REST base URL of the note server (overrides config)
    #[arg(short, long, global = true, env = "CIPHERPAD_SERVER")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Use ASCII symbols only
    #[arg(long, global = true)]
    pub ascii: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the note key on this device
    Login(LoginArgs),

    /// Create an account and store the note key on this device
    Signup(SignupArgs),

    /// End the server session and forget the note key
    Logout,

    /// List notes by folder
    List(ListArgs),

    /// Create a note
    New(NewArgs),

    /// Delete a note
    Delete(DeleteArgs),

    /// Change a note's title or content
    Edit(EditArgs),

    /// Keep the sync channel open and print what arrives
    Watch(WatchArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for the `login` command
#[derive(Args)]
pub struct LoginArgs {
    /// Account email (defaults to the configured account)
    #[arg(long)]
    pub email: Option<String>,
}

/// Arguments for the `signup` command
#[derive(Args)]
pub struct SignupArgs {
    /// Account email
    #[arg(long)]
    pub email: Option<String>,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,
}

/// Arguments for the `list` command
#[derive(Args)]
pub struct ListArgs {
    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `new` command
#[derive(Args)]
pub struct NewArgs {
    /// Note title
    #[arg(long)]
    pub title: String,

    /// Folder to file the note under (defaults to root)
    #[arg(long)]
    pub folder: Option<String>,

    /// Note content
    #[arg(long)]
    pub content: Option<String>,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `delete` command
#[derive(Args)]
pub struct DeleteArgs {
    /// Note ID
    pub id: String,
}

/// Arguments for the `edit` command
#[derive(Args)]
pub struct EditArgs {
    /// Note ID
    pub id: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New content (read from stdin when omitted and stdin is piped)
    #[arg(long)]
    pub content: Option<String>,
}

/// Arguments for the `watch` command
#[derive(Args)]
pub struct WatchArgs {
    /// Output one JSON object per event
    #[arg(long)]
    pub json: bool,
}
