//! CLI error types for structured error handling.
//!
//! This module provides typed errors that map to specific exit codes,
//! enabling consistent error handling across the CLI. Core errors that reach
//! `main` untyped are classified by [`exit_code_for`].

use std::fmt;

use cipherpad_core::NotesError;

use crate::constants::exit_codes;

/// CLI-specific errors with associated exit codes.
#[derive(Debug)]
pub enum CliError {
    /// Resource not found (note, saved session)
    NotFound { message: String, hint: String },

    /// Authentication failed (bad credential, missing key)
    AuthFailed {
        message: String,
        hint: Option<String>,
    },

    /// Invalid user input
    InvalidInput(String),

    /// The stored notes do not open with the local key
    DecryptFailed { message: String, hint: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for CliError {}

impl CliError {
    /// Create a NotFound error with message and hint.
    pub fn not_found(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::NotFound {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Create an AuthFailed error with message and hint.
    pub fn auth_failed_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::AuthFailed {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    /// The account has no stored key on this device.
    pub fn not_logged_in() -> Self {
        Self::auth_failed_with_hint("Not logged in", "Run: cipherpad login")
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        CliError::InvalidInput(message.into())
    }

    pub fn decrypt_failed() -> Self {
        CliError::DecryptFailed {
            message: "Notes could not be decrypted with the stored key".to_string(),
            hint: "The credential differs from the one the notes were written with. \
                   Run: cipherpad logout && cipherpad login"
                .to_string(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CliError::NotFound { message, .. }
            | CliError::AuthFailed { message, .. }
            | CliError::DecryptFailed { message, .. } => message.as_str(),
            CliError::InvalidInput(message) => message.as_str(),
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            CliError::NotFound { hint, .. } | CliError::DecryptFailed { hint, .. } => {
                Some(hint.as_str())
            }
            CliError::AuthFailed { hint, .. } => hint.as_deref(),
            CliError::InvalidInput(_) => None,
        }
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::AuthFailed { .. } => exit_codes::AUTH_FAILED,
            CliError::InvalidInput(_) => exit_codes::INVALID_INPUT,
            CliError::DecryptFailed { .. } => exit_codes::DECRYPT_FAILED,
        }
    }
}

/// Exit code for any error surfacing from a command handler.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return cli_err.exit_code();
    }
    match err.downcast_ref::<NotesError>() {
        Some(NotesError::NotFound(_)) => exit_codes::NOT_FOUND,
        Some(NotesError::InvalidInput(_)) => exit_codes::INVALID_INPUT,
        Some(NotesError::NotAuthenticated) => exit_codes::AUTH_FAILED,
        Some(NotesError::Decrypt) => exit_codes::DECRYPT_FAILED,
        _ => 1,
    }
}

/// Hint for an error surfacing from a command handler, if one applies.
pub fn hint_for(err: &anyhow::Error) -> Option<String> {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return cli_err.hint().map(str::to_string);
    }
    match err.downcast_ref::<NotesError>()? {
        NotesError::NotAuthenticated => Some("Run: cipherpad login".to_string()),
        NotesError::Network(_) => {
            Some("Check the server URL in config.toml or --server".to_string())
        }
        NotesError::NotFound(_) => Some("Run: cipherpad list".to_string()),
        _ => None,
    }
}
