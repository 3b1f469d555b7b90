//! Constants used throughout the CLI.

/// Exit codes for the CLI.
///
/// These follow common Unix conventions:
/// - 0: Success
/// - 1: General error (used by anyhow for unhandled errors)
/// - 2: Misuse of shell command (reserved by shells)
/// - 3+: Application-specific errors
pub mod exit_codes {
    /// Resource not found (note, account, saved session).
    pub const NOT_FOUND: i32 = 3;

    /// Invalid user input or arguments.
    pub const INVALID_INPUT: i32 = 4;

    /// Authentication failed (bad credential, expired session, not logged in).
    pub const AUTH_FAILED: i32 = 5;

    /// Stored notes could not be decrypted with the local key.
    pub const DECRYPT_FAILED: i32 = 6;
}

/// Environment variables the CLI reads.
pub mod env {
    pub const CONFIG: &str = "CIPHERPAD_CONFIG";
    pub const PASSWORD: &str = "CIPHERPAD_PASSWORD";
    pub const LOG: &str = "CIPHERPAD_LOG";
}

/// Keychain service name for stored note keys.
pub const KEYCHAIN_SERVICE: &str = "cipherpad";

/// Default REST base URL.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000/api";

/// Log filter used when `CIPHERPAD_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "cipherpad=warn,cipherpad_core=warn";

/// How long `edit` waits for its changes to reach the server.
pub const DELIVERY_TIMEOUT_SECS: u64 = 15;
