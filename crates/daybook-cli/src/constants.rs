//! Constants used throughout the CLI.

/// Exit codes for the CLI.
///
/// These follow common Unix conventions:
/// - 0: Success
/// - 1: General error (used by anyhow for unhandled errors)
/// - 2: Misuse of shell command (reserved by shells, used by clap)
/// - 3+: Application-specific errors
pub mod exit_codes {
    /// Storage, encryption or configuration failure not caused by the input.
    pub const GENERAL_ERROR: i32 = 1;

    /// No note for the requested day, or a missing backup file.
    pub const NOT_FOUND: i32 = 3;

    /// Invalid user input or arguments.
    pub const INVALID_INPUT: i32 = 4;

    /// Wrong backup passphrase.
    pub const AUTH_FAILED: i32 = 5;

    /// Integrity check failed or the store is corrupted.
    pub const INTEGRITY_FAILED: i32 = 6;

    /// The encryption key or the store file could not be opened.
    pub const STORE_UNAVAILABLE: i32 = 7;
}

/// Environment variables read by the CLI.
pub mod env {
    /// Backup passphrase for non-interactive export/import.
    pub const BACKUP_PASSPHRASE: &str = "DAYBOOK_BACKUP_PASSPHRASE";
}

/// Default number of notes shown by `daybook list`.
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Maximum body preview width in list and month tables.
pub const PREVIEW_WIDTH: usize = 48;
