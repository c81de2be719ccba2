//! CLI error types for structured error handling.
//!
//! Typed errors map to specific exit codes so scripts can tell a missing
//! note from a locked store.

use std::fmt;

use daybook_core::StoreError;

use crate::constants::exit_codes;

/// CLI-specific errors with associated exit codes.
#[derive(Debug)]
pub enum CliError {
    /// Resource not found (note for a day, backup file)
    NotFound { message: String, hint: String },

    /// Wrong backup passphrase
    AuthFailed {
        message: String,
        hint: Option<String>,
    },

    /// Invalid user input
    InvalidInput(String),

    /// Store or key could not be opened
    StoreUnavailable { message: String, hint: String },

    /// Integrity check failed or duplicate notes detected
    Integrity(String),

    /// A read, write, encryption or configuration failure
    Storage(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::NotFound { message, hint } | CliError::StoreUnavailable { message, hint } => {
                write!(f, "{}\nHint: {}", message, hint)
            }
            CliError::AuthFailed { message, hint } => {
                if let Some(h) = hint {
                    write!(f, "{}\nHint: {}", message, h)
                } else {
                    write!(f, "{}", message)
                }
            }
            CliError::InvalidInput(message)
            | CliError::Integrity(message)
            | CliError::Storage(message) => {
                write!(f, "{}", message)
            }
        }
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

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        CliError::InvalidInput(message.into())
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::AuthFailed { .. } => exit_codes::AUTH_FAILED,
            CliError::InvalidInput(_) => exit_codes::INVALID_INPUT,
            CliError::StoreUnavailable { .. } => exit_codes::STORE_UNAVAILABLE,
            CliError::Integrity(_) => exit_codes::INTEGRITY_FAILED,
            CliError::Storage(_) => exit_codes::GENERAL_ERROR,
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::KeyUnavailable(_) => CliError::StoreUnavailable {
                message: err.to_string(),
                hint: "Check that the keychain is unlocked, or set `keyring = false` under [keys] in the config".to_string(),
            },
            StoreError::StoreUnavailable(_) => CliError::StoreUnavailable {
                message: err.to_string(),
                hint: "The store file may belong to another key; restore from a backup with `daybook import`".to_string(),
            },
            StoreError::IncorrectPassphrase => CliError::auth_failed_with_hint(
                "Incorrect backup passphrase.",
                "Use the passphrase given to `daybook export`",
            ),
            StoreError::InvalidInput(message) => CliError::InvalidInput(message),
            StoreError::DuplicateDay { .. } => CliError::Integrity(err.to_string()),
            StoreError::QueryFailed(_)
            | StoreError::WriteFailed(_)
            | StoreError::Crypto(_)
            | StoreError::Config(_) => CliError::Storage(err.to_string()),
        }
    }
}

/// Exit code for an error returned from a command.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return cli_err.exit_code();
    }
    if let Some(store_err) = err.downcast_ref::<StoreError>() {
        return CliError::from(store_err.clone()).exit_code();
    }
    exit_codes::GENERAL_ERROR
}
