//! Error types for Daybook core operations.
//!
//! Errors are descriptive at the core level; the CLI (or any other caller)
//! maps them to user-facing messages. Payloads are plain strings so a failed
//! initialization can be cloned and handed to every waiting caller.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type alias for Daybook operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Core error type for Daybook operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Neither key backend could produce or persist the encryption key
    #[error("Encryption key unavailable: {0}")]
    KeyUnavailable(String),

    /// The sealed database could not be opened or its schema created
    #[error("Note store unavailable: {0}")]
    StoreUnavailable(String),

    /// A read failed after successful initialization
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A write failed; prior data is left untouched
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// More than one note maps onto the same local day
    #[error("Store corruption: {count} notes found for {date}")]
    DuplicateDay { date: NaiveDate, count: usize },

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Incorrect passphrase while decrypting a backup
    #[error("Incorrect passphrase")]
    IncorrectPassphrase,

    /// Encryption or decryption error
    #[error("Encryption error: {0}")]
    Crypto(String),

    /// Application paths could not be resolved
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub(crate) fn query(err: impl std::fmt::Display) -> Self {
        StoreError::QueryFailed(err.to_string())
    }

    pub(crate) fn write(err: impl std::fmt::Display) -> Self {
        StoreError::WriteFailed(err.to_string())
    }

    pub(crate) fn unavailable(err: impl std::fmt::Display) -> Self {
        StoreError::StoreUnavailable(err.to_string())
    }

    /// Whether the failure invalidates the session (as opposed to a single operation).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::KeyUnavailable(_) | StoreError::StoreUnavailable(_)
        )
    }
}
