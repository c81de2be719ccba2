//! # Daybook Core
//!
//! Core library for Daybook - an encrypted personal journal with one note per
//! calendar day.
//!
//! This crate owns the encryption key lifecycle and the note store, independent
//! of any user interface.
//!
//! ## Architecture
//!
//! - **keys**: key generation and persistence across a secure and a fallback backend
//! - **storage**: sealed SQLite database, local-day ranges, the async `NoteStore`
//! - **config**: store locations and key backend selection
//! - **error**: the `StoreError` taxonomy shared by every operation

pub mod config;
pub mod error;
pub mod fs;
pub mod keys;
pub mod storage;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use keys::{EncryptionKey, KeyBackend, KeyVault};
pub use storage::{Note, NoteStore, StoreStatus};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
