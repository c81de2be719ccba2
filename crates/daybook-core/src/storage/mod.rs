//! Encrypted, date-indexed note storage.
//!
//! - [`NoteStore`]: async gateway used by callers
//! - [`NoteDatabase`]: synchronous sealed SQLite database behind it
//! - [`days`]: local calendar day to UTC range conversion
//! - [`backup`]: passphrase-encrypted export format

pub mod backup;
pub mod database;
pub mod days;
pub mod encryption;
pub mod note_store;
mod row;
pub mod types;

pub use backup::{Backup, BackupNote};
pub use database::NoteDatabase;
pub use days::{LocalDay, UtcRange};
pub use note_store::NoteStore;
pub use types::{Note, StoreMetadata, StoreStatus, MAX_TITLE_CHARS};
