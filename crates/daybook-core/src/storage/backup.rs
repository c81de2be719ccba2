//! Portable, passphrase-encrypted backups.
//!
//! A backup is the JSON document below, encrypted with Age. It does not
//! depend on the installation key, so it can be restored on a new device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::storage::encryption::{decrypt_with_passphrase, encrypt_with_passphrase};
use crate::storage::types::Note;

/// Value of the `format` field in every backup document.
pub const BACKUP_FORMAT: &str = "daybook-backup";

/// Current backup document version.
pub const BACKUP_VERSION: u32 = 1;

/// Minimum backup passphrase length in characters.
const MIN_PASSPHRASE_LENGTH: usize = 8;

/// Decrypted backup document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub format: String,
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub notes: Vec<BackupNote>,
}

/// One note as carried in a backup. Ids are not portable and are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupNote {
    pub title: String,
    pub body: String,
    pub note_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Note> for BackupNote {
    fn from(note: Note) -> Self {
        Self {
            title: note.title,
            body: note.body,
            note_date: note.note_date,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

impl Backup {
    pub fn new(notes: Vec<Note>) -> Self {
        Self {
            format: BACKUP_FORMAT.to_string(),
            version: BACKUP_VERSION,
            exported_at: Utc::now(),
            notes: notes.into_iter().map(BackupNote::from).collect(),
        }
    }

    /// Serialize and encrypt under `passphrase`.
    pub fn seal(&self, passphrase: &str) -> Result<Vec<u8>> {
        validate_passphrase(passphrase)?;
        let json = zeroize::Zeroizing::new(
            serde_json::to_vec(self)
                .map_err(|e| StoreError::Crypto(format!("Backup encoding failed: {}", e)))?,
        );
        encrypt_with_passphrase(&json, passphrase)
    }

    /// Decrypt and parse a sealed backup.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::IncorrectPassphrase` for a wrong passphrase and
    /// `StoreError::InvalidInput` for a document that is not a supported backup.
    pub fn open(sealed: &[u8], passphrase: &str) -> Result<Self> {
        let json = decrypt_with_passphrase(sealed, passphrase)?;
        let backup: Backup = serde_json::from_slice(&json)
            .map_err(|e| StoreError::InvalidInput(format!("Malformed backup: {}", e)))?;

        if backup.format != BACKUP_FORMAT {
            return Err(StoreError::InvalidInput(format!(
                "Not a daybook backup (format {:?})",
                backup.format
            )));
        }
        if backup.version > BACKUP_VERSION {
            return Err(StoreError::InvalidInput(format!(
                "Backup version {} is newer than supported version {}",
                backup.version, BACKUP_VERSION
            )));
        }
        Ok(backup)
    }
}

/// Validate a backup passphrase: not blank, at least 8 characters.
pub fn validate_passphrase(passphrase: &str) -> Result<()> {
    if passphrase.trim().is_empty() {
        return Err(StoreError::InvalidInput(
            "Passphrase cannot be empty".to_string(),
        ));
    }

    let length = passphrase.chars().count();
    if length < MIN_PASSPHRASE_LENGTH {
        return Err(StoreError::InvalidInput(format!(
            "Passphrase must be at least {} characters (got {})",
            MIN_PASSPHRASE_LENGTH, length
        )));
    }

    Ok(())
}
