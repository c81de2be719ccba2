//! Core data types for the storage layer.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::days::local_date_of;

/// Maximum title length in Unicode scalar values.
pub const MAX_TITLE_CHARS: usize = 120;

/// A journal note. At most one exists per local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned surrogate key
    pub id: i64,

    /// Title, at most 120 characters, may be empty
    pub title: String,

    /// Body text, may be empty
    pub body: String,

    /// UTC instant of local midnight of the day this note belongs to
    pub note_date: DateTime<Utc>,

    /// When the note was first saved; never changes afterwards
    pub created_at: DateTime<Utc>,

    /// When the note was last saved
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// The local calendar day this note belongs to in `zone`.
    pub fn local_date<Z: TimeZone>(&self, zone: &Z) -> NaiveDate {
        local_date_of(zone, self.note_date)
    }
}

/// Content to write for one day.
#[derive(Debug, Clone)]
pub(crate) struct NoteDraft<'a> {
    pub title: &'a str,
    pub body: &'a str,
    /// Used only when the day has no note yet.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle of a `NoteStore` connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl std::fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StoreStatus::Uninitialized => "uninitialized",
            StoreStatus::Initializing => "initializing",
            StoreStatus::Ready => "ready",
            StoreStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Summary of the open store, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetadata {
    /// On-disk format version
    pub format_version: String,

    /// When the store file was first created
    pub created_at: DateTime<Utc>,

    /// Number of notes currently stored
    pub note_count: usize,
}
