//! Note row type for database queries.

use chrono::{DateTime, Utc};

use crate::error::{Result, StoreError};
use crate::storage::types::Note;

/// Columns selected for every note query, in `NoteRow` order.
pub const NOTE_COLUMNS: &str = "id, title, body, note_date, created_at, updated_at";

/// Raw row data from the notes table, before parsing into domain types.
#[derive(Debug)]
pub struct NoteRow {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub note_date: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl NoteRow {
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            body: row.get(2)?,
            note_date: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

impl TryFrom<NoteRow> for Note {
    type Error = StoreError;

    fn try_from(row: NoteRow) -> Result<Self> {
        Ok(Note {
            id: row.id,
            title: row.title,
            body: row.body,
            note_date: instant_from_millis(row.note_date, "note_date")?,
            created_at: instant_from_millis(row.created_at, "created_at")?,
            updated_at: instant_from_millis(row.updated_at, "updated_at")?,
        })
    }
}

/// Instants are stored as UTC Unix milliseconds.
pub fn millis(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

fn instant_from_millis(value: i64, column: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value)
        .ok_or_else(|| StoreError::QueryFailed(format!("Invalid {} timestamp: {}", column, value)))
}
