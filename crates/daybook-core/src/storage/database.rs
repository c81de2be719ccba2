//! Sealed SQLite note database.
//!
//! The database is held in memory and serialized to disk, sealed with the
//! installation key, after every successful write. The file on disk is
//! replaced atomically, and a write that cannot be persisted rolls the
//! in-memory image back, so memory and disk never disagree.
//!
//! This type is synchronous; `NoteStore` drives it from blocking tasks.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rusqlite::serialize::OwnedData;
use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Transaction};
use tracing::{debug, error, info, warn};

use crate::error::{Result, StoreError};
use crate::keys::EncryptionKey;
use crate::storage::days::{LocalDay, UtcRange};
use crate::storage::encryption::{seal, unseal};
use crate::storage::row::{millis, NoteRow, NOTE_COLUMNS};
use crate::storage::types::{Note, NoteDraft, StoreMetadata, MAX_TITLE_CHARS};

/// Current on-disk format version.
pub const FORMAT_VERSION: &str = "1";

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS notes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL DEFAULT '' CHECK (length(title) <= 120),
        body TEXT NOT NULL DEFAULT '',
        note_date INTEGER NOT NULL UNIQUE,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
"#;

/// An open, decrypted note database bound to its sealed file.
pub struct NoteDatabase {
    path: PathBuf,
    conn: Connection,
    key: EncryptionKey,
}

impl NoteDatabase {
    /// Open the sealed file at `path`, creating it if it does not exist.
    ///
    /// Schema creation is non-destructive: an existing store keeps its notes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreUnavailable` if the file cannot be read or
    /// written, the key does not match, the file is corrupted, or the schema
    /// cannot be created.
    pub fn open_or_create(path: &Path, key: EncryptionKey) -> Result<Self> {
        let started_at = Instant::now();
        let exists = path.exists();
        info!(path = %path.display(), exists, "opening note store");

        let result = if exists {
            Self::open_existing(path, key)
        } else {
            Self::create(path, key)
        };

        match &result {
            Ok(_) => info!(
                duration_ms = started_at.elapsed().as_millis() as u64,
                "note store ready"
            ),
            Err(err) => error!(
                duration_ms = started_at.elapsed().as_millis() as u64,
                error = %err,
                "note store open failed"
            ),
        }
        result
    }

    fn create(path: &Path, key: EncryptionKey) -> Result<Self> {
        crate::fs::ensure_parent_dir(path).map_err(|e| {
            StoreError::StoreUnavailable(format!("Failed to create store directory: {}", e))
        })?;

        let conn = Connection::open_in_memory().map_err(StoreError::unavailable)?;
        let db = Self {
            path: path.to_path_buf(),
            conn,
            key,
        };
        db.ensure_schema()?;
        db.flush().map_err(|e| match e {
            StoreError::WriteFailed(msg) => StoreError::StoreUnavailable(msg),
            other => other,
        })?;
        info!(path = %path.display(), "created new note store");
        Ok(db)
    }

    fn open_existing(path: &Path, key: EncryptionKey) -> Result<Self> {
        let sealed = std::fs::read(path).map_err(|e| {
            StoreError::StoreUnavailable(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let plaintext = unseal(&key, &sealed).map_err(|e| match e {
            StoreError::Crypto(msg) => StoreError::StoreUnavailable(msg),
            other => other,
        })?;

        let mut conn = Connection::open_in_memory().map_err(StoreError::unavailable)?;
        let owned_data = owned_data_from_bytes(&plaintext)?;
        conn.deserialize(DatabaseName::Main, owned_data, false)
            .map_err(StoreError::unavailable)?;

        let db = Self {
            path: path.to_path_buf(),
            conn,
            key,
        };
        if db.ensure_schema()? {
            db.flush().map_err(|e| match e {
                StoreError::WriteFailed(msg) => StoreError::StoreUnavailable(msg),
                other => other,
            })?;
        }
        Ok(db)
    }

    /// Create missing tables and metadata. Returns whether anything changed.
    fn ensure_schema(&self) -> Result<bool> {
        let had_notes: bool = self
            .conn
            .query_row(
                "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'notes')",
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::unavailable)?;

        self.conn
            .execute_batch(SCHEMA)
            .map_err(|e| StoreError::StoreUnavailable(format!("Schema creation failed: {}", e)))?;

        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;
        for (key, value) in [("format_version", FORMAT_VERSION), ("created_at", now.as_str())] {
            inserted += self
                .conn
                .execute(
                    "INSERT OR IGNORE INTO meta (key, value) VALUES (?, ?)",
                    [key, value],
                )
                .map_err(StoreError::unavailable)?;
        }

        if !had_notes {
            debug!("created notes schema");
        }
        Ok(!had_notes || inserted > 0)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // --- Reads ---

    /// Notes whose `note_date` lies in `range`, oldest first.
    pub fn notes_in_range(&self, range: &UtcRange) -> Result<Vec<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM notes WHERE note_date >= ? AND note_date < ? ORDER BY note_date ASC",
                NOTE_COLUMNS
            ))
            .map_err(StoreError::query)?;
        let rows = stmt
            .query_map(
                params![millis(range.start), millis(range.end)],
                NoteRow::from_row,
            )
            .map_err(StoreError::query)?;

        let mut notes: Vec<Note> = Vec::new();
        for row in rows {
            notes.push(row.map_err(StoreError::query)?.try_into()?);
        }
        Ok(notes)
    }

    /// The note for `day`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateDay` when more than one note maps onto the day.
    pub fn note_for_day(&self, day: &LocalDay) -> Result<Option<Note>> {
        let mut notes = self.notes_in_range(&day.range)?;
        match notes.len() {
            0 | 1 => Ok(notes.pop()),
            count => Err(StoreError::DuplicateDay {
                date: day.date,
                count,
            }),
        }
    }

    /// Every note, newest `note_date` first.
    pub fn all_notes(&self) -> Result<Vec<Note>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM notes ORDER BY note_date DESC",
                NOTE_COLUMNS
            ))
            .map_err(StoreError::query)?;
        let rows = stmt
            .query_map([], NoteRow::from_row)
            .map_err(StoreError::query)?;

        let mut notes: Vec<Note> = Vec::new();
        for row in rows {
            notes.push(row.map_err(StoreError::query)?.try_into()?);
        }
        Ok(notes)
    }

    pub fn metadata(&self) -> Result<StoreMetadata> {
        let meta = |key: &str| -> Result<String> {
            self.conn
                .query_row("SELECT value FROM meta WHERE key = ?", [key], |row| {
                    row.get(0)
                })
                .map_err(StoreError::query)
        };

        let format_version = meta("format_version")?;
        let created_at = DateTime::parse_from_rfc3339(&meta("created_at")?)
            .map_err(|e| StoreError::QueryFailed(format!("Invalid created_at: {}", e)))?
            .with_timezone(&Utc);
        let note_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .map_err(StoreError::query)?;

        Ok(StoreMetadata {
            format_version,
            created_at,
            note_count: note_count as usize,
        })
    }

    // --- Writes ---

    /// Insert or overwrite the note for `day`.
    ///
    /// `note_date` is set to the day's UTC-normalized midnight. An existing
    /// note keeps its id and `created_at`.
    pub(crate) fn upsert_day(&mut self, day: &LocalDay, draft: &NoteDraft<'_>) -> Result<Note> {
        validate_title(draft.title)?;
        self.write(|tx| upsert_in_tx(tx, day, draft))
    }

    /// Upsert many days in one all-or-nothing write. Returns the number of
    /// distinct days written; when several drafts share a day the last wins.
    pub(crate) fn upsert_days(&mut self, days: &[(LocalDay, NoteDraft<'_>)]) -> Result<usize> {
        for (_, draft) in days {
            validate_title(draft.title)?;
        }

        let mut seen = HashSet::new();
        for (day, _) in days {
            if !seen.insert(day.date) {
                warn!(date = %day.date, "several notes map onto one day; keeping the last");
            }
        }
        let distinct = seen.len();

        self.write(|tx| {
            for (day, draft) in days {
                upsert_in_tx(tx, day, draft)?;
            }
            Ok(distinct)
        })
    }

    /// Remove every note. Returns the number removed.
    pub fn delete_all(&mut self) -> Result<usize> {
        self.write(|tx| tx.execute("DELETE FROM notes", []).map_err(StoreError::write))
    }

    /// Run `op` in a transaction, then persist. On any failure the in-memory
    /// database is left exactly as it was before the call.
    fn write<T>(&mut self, op: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let snapshot = self
            .conn
            .serialize(DatabaseName::Main)
            .map_err(StoreError::write)?
            .to_vec();

        let value = {
            let tx = self.conn.transaction().map_err(StoreError::write)?;
            let value = op(&tx)?;
            tx.commit().map_err(StoreError::write)?;
            value
        };

        if let Err(err) = self.flush() {
            warn!(error = %err, "persisting write failed; rolling back in-memory state");
            self.restore(&snapshot)?;
            return Err(err);
        }
        Ok(value)
    }

    fn restore(&mut self, image: &[u8]) -> Result<()> {
        let owned = owned_data_from_bytes(image)?;
        self.conn
            .deserialize(DatabaseName::Main, owned, false)
            .map_err(|e| StoreError::WriteFailed(format!("Rollback failed: {}", e)))
    }

    /// Seal the current image and atomically replace the file.
    fn flush(&self) -> Result<()> {
        let image = self
            .conn
            .serialize(DatabaseName::Main)
            .map_err(StoreError::write)?;
        let sealed = seal(&self.key, &image).map_err(StoreError::write)?;
        crate::fs::write_atomic(&self.path, &sealed, true).map_err(|e| {
            StoreError::WriteFailed(format!("Failed to write {}: {}", self.path.display(), e))
        })
    }

    // --- Maintenance ---

    /// Verify SQLite integrity and the one-note-per-instant constraint.
    pub fn check_integrity(&self) -> Result<()> {
        let status: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .map_err(StoreError::query)?;
        if status != "ok" {
            return Err(StoreError::QueryFailed(format!(
                "Integrity check failed: {}",
                status
            )));
        }

        let over_long: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM notes WHERE length(title) > ?",
                [MAX_TITLE_CHARS as i64],
                |row| row.get(0),
            )
            .map_err(StoreError::query)?;
        if over_long > 0 {
            return Err(StoreError::QueryFailed(
                "Notes with over-long titles present".to_string(),
            ));
        }

        let metadata_count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM meta WHERE key IN ('format_version', 'created_at')",
                [],
                |row| row.get(0),
            )
            .map_err(StoreError::query)?;
        if metadata_count < 2 {
            return Err(StoreError::QueryFailed(
                "Metadata table missing required keys".to_string(),
            ));
        }

        Ok(())
    }
}

fn upsert_in_tx(tx: &Transaction<'_>, day: &LocalDay, draft: &NoteDraft<'_>) -> Result<Note> {
    let range = &day.range;
    let existing = {
        let mut stmt = tx
            .prepare("SELECT id FROM notes WHERE note_date >= ? AND note_date < ?")
            .map_err(StoreError::write)?;
        let ids = stmt
            .query_map(params![millis(range.start), millis(range.end)], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(StoreError::write)?;
        ids.collect::<rusqlite::Result<Vec<i64>>>()
            .map_err(StoreError::write)?
    };

    let id = match existing.as_slice() {
        [] => {
            tx.execute(
                "INSERT INTO notes (title, body, note_date, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
                params![
                    draft.title,
                    draft.body,
                    millis(range.start),
                    millis(draft.created_at),
                    millis(draft.updated_at),
                ],
            )
            .map_err(StoreError::write)?;
            tx.last_insert_rowid()
        }
        [id] => {
            tx.execute(
                "UPDATE notes SET title = ?, body = ?, note_date = ?, updated_at = ? WHERE id = ?",
                params![
                    draft.title,
                    draft.body,
                    millis(range.start),
                    millis(draft.updated_at),
                    id
                ],
            )
            .map_err(StoreError::write)?;
            *id
        }
        many => {
            return Err(StoreError::DuplicateDay {
                date: day.date,
                count: many.len(),
            })
        }
    };

    tx.query_row(
        &format!("SELECT {} FROM notes WHERE id = ?", NOTE_COLUMNS),
        [id],
        NoteRow::from_row,
    )
    .optional()
    .map_err(StoreError::write)?
    .ok_or_else(|| StoreError::WriteFailed("Saved note vanished".to_string()))?
    .try_into()
}

pub(crate) fn validate_title(title: &str) -> Result<()> {
    let count = title.chars().count();
    if count > MAX_TITLE_CHARS {
        return Err(StoreError::InvalidInput(format!(
            "Title must be at most {} characters (got {})",
            MAX_TITLE_CHARS, count
        )));
    }
    Ok(())
}

fn owned_data_from_bytes(bytes: &[u8]) -> Result<OwnedData> {
    if bytes.is_empty() {
        return Err(StoreError::StoreUnavailable(
            "SQLite payload is empty".to_string(),
        ));
    }

    let size: i32 = bytes
        .len()
        .try_into()
        .map_err(|_| StoreError::StoreUnavailable("SQLite payload too large".to_string()))?;

    // SAFETY: sqlite3_malloc returns a valid pointer or null; null is checked
    // below. `size` fits in i32 (validated above).
    let raw = unsafe { rusqlite::ffi::sqlite3_malloc(size) as *mut u8 };
    let ptr = NonNull::new(raw)
        .ok_or_else(|| StoreError::StoreUnavailable("SQLite allocation failed".to_string()))?;

    // SAFETY:
    // - `ptr` is non-null and writable for `bytes.len()` bytes (sqlite3_malloc(size)
    //   with size == bytes.len())
    // - `bytes` is valid for reads of `bytes.len()` bytes and cannot overlap the
    //   freshly allocated buffer
    // - `OwnedData::from_raw_nonnull` takes ownership of the sqlite3_malloc'd buffer
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
        Ok(OwnedData::from_raw_nonnull(ptr, bytes.len()))
    }
}
