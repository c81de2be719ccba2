//! The async note store.
//!
//! `NoteStore` is the single gateway to persisted notes. It owns the one open
//! database, opens it lazily on first use, and maps local calendar days onto
//! UTC ranges so that at most one note exists per day.
//!
//! Initialization is single-flight: concurrent callers queue on one gate, the
//! first performs the work and every other caller observes its outcome. A
//! failed initialization is remembered and returned to every later caller
//! until [`NoteStore::reinitialize`] is called.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::{Local, NaiveDate, TimeZone, Utc};
use tracing::{debug, error, info};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::keys::KeyVault;
use crate::storage::backup::{validate_passphrase, Backup};
use crate::storage::database::{validate_title, NoteDatabase};
use crate::storage::days::{local_date_of, local_day, month_range, LocalDay};
use crate::storage::types::{Note, NoteDraft, StoreMetadata, StoreStatus};

type SharedDatabase = Arc<Mutex<NoteDatabase>>;

enum StoreState {
    Uninitialized,
    Initializing,
    Ready(SharedDatabase),
    Failed(StoreError),
}

struct Inner<Z> {
    database_path: PathBuf,
    vault: Arc<KeyVault>,
    zone: Z,
    gate: tokio::sync::Mutex<()>,
    state: Mutex<StoreState>,
}

/// Handle to the encrypted note store.
///
/// Cloning is cheap; clones share the same connection and lifecycle. Local
/// days are interpreted in `Z`, the device's local zone by default.
pub struct NoteStore<Z: TimeZone = Local> {
    inner: Arc<Inner<Z>>,
}

impl<Z: TimeZone> Clone for NoteStore<Z> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl NoteStore<Local> {
    /// Store at `database_path`, keyed by `vault`, using the local time zone.
    pub fn new(database_path: impl Into<PathBuf>, vault: KeyVault) -> Self {
        Self::with_zone(database_path, vault, Local)
    }

    /// Store and key backends described by `config`, using the local time zone.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.database_path.clone(), KeyVault::from_config(config))
    }
}

impl<Z> NoteStore<Z>
where
    Z: TimeZone + Send + Sync,
{
    /// Store whose local days are interpreted in `zone`.
    pub fn with_zone(database_path: impl Into<PathBuf>, vault: KeyVault, zone: Z) -> Self {
        Self {
            inner: Arc::new(Inner {
                database_path: database_path.into(),
                vault: Arc::new(vault),
                zone,
                gate: tokio::sync::Mutex::new(()),
                state: Mutex::new(StoreState::Uninitialized),
            }),
        }
    }

    pub fn database_path(&self) -> &Path {
        &self.inner.database_path
    }

    pub fn zone(&self) -> &Z {
        &self.inner.zone
    }

    /// Current lifecycle state.
    pub fn status(&self) -> StoreStatus {
        match &*self.state() {
            StoreState::Uninitialized => StoreStatus::Uninitialized,
            StoreState::Initializing => StoreStatus::Initializing,
            StoreState::Ready(_) => StoreStatus::Ready,
            StoreState::Failed(_) => StoreStatus::Failed,
        }
    }

    /// Open the store if it is not open yet.
    ///
    /// Safe to call concurrently and repeatedly; at most one attempt runs.
    /// A failed attempt is terminal and every call returns the same error
    /// until [`NoteStore::reinitialize`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::KeyUnavailable` if no key can be obtained or
    /// persisted, and `StoreError::StoreUnavailable` if the file cannot be
    /// opened or its schema created.
    pub async fn initialize(&self) -> Result<()> {
        self.database().await.map(|_| ())
    }

    /// Clear a failed initialization and try again.
    ///
    /// On a store that is already open this is the same as [`NoteStore::initialize`].
    pub async fn reinitialize(&self) -> Result<()> {
        {
            let _gate = self.inner.gate.lock().await;
            let mut state = self.state();
            if matches!(*state, StoreState::Failed(_)) {
                info!("clearing failed note store initialization");
                *state = StoreState::Uninitialized;
            }
        }
        self.initialize().await
    }

    /// Release the open database. The next operation opens it again.
    ///
    /// Every successful write is already on disk, so nothing is flushed here.
    pub async fn close(&self) {
        let _gate = self.inner.gate.lock().await;
        let previous = std::mem::replace(&mut *self.state(), StoreState::Uninitialized);
        if matches!(previous, StoreState::Ready(_)) {
            info!(path = %self.inner.database_path.display(), "closed note store");
        }
    }

    /// Notes whose day falls in the local calendar month containing `month`,
    /// oldest first.
    pub async fn get_notes_for_month(&self, month: NaiveDate) -> Result<Vec<Note>> {
        let range = month_range(&self.inner.zone, month)?;
        self.with_database(move |db| db.notes_in_range(&range)).await
    }

    /// The note for local day `date`, or `None` if the day has none.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateDay` if the store holds more than one note
    /// for the day.
    pub async fn get_note_for_date(&self, date: NaiveDate) -> Result<Option<Note>> {
        let day = local_day(&self.inner.zone, date)?;
        self.with_database(move |db| db.note_for_day(&day)).await
    }

    /// Insert or overwrite the note for local day `date`.
    ///
    /// Title and body are stored as given; callers trim them. A new note gets
    /// `created_at = now`; an existing one keeps its `created_at`. Both get
    /// `updated_at = now`. On failure the previous note for the day is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` for a title over 120 characters,
    /// `StoreError::WriteFailed` if the change cannot be persisted.
    pub async fn save_note_for_date(
        &self,
        date: NaiveDate,
        title: &str,
        body: &str,
    ) -> Result<Note> {
        validate_title(title)?;
        let day = local_day(&self.inner.zone, date)?;
        let title = title.to_string();
        let body = body.to_string();

        let note = self
            .with_database(move |db| {
                let now = Utc::now();
                db.upsert_day(
                    &day,
                    &NoteDraft {
                        title: &title,
                        body: &body,
                        created_at: now,
                        updated_at: now,
                    },
                )
            })
            .await?;
        debug!(id = note.id, date = %date, "saved note");
        Ok(note)
    }

    /// Every note, newest first.
    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        self.with_database(|db| db.all_notes()).await
    }

    /// Irreversibly delete every note. Returns how many were removed.
    pub async fn delete_all(&self) -> Result<usize> {
        let count = self.with_database(|db| db.delete_all()).await?;
        info!(count, "deleted all notes");
        Ok(count)
    }

    pub async fn metadata(&self) -> Result<StoreMetadata> {
        self.with_database(|db| db.metadata()).await
    }

    pub async fn check_integrity(&self) -> Result<()> {
        self.with_database(|db| db.check_integrity()).await
    }

    /// Write every note to `path` as a passphrase-encrypted backup.
    /// Returns the number of notes exported.
    pub async fn export_backup(&self, path: &Path, passphrase: &str) -> Result<usize> {
        validate_passphrase(passphrase)?;
        let notes = self.list_notes().await?;
        let count = notes.len();

        let path = path.to_path_buf();
        let passphrase = zeroize::Zeroizing::new(passphrase.to_string());
        run_blocking(move || {
            let sealed = Backup::new(notes).seal(&passphrase)?;
            crate::fs::ensure_parent_dir(&path)
                .and_then(|()| crate::fs::write_atomic(&path, &sealed, true))
                .map_err(|e| {
                    StoreError::WriteFailed(format!("Failed to write {}: {}", path.display(), e))
                })
        })
        .await?;

        info!(count, "exported backup");
        Ok(count)
    }

    /// Restore notes from a backup written by [`NoteStore::export_backup`].
    ///
    /// Each note is saved under the local day of its `note_date`, replacing
    /// any note already stored for that day; if several backup notes fall on
    /// the same local day, the later one wins. The import is all-or-nothing.
    /// Returns the number of days written.
    pub async fn import_backup(&self, path: &Path, passphrase: &str) -> Result<usize> {
        let path = path.to_path_buf();
        let passphrase = zeroize::Zeroizing::new(passphrase.to_string());
        let backup = run_blocking(move || {
            let sealed = std::fs::read(&path).map_err(|e| {
                StoreError::InvalidInput(format!("Failed to read {}: {}", path.display(), e))
            })?;
            Backup::open(&sealed, &passphrase)
        })
        .await?;

        for note in &backup.notes {
            validate_title(&note.title)?;
        }
        let days = backup
            .notes
            .iter()
            .map(|note| local_day(&self.inner.zone, local_date_of(&self.inner.zone, note.note_date)))
            .collect::<Result<Vec<LocalDay>>>()?;

        let count = self
            .with_database(move |db| {
                let drafts: Vec<(LocalDay, NoteDraft<'_>)> = days
                    .into_iter()
                    .zip(&backup.notes)
                    .map(|(day, note)| {
                        (
                            day,
                            NoteDraft {
                                title: &note.title,
                                body: &note.body,
                                created_at: note.created_at,
                                updated_at: note.updated_at,
                            },
                        )
                    })
                    .collect();
                db.upsert_days(&drafts)
            })
            .await?;

        info!(count, "imported backup");
        Ok(count)
    }

    /// Run `op` against the open database on the blocking pool, opening the
    /// store first if needed.
    async fn with_database<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut NoteDatabase) -> Result<T> + Send + 'static,
    {
        let database = self.database().await?;
        run_blocking(move || {
            let mut db = database.lock().unwrap_or_else(PoisonError::into_inner);
            op(&mut db)
        })
        .await
    }

    /// The open database, initializing it on first use.
    async fn database(&self) -> Result<SharedDatabase> {
        if let Some(outcome) = self.settled() {
            return outcome;
        }

        let _gate = self.inner.gate.lock().await;
        // Another caller may have finished while we waited.
        if let Some(outcome) = self.settled() {
            return outcome;
        }

        *self.state() = StoreState::Initializing;
        let mut pending = PendingInit {
            state: &self.inner.state,
            armed: true,
        };

        let started_at = Instant::now();
        info!(path = %self.inner.database_path.display(), "initializing note store");

        let vault = Arc::clone(&self.inner.vault);
        let path = self.inner.database_path.clone();
        let outcome = run_blocking(move || {
            let key = vault.get_or_create_key()?;
            NoteDatabase::open_or_create(&path, key)
        })
        .await
        .map_err(|err| {
            if err.is_fatal() {
                err
            } else {
                StoreError::StoreUnavailable(err.to_string())
            }
        });
        pending.armed = false;

        let duration_ms = started_at.elapsed().as_millis() as u64;
        match outcome {
            Ok(db) => {
                let database = Arc::new(Mutex::new(db));
                *self.state() = StoreState::Ready(Arc::clone(&database));
                info!(duration_ms, "note store initialized");
                Ok(database)
            }
            Err(err) => {
                *self.state() = StoreState::Failed(err.clone());
                error!(duration_ms, error = %err, "note store initialization failed");
                Err(err)
            }
        }
    }

    fn settled(&self) -> Option<Result<SharedDatabase>> {
        match &*self.state() {
            StoreState::Ready(database) => Some(Ok(Arc::clone(database))),
            StoreState::Failed(err) => Some(Err(err.clone())),
            StoreState::Uninitialized | StoreState::Initializing => None,
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<Z: TimeZone> std::fmt::Debug for NoteStore<Z> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteStore")
            .field("database_path", &self.inner.database_path)
            .field("vault", &self.inner.vault)
            .finish()
    }
}

/// Resets `Initializing` to `Uninitialized` if the initializing future is
/// dropped before it records an outcome.
struct PendingInit<'a> {
    state: &'a Mutex<StoreState>,
    armed: bool,
}

impl Drop for PendingInit<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, StoreState::Initializing) {
            *state = StoreState::Uninitialized;
        }
    }
}

async fn run_blocking<T, F>(op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Blocking task failed: {}", e)))?
}
