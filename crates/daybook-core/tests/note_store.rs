use std::fs;
use std::path::Path;

use chrono::{NaiveDate, TimeZone};
use chrono_tz::America::New_York;
use chrono_tz::Pacific::Auckland;
use chrono_tz::Tz;

use daybook_core::keys::{KeyVault, MemoryKeyBackend};
use daybook_core::{KeyBackend, NoteStore, StoreError, StoreStatus};

const KEY_ID: &str = "daybook_db_key";

struct Backends {
    secure: MemoryKeyBackend,
    fallback: MemoryKeyBackend,
}

impl Backends {
    fn new() -> Self {
        Self {
            secure: MemoryKeyBackend::new(),
            fallback: MemoryKeyBackend::new(),
        }
    }

    fn vault(&self) -> KeyVault {
        KeyVault::new(
            KEY_ID,
            Box::new(self.secure.clone()),
            Box::new(self.fallback.clone()),
        )
    }

    fn store(&self, dir: &Path, zone: Tz) -> NoteStore<Tz> {
        NoteStore::with_zone(dir.join("daybook.db"), self.vault(), zone)
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[tokio::test]
async fn test_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Backends::new().store(dir.path(), New_York);

    store
        .save_note_for_date(date(2024, 5, 17), "T", "B")
        .await
        .expect("save should succeed");

    let note = store
        .get_note_for_date(date(2024, 5, 17))
        .await
        .expect("read should succeed")
        .expect("note should exist");
    assert_eq!(note.title, "T");
    assert_eq!(note.body, "B");
    assert_eq!(note.local_date(&New_York), date(2024, 5, 17));
}

#[tokio::test]
async fn test_empty_day_is_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Backends::new().store(dir.path(), New_York);

    store
        .save_note_for_date(date(2024, 5, 17), "Neighbour", "")
        .await
        .expect("save should succeed");

    let missing = store
        .get_note_for_date(date(2024, 5, 18))
        .await
        .expect("empty day is not an error");
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_repeated_saves_keep_one_note_per_day() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Backends::new().store(dir.path(), New_York);
    let day = date(2024, 3, 10);

    let first = store
        .save_note_for_date(day, "First", "one")
        .await
        .expect("first save");
    for i in 0..5 {
        store
            .save_note_for_date(day, &format!("Draft {}", i), "draft")
            .await
            .expect("draft save");
    }
    let last = store
        .save_note_for_date(day, "Final", "done")
        .await
        .expect("final save");

    assert_eq!(last.id, first.id);
    assert_eq!(last.created_at, first.created_at);
    assert!(last.updated_at >= first.updated_at);

    let month = store
        .get_notes_for_month(day)
        .await
        .expect("month read");
    assert_eq!(month.len(), 1);
    assert_eq!(month[0].title, "Final");
    assert_eq!(month[0].body, "done");
}

#[tokio::test]
async fn test_month_boundaries_in_date_line_zone() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Backends::new().store(dir.path(), Auckland);

    for (day, title) in [
        (date(2024, 12, 31), "Last of December"),
        (date(2024, 12, 1), "First of December"),
        (date(2025, 1, 1), "New Year"),
        (date(2024, 11, 30), "Last of November"),
    ] {
        store
            .save_note_for_date(day, title, "")
            .await
            .expect("save should succeed");
    }

    let december = store
        .get_notes_for_month(date(2024, 12, 15))
        .await
        .expect("month read");
    let titles: Vec<&str> = december.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["First of December", "Last of December"]);

    let january = store
        .get_notes_for_month(date(2025, 1, 1))
        .await
        .expect("month read");
    assert_eq!(january.len(), 1);
    assert_eq!(january[0].title, "New Year");
}

#[tokio::test]
async fn test_month_boundaries_across_dst() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Backends::new().store(dir.path(), New_York);

    store
        .save_note_for_date(date(2024, 10, 31), "Halloween", "")
        .await
        .expect("save");
    store
        .save_note_for_date(date(2024, 11, 3), "Fall back", "")
        .await
        .expect("save");
    store
        .save_note_for_date(date(2024, 11, 30), "End of November", "")
        .await
        .expect("save");
    store
        .save_note_for_date(date(2024, 12, 1), "December", "")
        .await
        .expect("save");

    let november = store
        .get_notes_for_month(date(2024, 11, 1))
        .await
        .expect("month read");
    let titles: Vec<&str> = november.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["Fall back", "End of November"]);

    let fall_back = &november[0];
    assert_eq!(
        fall_back.note_date,
        New_York
            .with_ymd_and_hms(2024, 11, 3, 0, 0, 0)
            .earliest()
            .expect("midnight exists")
            .with_timezone(&chrono::Utc)
    );
}

#[tokio::test]
async fn test_list_notes_newest_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Backends::new().store(dir.path(), New_York);

    for day in [date(2024, 2, 1), date(2024, 4, 1), date(2024, 3, 1)] {
        store
            .save_note_for_date(day, "", "")
            .await
            .expect("save");
    }

    let dates: Vec<NaiveDate> = store
        .list_notes()
        .await
        .expect("list")
        .iter()
        .map(|n| n.local_date(&New_York))
        .collect();
    assert_eq!(dates, vec![date(2024, 4, 1), date(2024, 3, 1), date(2024, 2, 1)]);
}

#[tokio::test]
async fn test_delete_all_returns_count_and_empties_months() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Backends::new().store(dir.path(), New_York);

    for d in 1..=4 {
        store
            .save_note_for_date(date(2024, 6, d), "", "")
            .await
            .expect("save");
    }
    store
        .save_note_for_date(date(2024, 7, 1), "", "")
        .await
        .expect("save");

    assert_eq!(store.delete_all().await.expect("delete"), 5);
    assert!(store
        .get_notes_for_month(date(2024, 6, 1))
        .await
        .expect("month read")
        .is_empty());
    assert!(store
        .get_notes_for_month(date(2024, 7, 1))
        .await
        .expect("month read")
        .is_empty());
    assert_eq!(store.delete_all().await.expect("delete"), 0);
}

#[tokio::test]
async fn test_notes_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backends = Backends::new();

    {
        let store = backends.store(dir.path(), New_York);
        store
            .save_note_for_date(date(2024, 1, 2), "Persisted", "across restarts")
            .await
            .expect("save");
    }

    let reopened = backends.store(dir.path(), New_York);
    let note = reopened
        .get_note_for_date(date(2024, 1, 2))
        .await
        .expect("read")
        .expect("note should exist");
    assert_eq!(note.body, "across restarts");

    let on_disk = fs::read(dir.path().join("daybook.db")).expect("read store file");
    assert!(!String::from_utf8_lossy(&on_disk).contains("across restarts"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_initialize_runs_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backends = Backends::new();
    let store = backends.store(dir.path(), New_York);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.initialize().await })
        })
        .collect();
    for handle in handles {
        handle
            .await
            .expect("task should not panic")
            .expect("initialize should succeed");
    }

    assert_eq!(store.status(), StoreStatus::Ready);
    assert_eq!(backends.secure.read_count(), 1);
    assert_eq!(backends.secure.write_count(), 1);
    assert_eq!(backends.fallback.write_count(), 1);

    let metadata = store.metadata().await.expect("metadata");
    assert_eq!(metadata.note_count, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_initialize_fails_identically() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backends = Backends::new();
    backends.secure.fail_writes(true);
    backends.fallback.fail_writes(true);
    let store = backends.store(dir.path(), New_York);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.initialize().await })
        })
        .collect();

    let mut errors = Vec::new();
    for handle in handles {
        errors.push(
            handle
                .await
                .expect("task should not panic")
                .expect_err("initialize should fail"),
        );
    }

    assert!(matches!(errors[0], StoreError::KeyUnavailable(_)));
    assert!(errors.iter().all(|e| e == &errors[0]));
    assert_eq!(backends.secure.read_count(), 1);
    assert_eq!(store.status(), StoreStatus::Failed);
    assert!(!dir.path().join("daybook.db").exists());
}

#[tokio::test]
async fn test_failed_initialization_is_terminal_until_reinitialize() {
    let dir = tempfile::tempdir().expect("tempdir");
    let original = Backends::new();
    original
        .store(dir.path(), New_York)
        .save_note_for_date(date(2024, 8, 1), "Locked", "")
        .await
        .expect("save");

    // A different installation key cannot open the existing file.
    let other = Backends::new();
    let store = other.store(dir.path(), New_York);
    let err = store.initialize().await.expect_err("wrong key must fail");
    assert!(matches!(err, StoreError::StoreUnavailable(_)));
    assert_eq!(store.status(), StoreStatus::Failed);

    // No automatic retry: queries see the same failure.
    let query = store.get_note_for_date(date(2024, 8, 1)).await;
    assert_eq!(query.expect_err("still failed"), err);

    // Put the right key into the backends the failed store reads, then retry.
    let right_key = original.vault().get_or_create_key().expect("original key");
    other.secure.clear();
    other.fallback.clear();
    other
        .secure
        .set(KEY_ID, right_key.expose_hex())
        .expect("memory write");

    store.reinitialize().await.expect("retry should succeed");
    assert_eq!(store.status(), StoreStatus::Ready);
    let note = store
        .get_note_for_date(date(2024, 8, 1))
        .await
        .expect("read")
        .expect("note should exist");
    assert_eq!(note.title, "Locked");
}

#[tokio::test]
async fn test_failed_save_leaves_prior_note() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store_dir = dir.path().join("store");
    fs::create_dir(&store_dir).expect("mkdir");
    let store = Backends::new().store(&store_dir, New_York);

    store
        .save_note_for_date(date(2024, 9, 9), "Before", "kept")
        .await
        .expect("save");

    fs::remove_dir_all(&store_dir).expect("remove store dir");
    let err = store
        .save_note_for_date(date(2024, 9, 9), "After", "lost")
        .await
        .expect_err("write must fail without a directory");
    assert!(matches!(err, StoreError::WriteFailed(_)));
    assert!(!err.is_fatal());

    let note = store
        .get_note_for_date(date(2024, 9, 9))
        .await
        .expect("store still open")
        .expect("prior note remains");
    assert_eq!(note.title, "Before");
    assert_eq!(note.body, "kept");
}

#[tokio::test]
async fn test_integrity_check_on_fresh_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Backends::new().store(dir.path(), New_York);

    store
        .save_note_for_date(date(2024, 6, 1), "Fine", "")
        .await
        .expect("save");
    store.check_integrity().await.expect("integrity");

    let metadata = store.metadata().await.expect("metadata");
    assert_eq!(metadata.note_count, 1);
    assert_eq!(metadata.format_version, "1");
}
