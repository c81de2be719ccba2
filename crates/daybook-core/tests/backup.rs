use std::path::Path;

use chrono::NaiveDate;
use chrono_tz::America::New_York;
use chrono_tz::Asia::Tokyo;
use chrono_tz::Tz;

use daybook_core::keys::{KeyVault, MemoryKeyBackend};
use daybook_core::{NoteStore, StoreError};

const PASSPHRASE: &str = "correct horse battery";

fn store(dir: &Path, zone: Tz) -> NoteStore<Tz> {
    let vault = KeyVault::new(
        "daybook_db_key",
        Box::new(MemoryKeyBackend::new()),
        Box::new(MemoryKeyBackend::new()),
    );
    NoteStore::with_zone(dir.join("daybook.db"), vault, zone)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[tokio::test]
async fn test_export_then_import_on_new_installation() {
    let source_dir = tempfile::tempdir().expect("tempdir");
    let target_dir = tempfile::tempdir().expect("tempdir");
    let backup_path = source_dir.path().join("exports").join("daybook.age");

    let source = store(source_dir.path(), New_York);
    source
        .save_note_for_date(date(2024, 4, 1), "April", "fools")
        .await
        .expect("save");
    source
        .save_note_for_date(date(2024, 4, 2), "Second", "")
        .await
        .expect("save");

    let exported = source
        .export_backup(&backup_path, PASSPHRASE)
        .await
        .expect("export");
    assert_eq!(exported, 2);

    let target = store(target_dir.path(), New_York);
    target
        .save_note_for_date(date(2024, 4, 1), "Overwritten", "")
        .await
        .expect("save");

    let imported = target
        .import_backup(&backup_path, PASSPHRASE)
        .await
        .expect("import");
    assert_eq!(imported, 2);

    let april = target
        .get_notes_for_month(date(2024, 4, 1))
        .await
        .expect("month");
    let titles: Vec<&str> = april.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["April", "Second"]);
}

#[tokio::test]
async fn test_import_wrong_passphrase_changes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backup_path = dir.path().join("daybook.age");
    let notes = store(dir.path(), New_York);
    notes
        .save_note_for_date(date(2024, 4, 1), "Original", "")
        .await
        .expect("save");
    notes
        .export_backup(&backup_path, PASSPHRASE)
        .await
        .expect("export");
    notes
        .save_note_for_date(date(2024, 4, 1), "Edited", "")
        .await
        .expect("save");

    let err = notes
        .import_backup(&backup_path, "not the passphrase")
        .await
        .expect_err("wrong passphrase");
    assert_eq!(err, StoreError::IncorrectPassphrase);

    let note = notes
        .get_note_for_date(date(2024, 4, 1))
        .await
        .expect("read")
        .expect("note");
    assert_eq!(note.title, "Edited");
}

#[tokio::test]
async fn test_import_maps_notes_onto_local_days_of_new_zone() {
    let source_dir = tempfile::tempdir().expect("tempdir");
    let target_dir = tempfile::tempdir().expect("tempdir");
    let backup_path = source_dir.path().join("daybook.age");

    // New York midnight is 13:00 the same day in Tokyo.
    let source = store(source_dir.path(), New_York);
    source
        .save_note_for_date(date(2024, 4, 1), "Travelled", "")
        .await
        .expect("save");
    source
        .export_backup(&backup_path, PASSPHRASE)
        .await
        .expect("export");

    let target = store(target_dir.path(), Tokyo);
    target
        .import_backup(&backup_path, PASSPHRASE)
        .await
        .expect("import");

    let note = target
        .get_note_for_date(date(2024, 4, 1))
        .await
        .expect("read")
        .expect("note lands on the same calendar day");
    assert_eq!(note.title, "Travelled");
    assert_eq!(note.local_date(&Tokyo), date(2024, 4, 1));
}

#[tokio::test]
async fn test_export_rejects_weak_passphrase() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backup_path = dir.path().join("daybook.age");
    let notes = store(dir.path(), New_York);

    let err = notes
        .export_backup(&backup_path, "short")
        .await
        .expect_err("weak passphrase");
    assert!(matches!(err, StoreError::InvalidInput(_)));
    assert!(!backup_path.exists());
}
