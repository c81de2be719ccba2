//! JSON output formatting for notes.

use chrono::TimeZone;
use daybook_core::Note;

/// Convert a note to JSON for output. `date` is the local day in `zone`.
pub fn note_json<Z: TimeZone>(note: &Note, zone: &Z) -> serde_json::Value {
    serde_json::json!({
        "id": note.id,
        "date": note.local_date(zone).format("%Y-%m-%d").to_string(),
        "title": note.title,
        "body": note.body,
        "note_date": note.note_date,
        "created_at": note.created_at,
        "updated_at": note.updated_at,
    })
}

/// Convert multiple notes to a JSON array for output.
pub fn notes_json<Z: TimeZone>(notes: &[Note], zone: &Z) -> Vec<serde_json::Value> {
    notes.iter().map(|note| note_json(note, zone)).collect()
}
