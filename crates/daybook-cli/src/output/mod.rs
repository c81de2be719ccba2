//! Output formatting for notes.

mod json;
mod text;

pub use json::{note_json, notes_json};
pub use text::{note_rows, print_note, NOTE_COLUMNS};
