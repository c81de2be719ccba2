//! Text and table output formatting for notes.

use std::fmt::Display;

use chrono::TimeZone;
use daybook_core::Note;

use crate::constants::PREVIEW_WIDTH;
use crate::ui::format::{format_datetime, preview, truncate};
use crate::ui::{kv, Column, UiContext};

pub const NOTE_COLUMNS: [Column; 3] = [
    Column::new("DATE"),
    Column::new("TITLE"),
    Column::new("PREVIEW"),
];

/// Table rows for `notes`: local date, title and the first body line.
pub fn note_rows<Z: TimeZone>(notes: &[Note], zone: &Z) -> Vec<Vec<String>> {
    notes
        .iter()
        .map(|note| {
            vec![
                note.local_date(zone).format("%Y-%m-%d").to_string(),
                truncate(&note.title, PREVIEW_WIDTH),
                preview(&note.body, PREVIEW_WIDTH),
            ]
        })
        .collect()
}

/// Print a single note. Quiet mode prints only the body.
pub fn print_note<Z>(ui: &UiContext, note: &Note, zone: &Z, quiet: bool)
where
    Z: TimeZone,
    Z::Offset: Display,
{
    if quiet {
        println!("{}", note.body);
        return;
    }

    let pretty = ui.mode.is_pretty();
    println!(
        "{}",
        kv(ui, "Date", &note.local_date(zone).format("%Y-%m-%d").to_string())
    );
    if !note.title.is_empty() {
        println!("{}", kv(ui, "Title", &note.title));
    }
    println!(
        "{}",
        kv(ui, "Created", &format_datetime(&note.created_at, zone, pretty))
    );
    if note.updated_at != note.created_at {
        println!(
            "{}",
            kv(ui, "Updated", &format_datetime(&note.updated_at, zone, pretty))
        );
    }
    if !note.body.is_empty() {
        println!();
        println!("{}", note.body);
    }
}
