use std::fmt::Display;

use chrono::TimeZone;
use daybook_core::NoteStore;

use crate::app::AppContext;
use crate::cli::{ListArgs, MonthArgs, ShowArgs, WriteArgs};
use crate::commands::today;
use crate::constants::DEFAULT_LIST_LIMIT;
use crate::errors::CliError;
use crate::helpers::{parse_date, parse_month, read_body};
use crate::output::{note_json, note_rows, notes_json, print_note, NOTE_COLUMNS};
use crate::ui::{badge, header, table, Badge};

pub async fn handle_show<Z>(
    ctx: &AppContext<'_>,
    store: &NoteStore<Z>,
    args: &ShowArgs,
) -> anyhow::Result<()>
where
    Z: TimeZone + Send + Sync,
    Z::Offset: Display,
{
    let date = parse_date(args.date.as_deref(), today(store.zone()))?;
    let note = store
        .get_note_for_date(date)
        .await
        .map_err(CliError::from)?
        .ok_or_else(|| {
            CliError::not_found(
                format!("No note for {}", date),
                format!("Run `daybook write {}` to create one", date),
            )
        })?;

    let ui = ctx.ui(args.json);
    if ui.mode.is_json() {
        let output = serde_json::to_string_pretty(&note_json(&note, store.zone()))?;
        println!("{}", output);
    } else {
        print_note(&ui, &note, store.zone(), ctx.quiet());
    }
    Ok(())
}

pub async fn handle_write<Z>(
    ctx: &AppContext<'_>,
    store: &NoteStore<Z>,
    args: &WriteArgs,
) -> anyhow::Result<()>
where
    Z: TimeZone + Send + Sync,
    Z::Offset: Display,
{
    let date = parse_date(args.date.as_deref(), today(store.zone()))?;
    let body = read_body(args.body.clone())?;
    let title = args.title.trim();

    let note = store
        .save_note_for_date(date, title, &body)
        .await
        .map_err(CliError::from)?;

    if !ctx.quiet() {
        let ui = ctx.ui(false);
        let verb = if note.updated_at == note.created_at {
            "Saved"
        } else {
            "Updated"
        };
        println!("{}", badge(&ui, Badge::Ok, &format!("{} note for {}", verb, date)));
    }
    Ok(())
}

pub async fn handle_month<Z>(
    ctx: &AppContext<'_>,
    store: &NoteStore<Z>,
    args: &MonthArgs,
) -> anyhow::Result<()>
where
    Z: TimeZone + Send + Sync,
    Z::Offset: Display,
{
    let month = parse_month(args.month.as_deref(), today(store.zone()))?;
    let notes = store
        .get_notes_for_month(month)
        .await
        .map_err(CliError::from)?;

    let ui = ctx.ui(args.json);
    if ui.mode.is_json() {
        let output = serde_json::to_string_pretty(&notes_json(&notes, store.zone()))?;
        println!("{}", output);
        return Ok(());
    }

    let label = month.format("%Y-%m").to_string();
    if notes.is_empty() {
        if !ctx.quiet() {
            println!("{}", badge(&ui, Badge::Info, &format!("No notes in {}", label)));
        }
        return Ok(());
    }
    if ui.mode.is_pretty() && !ctx.quiet() {
        println!("{}", header(&ui, "month", Some(&label)));
    }
    println!("{}", table(&ui, &NOTE_COLUMNS, &note_rows(&notes, store.zone())));
    Ok(())
}

pub async fn handle_list<Z>(
    ctx: &AppContext<'_>,
    store: &NoteStore<Z>,
    args: &ListArgs,
) -> anyhow::Result<()>
where
    Z: TimeZone + Send + Sync,
    Z::Offset: Display,
{
    let mut notes = store.list_notes().await.map_err(CliError::from)?;
    notes.truncate(args.limit.unwrap_or(DEFAULT_LIST_LIMIT));

    let ui = ctx.ui(args.json);
    if ui.mode.is_json() {
        let output = serde_json::to_string_pretty(&notes_json(&notes, store.zone()))?;
        println!("{}", output);
        return Ok(());
    }

    if notes.is_empty() {
        if !ctx.quiet() {
            println!("{}", badge(&ui, Badge::Info, "No notes yet"));
        }
        return Ok(());
    }
    println!("{}", table(&ui, &NOTE_COLUMNS, &note_rows(&notes, store.zone())));
    Ok(())
}
