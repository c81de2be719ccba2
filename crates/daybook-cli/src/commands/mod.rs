//! Command handlers.
//!
//! Every command except `completions` runs against one `NoteStore`, built
//! from the resolved settings. The store is generic over the zone so that
//! `--timezone` and the system zone share the same handlers.

mod backup;
mod maintenance;
mod misc;
mod notes;

use std::fmt::Display;

use chrono::{NaiveDate, TimeZone, Utc};
use daybook_core::{KeyVault, NoteStore, VERSION};
use tracing::debug;

use crate::app::AppContext;
use crate::cli::Commands;

pub async fn run(ctx: &AppContext<'_>) -> anyhow::Result<()> {
    let Some(command) = &ctx.cli().command else {
        println!("daybook {}", VERSION);
        println!("Run `daybook --help` for usage.");
        return Ok(());
    };
    if let Commands::Completions { shell } = command {
        return misc::handle_completions(*shell);
    }

    let settings = ctx.settings()?;
    let path = settings.store.database_path.clone();
    let vault = KeyVault::from_config(&settings.store);
    debug!(
        path = %path.display(),
        timezone = ?settings.timezone,
        keyring = settings.store.use_keyring,
        "resolved settings"
    );
    match settings.timezone {
        Some(tz) => dispatch(ctx, command, NoteStore::with_zone(path, vault, tz)).await,
        None => dispatch(ctx, command, NoteStore::new(path, vault)).await,
    }
}

async fn dispatch<Z>(
    ctx: &AppContext<'_>,
    command: &Commands,
    store: NoteStore<Z>,
) -> anyhow::Result<()>
where
    Z: TimeZone + Send + Sync,
    Z::Offset: Display,
{
    let result = match command {
        Commands::Init => maintenance::handle_init(ctx, &store).await,
        Commands::Show(args) => notes::handle_show(ctx, &store, args).await,
        Commands::Write(args) => notes::handle_write(ctx, &store, args).await,
        Commands::Month(args) => notes::handle_month(ctx, &store, args).await,
        Commands::List(args) => notes::handle_list(ctx, &store, args).await,
        Commands::Purge(args) => maintenance::handle_purge(ctx, &store, args).await,
        Commands::Export(args) => backup::handle_export(ctx, &store, args).await,
        Commands::Import(args) => backup::handle_import(ctx, &store, args).await,
        Commands::Check => maintenance::handle_check(ctx, &store).await,
        Commands::Status => maintenance::handle_status(ctx, &store).await,
        Commands::Completions { shell } => misc::handle_completions(*shell),
    };
    store.close().await;
    result
}

/// The current local date in `zone`.
fn today<Z: TimeZone>(zone: &Z) -> NaiveDate {
    Utc::now().with_timezone(zone).date_naive()
}
