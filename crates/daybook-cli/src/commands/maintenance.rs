use std::fmt::Display;

use chrono::{Local, TimeZone};
use daybook_core::NoteStore;

use crate::app::AppContext;
use crate::cli::PurgeArgs;
use crate::config::{resolve_config_path, write_config, DaybookConfig};
use crate::errors::CliError;
use crate::ui::format::format_datetime;
use crate::ui::{badge, hint, kv, Badge};

pub async fn handle_init<Z>(ctx: &AppContext<'_>, store: &NoteStore<Z>) -> anyhow::Result<()>
where
    Z: TimeZone + Send + Sync,
    Z::Offset: Display,
{
    let config_path = resolve_config_path(ctx.cli())?;
    let wrote_config = if config_path.exists() {
        false
    } else {
        write_config(&config_path, &DaybookConfig::default())?;
        true
    };

    let existed = store.database_path().exists();
    store.initialize().await.map_err(CliError::from)?;
    let metadata = store.metadata().await.map_err(CliError::from)?;

    if ctx.quiet() {
        return Ok(());
    }
    let ui = ctx.ui(false);
    let message = if existed {
        "Store already initialized"
    } else {
        "Initialized daybook store"
    };
    println!("{}", badge(&ui, Badge::Ok, message));
    println!(
        "{}",
        kv(&ui, "Store", &store.database_path().display().to_string())
    );
    println!("{}", kv(&ui, "Notes", &metadata.note_count.to_string()));
    if wrote_config {
        println!("{}", kv(&ui, "Config", &config_path.display().to_string()));
    }
    Ok(())
}

pub async fn handle_status<Z>(ctx: &AppContext<'_>, store: &NoteStore<Z>) -> anyhow::Result<()>
where
    Z: TimeZone + Send + Sync,
    Z::Offset: Display,
{
    let settings = ctx.settings()?;
    let ui = ctx.ui(false);
    let pretty = ui.mode.is_pretty();
    let zone = match settings.timezone {
        Some(tz) => tz.name().to_string(),
        None => format!("system ({})", Local::now().offset()),
    };

    println!(
        "{}",
        kv(&ui, "Store", &store.database_path().display().to_string())
    );
    println!("{}", kv(&ui, "Time zone", &zone));
    println!(
        "{}",
        kv(&ui, "Keychain", if settings.store.use_keyring { "enabled" } else { "disabled" })
    );

    if !store.database_path().exists() {
        println!("{}", kv(&ui, "Status", "not initialized"));
        println!("{}", hint(&ui, "Run `daybook init` to create the store"));
        return Ok(());
    }

    match store.metadata().await {
        Ok(metadata) => {
            println!("{}", kv(&ui, "Status", &store.status().to_string()));
            println!("{}", kv(&ui, "Notes", &metadata.note_count.to_string()));
            println!(
                "{}",
                kv(
                    &ui,
                    "Created",
                    &format_datetime(&metadata.created_at, store.zone(), pretty)
                )
            );
            println!("{}", kv(&ui, "Format", &metadata.format_version));
            Ok(())
        }
        Err(err) => {
            let message = format!("Store {}", store.status());
            println!("{}", badge(&ui, Badge::Err, &message));
            Err(CliError::from(err).into())
        }
    }
}

pub async fn handle_check<Z>(ctx: &AppContext<'_>, store: &NoteStore<Z>) -> anyhow::Result<()>
where
    Z: TimeZone + Send + Sync,
    Z::Offset: Display,
{
    match store.check_integrity().await {
        Ok(()) => {
            if !ctx.quiet() {
                println!("{}", badge(&ctx.ui(false), Badge::Ok, "Integrity check passed"));
            }
            Ok(())
        }
        Err(err) if err.is_fatal() => Err(CliError::from(err).into()),
        Err(err) => Err(CliError::Integrity(err.to_string()).into()),
    }
}

pub async fn handle_purge<Z>(
    ctx: &AppContext<'_>,
    store: &NoteStore<Z>,
    args: &PurgeArgs,
) -> anyhow::Result<()>
where
    Z: TimeZone + Send + Sync,
    Z::Offset: Display,
{
    let ui = ctx.ui(false);
    if !args.yes {
        if !ui.is_interactive() {
            return Err(CliError::invalid_input(
                "Refusing to delete every note without confirmation; pass --yes",
            )
            .into());
        }
        let proceed = dialoguer::Confirm::new()
            .with_prompt("Delete every note? This cannot be undone")
            .default(false)
            .interact()?;
        if !proceed {
            if !ctx.quiet() {
                println!("{}", badge(&ui, Badge::Warn, "Purge cancelled"));
            }
            return Ok(());
        }
    }

    let count = store.delete_all().await.map_err(CliError::from)?;
    if !ctx.quiet() {
        println!("{}", badge(&ui, Badge::Ok, &format!("Deleted {} notes", count)));
    }
    Ok(())
}
