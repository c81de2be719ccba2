use std::fmt::Display;
use std::time::Duration;

use chrono::TimeZone;
use daybook_core::NoteStore;
use indicatif::ProgressBar;

use crate::app::AppContext;
use crate::cli::BackupArgs;
use crate::errors::CliError;
use crate::helpers::backup_passphrase;
use crate::ui::{badge, Badge, UiContext};

pub async fn handle_export<Z>(
    ctx: &AppContext<'_>,
    store: &NoteStore<Z>,
    args: &BackupArgs,
) -> anyhow::Result<()>
where
    Z: TimeZone + Send + Sync,
    Z::Offset: Display,
{
    let passphrase = backup_passphrase(true)?;
    let ui = ctx.ui(false);

    let progress = spinner(&ui, ctx.quiet(), "Encrypting backup...");
    let result = store.export_backup(&args.path, &passphrase).await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let count = result.map_err(CliError::from)?;

    if !ctx.quiet() {
        println!(
            "{}",
            badge(
                &ui,
                Badge::Ok,
                &format!("Exported {} notes to {}", count, args.path.display())
            )
        );
    }
    Ok(())
}

pub async fn handle_import<Z>(
    ctx: &AppContext<'_>,
    store: &NoteStore<Z>,
    args: &BackupArgs,
) -> anyhow::Result<()>
where
    Z: TimeZone + Send + Sync,
    Z::Offset: Display,
{
    if !args.path.exists() {
        return Err(CliError::not_found(
            format!("Backup file not found: {}", args.path.display()),
            "Pass the path written by `daybook export`",
        )
        .into());
    }

    let passphrase = backup_passphrase(false)?;
    let ui = ctx.ui(false);

    let progress = spinner(&ui, ctx.quiet(), "Restoring backup...");
    let result = store.import_backup(&args.path, &passphrase).await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let count = result.map_err(CliError::from)?;

    if !ctx.quiet() {
        println!(
            "{}",
            badge(
                &ui,
                Badge::Ok,
                &format!("Imported {} notes from {}", count, args.path.display())
            )
        );
    }
    Ok(())
}

fn spinner(ui: &UiContext, quiet: bool, message: &str) -> Option<ProgressBar> {
    if quiet || !ui.mode.is_pretty() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}
