//! Input parsing and prompting helpers.

use std::io::{self, IsTerminal, Read};

use chrono::{Datelike, Duration, NaiveDate};
use dialoguer::Password;
use zeroize::Zeroizing;

use crate::constants::env;
use crate::errors::CliError;

/// Parse a day argument: `YYYY-MM-DD`, `today` or `yesterday`.
pub fn parse_date(value: Option<&str>, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    let Some(raw) = value.map(str::trim) else {
        return Ok(today);
    };
    match raw.to_ascii_lowercase().as_str() {
        "" | "today" => Ok(today),
        "yesterday" => Ok(today - Duration::days(1)),
        _ => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
            anyhow::Error::from(CliError::invalid_input(format!(
                "Invalid date: {} (expected YYYY-MM-DD, today or yesterday)",
                raw
            )))
        }),
    }
}

/// Parse a month argument `YYYY-MM` into its first day.
pub fn parse_month(value: Option<&str>, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return today
            .with_day(1)
            .ok_or_else(|| anyhow::anyhow!("Invalid current date: {}", today));
    };
    NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d").map_err(|_| {
        anyhow::Error::from(CliError::invalid_input(format!(
            "Invalid month: {} (expected YYYY-MM)",
            raw
        )))
    })
}

/// Resolve the note body: the flag, else stdin when it is not a terminal.
///
/// Leading and trailing whitespace is trimmed.
pub fn read_body(body: Option<String>) -> anyhow::Result<String> {
    if let Some(value) = body {
        return Ok(value.trim().to_string());
    }

    if io::stdin().is_terminal() {
        return Err(CliError::invalid_input(
            "No body given; use --body or pipe the text via stdin",
        )
        .into());
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to read stdin: {}", e))?;
    Ok(buffer.trim().to_string())
}

/// Backup passphrase from the environment, else an interactive prompt.
///
/// `confirm` asks twice, for new backups.
pub fn backup_passphrase(confirm: bool) -> anyhow::Result<Zeroizing<String>> {
    if let Ok(value) = std::env::var(env::BACKUP_PASSPHRASE) {
        if !value.trim().is_empty() {
            return Ok(Zeroizing::new(value));
        }
    }

    if !io::stdin().is_terminal() {
        return Err(CliError::invalid_input(format!(
            "No backup passphrase; set {} or run interactively",
            env::BACKUP_PASSPHRASE
        ))
        .into());
    }

    let mut prompt = Password::new().with_prompt("Backup passphrase");
    if confirm {
        prompt = prompt.with_confirmation("Confirm passphrase", "Passphrases do not match");
    }
    prompt
        .interact()
        .map(Zeroizing::new)
        .map_err(|e| anyhow::anyhow!("Failed to read passphrase: {}", e))
}
