use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use daybook_core::VERSION;

/// Daybook - an encrypted journal with one note per day
#[derive(Parser)]
#[command(name = "daybook")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file
    #[arg(long, global = true, value_name = "PATH", env = "DAYBOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the store file
    #[arg(long, global = true, value_name = "PATH", env = "DAYBOOK_DB")]
    pub db: Option<PathBuf>,

    /// IANA time zone used to interpret dates (defaults to the system zone)
    #[arg(long, global = true, value_name = "ZONE")]
    pub timezone: Option<String>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log store activity to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Arguments for the `show` command
#[derive(Args)]
pub struct ShowArgs {
    /// Day to show (YYYY-MM-DD, "today", "yesterday")
    #[arg(value_name = "DATE")]
    pub date: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `write` command
#[derive(Args)]
pub struct WriteArgs {
    /// Day to write (YYYY-MM-DD, "today", "yesterday")
    #[arg(value_name = "DATE")]
    pub date: Option<String>,

    /// Note title (at most 120 characters)
    #[arg(short, long, default_value = "")]
    pub title: String,

    /// Note body (read from stdin when omitted)
    #[arg(short, long)]
    pub body: Option<String>,
}

/// Arguments for the `month` command
#[derive(Args)]
pub struct MonthArgs {
    /// Month to list (YYYY-MM, defaults to the current month)
    #[arg(value_name = "MONTH")]
    pub month: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `list` command
#[derive(Args)]
pub struct ListArgs {
    /// Limit number of results
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `purge` command
#[derive(Args)]
pub struct PurgeArgs {
    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

/// Arguments for the `export` and `import` commands
#[derive(Args)]
pub struct BackupArgs {
    /// Backup file path
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the encryption key and the store
    Init,

    /// Show the note for a day
    Show(ShowArgs),

    /// Write (or overwrite) the note for a day
    Write(WriteArgs),

    /// List the notes of a month
    Month(MonthArgs),

    /// List notes, newest first
    List(ListArgs),

    /// Delete every note
    Purge(PurgeArgs),

    /// Export all notes to a passphrase-encrypted backup
    Export(BackupArgs),

    /// Import notes from a backup
    Import(BackupArgs),

    /// Check store integrity
    Check,

    /// Show store location and status
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_name = "SHELL")]
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_write_parses_flags() {
        let cli = Cli::parse_from([
            "daybook", "write", "2024-05-17", "--title", "T", "--body", "B", "--timezone", "UTC",
        ]);
        assert_eq!(cli.timezone.as_deref(), Some("UTC"));
        match cli.command {
            Some(Commands::Write(args)) => {
                assert_eq!(args.date.as_deref(), Some("2024-05-17"));
                assert_eq!(args.title, "T");
                assert_eq!(args.body.as_deref(), Some("B"));
            }
            _ => panic!("expected write"),
        }
    }
}
