//! Structured logging for the CLI.
//!
//! Logs go to stderr so stdout stays clean for note output and JSON.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over the flags.
pub fn init(verbose: bool, quiet: bool) {
    let default_directives = if verbose {
        "warn,daybook_core=info,daybook=info"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}
