//! Daybook CLI - an encrypted journal with one note per day.
//!
//! This is the command-line interface for Daybook. It opens the note store
//! described by the config file and flags, and runs one command against it.

mod app;
mod cli;
mod commands;
mod config;
mod constants;
mod errors;
mod helpers;
mod logging;
mod output;
mod ui;

use clap::Parser;

use crate::app::AppContext;
use crate::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let ctx = AppContext::new(&cli);
    if let Err(err) = commands::run(&ctx).await {
        eprintln!("Error: {:#}", err);
        std::process::exit(errors::exit_code_for(&err));
    }
}
