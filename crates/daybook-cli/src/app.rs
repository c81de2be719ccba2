//! Per-invocation context shared by command handlers.

use once_cell::unsync::OnceCell;

use crate::cli::Cli;
use crate::config::{resolve_settings, Settings};
use crate::ui::UiContext;

pub struct AppContext<'a> {
    cli: &'a Cli,
    settings: OnceCell<Settings>,
}

impl<'a> AppContext<'a> {
    pub fn new(cli: &'a Cli) -> Self {
        Self {
            cli,
            settings: OnceCell::new(),
        }
    }

    pub fn cli(&self) -> &Cli {
        self.cli
    }

    pub fn quiet(&self) -> bool {
        self.cli.quiet
    }

    /// Settings from flags, config file and platform defaults, loaded once.
    pub fn settings(&self) -> anyhow::Result<&Settings> {
        self.settings.get_or_try_init(|| resolve_settings(self.cli))
    }

    pub fn ui(&self, json_flag: bool) -> UiContext {
        UiContext::from_env(json_flag)
    }
}
