use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use daybook_core::config::{xdg_config_dir, StoreConfig};

use crate::cli::Cli;

/// Optional `config.toml` under the daybook config directory.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DaybookConfig {
    pub store: StoreSection,
    pub keys: KeysSection,
    pub ui: UiSection,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreSection {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeysSection {
    /// Keep the key in the OS keychain (the preferences file is always kept as backup)
    pub keyring: bool,
    pub service: Option<String>,
    pub preferences_path: Option<PathBuf>,
}

impl Default for KeysSection {
    fn default() -> Self {
        Self {
            keyring: true,
            service: None,
            preferences_path: None,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UiSection {
    pub timezone: Option<String>,
}

/// Everything a command needs to open the store.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store: StoreConfig,
    pub timezone: Option<chrono_tz::Tz>,
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn resolve_config_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => default_config_path(),
    }
}

/// Read the config file. A missing file yields the defaults.
pub fn read_config(path: &Path) -> anyhow::Result<DaybookConfig> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(DaybookConfig::default())
        }
        Err(err) => {
            return Err(anyhow::anyhow!(
                "Failed to read config {}: {}",
                path.display(),
                err
            ))
        }
    };
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

pub fn write_config(path: &Path, config: &DaybookConfig) -> anyhow::Result<()> {
    let contents =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {}", e))?;
    daybook_core::fs::ensure_parent_dir(path)
        .and_then(|()| daybook_core::fs::write_atomic(path, contents.as_bytes(), false))
        .map_err(|e| anyhow::anyhow!("Failed to write config {}: {}", path.display(), e))
}

/// Merge platform defaults, the config file and CLI flags (highest priority).
pub fn resolve_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let config_path = resolve_config_path(cli)?;
    let config = read_config(&config_path)?;
    debug!(path = %config_path.display(), "loaded config");
    let mut store = StoreConfig::platform_default()?;

    if let Some(path) = cli.db.clone().or(config.store.path) {
        store.database_path = path;
    }
    if let Some(path) = config.keys.preferences_path {
        store.preferences_path = path;
    }
    if let Some(service) = config.keys.service {
        store.keyring_service = service;
    }
    store.use_keyring = config.keys.keyring;

    let timezone = cli
        .timezone
        .as_deref()
        .or(config.ui.timezone.as_deref())
        .map(parse_timezone)
        .transpose()?
        .flatten();

    Ok(Settings { store, timezone })
}

/// Parse an IANA zone name. `auto` (or blank) means the system zone.
pub fn parse_timezone(value: &str) -> anyhow::Result<Option<chrono_tz::Tz>> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
        return Ok(None);
    }

    let tz = trimmed
        .parse::<chrono_tz::Tz>()
        .map_err(|_| anyhow::anyhow!("Invalid timezone: {}", trimmed))?;
    Ok(Some(tz))
}
