//! Store configuration and per-installation application-data paths.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Directory name used under the XDG data and config homes.
pub const APP_DIR: &str = "daybook";

/// Filename of the sealed note database.
pub const DATABASE_FILENAME: &str = "daybook.db";

/// Filename of the plain fallback key/value store.
pub const PREFERENCES_FILENAME: &str = "preferences.toml";

/// Identifier the encryption key is stored under in both key backends.
pub const DEFAULT_KEY_ID: &str = "daybook_db_key";

/// Keychain service name.
pub const DEFAULT_KEYRING_SERVICE: &str = "daybook";

/// Where the store lives and how its key is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Sealed database file
    pub database_path: PathBuf,

    /// Non-secure fallback key/value file
    pub preferences_path: PathBuf,

    /// Identifier of the key in both backends
    #[serde(default = "default_key_id")]
    pub key_id: String,

    /// Service name used for the OS keychain entry
    #[serde(default = "default_keyring_service")]
    pub keyring_service: String,

    /// Use the OS keychain as the primary key backend
    #[serde(default = "default_use_keyring")]
    pub use_keyring: bool,
}

impl StoreConfig {
    /// Configuration rooted at the platform's application-data directories.
    pub fn platform_default() -> Result<Self> {
        Ok(Self {
            database_path: default_database_path()?,
            preferences_path: default_preferences_path()?,
            key_id: default_key_id(),
            keyring_service: default_keyring_service(),
            use_keyring: default_use_keyring(),
        })
    }

    /// Configuration with both files placed inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            database_path: dir.join(DATABASE_FILENAME),
            preferences_path: dir.join(PREFERENCES_FILENAME),
            key_id: default_key_id(),
            keyring_service: default_keyring_service(),
            use_keyring: default_use_keyring(),
        }
    }
}

fn default_key_id() -> String {
    DEFAULT_KEY_ID.to_string()
}

fn default_keyring_service() -> String {
    DEFAULT_KEYRING_SERVICE.to_string()
}

fn default_use_keyring() -> bool {
    true
}

pub fn default_database_path() -> Result<PathBuf> {
    Ok(xdg_data_dir()?.join(DATABASE_FILENAME))
}

pub fn default_preferences_path() -> Result<PathBuf> {
    Ok(xdg_config_dir()?.join(PREFERENCES_FILENAME))
}

pub fn xdg_config_dir() -> Result<PathBuf> {
    if let Some(value) = non_empty_env("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(value).join(APP_DIR));
    }
    Ok(home_dir()?.join(".config").join(APP_DIR))
}

pub fn xdg_data_dir() -> Result<PathBuf> {
    if let Some(value) = non_empty_env("XDG_DATA_HOME") {
        return Ok(PathBuf::from(value).join(APP_DIR));
    }
    Ok(home_dir()?.join(".local").join("share").join(APP_DIR))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn home_dir() -> Result<PathBuf> {
    non_empty_env("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| StoreError::Config("HOME is not set; cannot resolve default paths".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_dir_places_both_files() {
        let config = StoreConfig::in_dir(Path::new("/tmp/daybook-test"));
        assert_eq!(
            config.database_path,
            PathBuf::from("/tmp/daybook-test/daybook.db")
        );
        assert_eq!(
            config.preferences_path,
            PathBuf::from("/tmp/daybook-test/preferences.toml")
        );
        assert_eq!(config.key_id, DEFAULT_KEY_ID);
        assert!(config.use_keyring);
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: StoreConfig = toml::from_str(
            "database_path = \"/data/daybook.db\"\npreferences_path = \"/cfg/prefs.toml\"\n",
        )
        .unwrap();
        assert_eq!(config.keyring_service, DEFAULT_KEYRING_SERVICE);
        assert_eq!(config.key_id, DEFAULT_KEY_ID);
        assert!(config.use_keyring);
    }
}
