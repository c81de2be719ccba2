//! Encryption key lifecycle.
//!
//! The database key is 32 random bytes kept as 64 uppercase hex characters.
//! It is created once per installation and never rotated. `KeyVault` keeps it
//! in a secure backend with a plain fallback copy so that a keychain reset
//! does not lock the user out of their notes.
//!
//! The key is never logged; `EncryptionKey`'s `Debug` output is redacted.

pub mod backend;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

pub use backend::{DisabledBackend, KeyBackend, KeyringBackend, MemoryKeyBackend, PreferenceFile};

/// Raw key length in bytes (256 bits).
pub const KEY_LENGTH: usize = 32;

/// Hex-encoded key length in characters.
pub const KEY_HEX_LENGTH: usize = KEY_LENGTH * 2;

/// The symmetric key that seals the note database.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    hex: Zeroizing<String>,
}

impl EncryptionKey {
    /// Generate a fresh key from the operating system's CSPRNG.
    pub fn generate() -> Result<Self> {
        let mut bytes = Zeroizing::new([0u8; KEY_LENGTH]);
        getrandom::getrandom(&mut bytes[..]).map_err(|e| {
            StoreError::KeyUnavailable(format!("Failed to generate key bytes: {}", e))
        })?;
        Ok(Self {
            hex: Zeroizing::new(hex::encode_upper(&bytes[..])),
        })
    }

    /// Parse a stored key. Surrounding whitespace is ignored, case is normalized.
    pub fn from_hex(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.len() != KEY_HEX_LENGTH || !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StoreError::KeyUnavailable(format!(
                "Stored key is malformed (expected {} hex characters)",
                KEY_HEX_LENGTH
            )));
        }
        Ok(Self {
            hex: Zeroizing::new(trimmed.to_ascii_uppercase()),
        })
    }

    /// The hex form, for handing to a key backend. Do not log or display it.
    pub fn expose_hex(&self) -> &str {
        &self.hex
    }

    /// The raw key bytes for the cipher.
    pub fn to_bytes(&self) -> Result<Zeroizing<[u8; KEY_LENGTH]>> {
        let mut bytes = Zeroizing::new([0u8; KEY_LENGTH]);
        hex::decode_to_slice(self.hex.as_bytes(), &mut bytes[..])
            .map_err(|e| StoreError::KeyUnavailable(format!("Invalid key encoding: {}", e)))?;
        Ok(bytes)
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Obtains or creates the database key across a secure and a fallback backend.
pub struct KeyVault {
    key_id: String,
    secure: Box<dyn KeyBackend>,
    fallback: Box<dyn KeyBackend>,
}

impl KeyVault {
    pub fn new(
        key_id: impl Into<String>,
        secure: Box<dyn KeyBackend>,
        fallback: Box<dyn KeyBackend>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            secure,
            fallback,
        }
    }

    /// OS keychain (or disabled secure storage) chained with the preferences file.
    pub fn from_config(config: &StoreConfig) -> Self {
        let secure: Box<dyn KeyBackend> = if config.use_keyring {
            Box::new(KeyringBackend::new(config.keyring_service.clone()))
        } else {
            Box::new(DisabledBackend)
        };
        Self::new(
            config.key_id.clone(),
            secure,
            Box::new(PreferenceFile::new(config.preferences_path.clone())),
        )
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Return the installation key, creating and persisting it on first use.
    ///
    /// Lookup order is the secure backend, then the fallback. A key found in
    /// only one backend is copied into the other. A new key is generated only
    /// when both backends answer that they hold no key; a failed read or a
    /// malformed stored value never leads to a new key. Losing one backend on
    /// write is tolerated, losing both is `KeyUnavailable`.
    pub fn get_or_create_key(&self) -> Result<EncryptionKey> {
        let secure = self.read(self.secure.as_ref());
        let mut malformed = None;
        if let Ok(Some(stored)) = &secure {
            match EncryptionKey::from_hex(stored) {
                Ok(key) => {
                    self.ensure_backup(&key);
                    return Ok(key);
                }
                Err(err) => {
                    warn!(
                        backend = self.secure.name(),
                        "stored key is malformed; trying fallback store"
                    );
                    malformed = Some(err);
                }
            }
        }

        let fallback = self.read(self.fallback.as_ref());
        if let Ok(Some(stored)) = &fallback {
            let key = EncryptionKey::from_hex(stored)?;
            info!(
                backend = self.fallback.name(),
                "recovered encryption key from fallback store"
            );
            // A secure store that could not be read is left alone.
            if secure.is_ok() {
                if let Err(err) = self.secure.set(&self.key_id, key.expose_hex()) {
                    debug!(backend = self.secure.name(), error = %err, "could not restore key to secure store");
                }
            }
            return Ok(key);
        }

        if let Some(err) = malformed {
            return Err(err);
        }
        if let Err(err) = secure {
            return Err(err);
        }
        if let Err(err) = fallback {
            return Err(err);
        }

        self.generate_and_store()
    }

    fn generate_and_store(&self) -> Result<EncryptionKey> {
        let key = EncryptionKey::generate()?;
        let secure_result = self.secure.set(&self.key_id, key.expose_hex());
        let fallback_result = self.fallback.set(&self.key_id, key.expose_hex());

        match (secure_result, fallback_result) {
            (Err(secure_err), Err(fallback_err)) => Err(StoreError::KeyUnavailable(format!(
                "{} store: {}; {} store: {}",
                self.secure.name(),
                secure_err,
                self.fallback.name(),
                fallback_err
            ))),
            (Err(secure_err), Ok(())) => {
                warn!(
                    backend = self.secure.name(),
                    error = %secure_err,
                    "secure key store unavailable; key kept in fallback store only"
                );
                Ok(key)
            }
            (Ok(()), Err(fallback_err)) => {
                warn!(
                    backend = self.fallback.name(),
                    error = %fallback_err,
                    "could not write key backup"
                );
                Ok(key)
            }
            (Ok(()), Ok(())) => {
                info!(
                    secure = self.secure.name(),
                    fallback = self.fallback.name(),
                    "generated new encryption key"
                );
                Ok(key)
            }
        }
    }

    /// Read a non-blank value. Blank counts as absent; a backend error is
    /// reported as `KeyUnavailable`.
    fn read(&self, backend: &dyn KeyBackend) -> Result<Option<String>> {
        match backend.get(&self.key_id) {
            Ok(value) => Ok(value.filter(|v| !v.trim().is_empty())),
            Err(err) => {
                warn!(backend = backend.name(), error = %err, "key store read failed");
                Err(StoreError::KeyUnavailable(format!(
                    "{} store could not be read: {}",
                    backend.name(),
                    err
                )))
            }
        }
    }

    /// Copy `key` into the fallback when it answers that it holds none.
    fn ensure_backup(&self, key: &EncryptionKey) {
        match self.read(self.fallback.as_ref()) {
            Ok(None) => {}
            Ok(Some(_)) | Err(_) => return,
        }
        match self.fallback.set(&self.key_id, key.expose_hex()) {
            Ok(()) => info!(backend = self.fallback.name(), "wrote encryption key backup"),
            Err(err) => warn!(
                backend = self.fallback.name(),
                error = %err,
                "could not write key backup"
            ),
        }
    }
}

impl std::fmt::Debug for KeyVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyVault")
            .field("key_id", &self.key_id)
            .field("secure", &self.secure.name())
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault(secure: &MemoryKeyBackend, fallback: &MemoryKeyBackend) -> KeyVault {
        KeyVault::new(
            "test_key",
            Box::new(secure.clone()),
            Box::new(fallback.clone()),
        )
    }

    #[test]
    fn test_generated_key_shape() {
        let key = EncryptionKey::generate().unwrap();
        assert_eq!(key.expose_hex().len(), KEY_HEX_LENGTH);
        assert!(key
            .expose_hex()
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_ne!(key, EncryptionKey::generate().unwrap());
    }

    #[test]
    fn test_from_hex_normalizes_and_rejects() {
        let lower = "ab".repeat(32);
        let key = EncryptionKey::from_hex(&format!("  {}\n", lower)).unwrap();
        assert_eq!(key.expose_hex(), "AB".repeat(32));
        assert_eq!(*key.to_bytes().unwrap(), [0xAB; KEY_LENGTH]);

        assert!(EncryptionKey::from_hex("abcd").is_err());
        assert!(EncryptionKey::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_debug_redacts() {
        let key = EncryptionKey::generate().unwrap();
        let debug_output = format!("{:?}", key);
        assert!(debug_output.contains("REDACTED"));
        assert!(!debug_output.contains(&key.expose_hex()[..8]));
    }

    #[test]
    fn test_first_call_writes_both_backends() {
        let secure = MemoryKeyBackend::new();
        let fallback = MemoryKeyBackend::new();

        let key = vault(&secure, &fallback).get_or_create_key().unwrap();

        assert_eq!(secure.get("test_key").unwrap().as_deref(), Some(key.expose_hex()));
        assert_eq!(fallback.get("test_key").unwrap().as_deref(), Some(key.expose_hex()));
    }

    #[test]
    fn test_repeat_calls_do_not_regenerate() {
        let secure = MemoryKeyBackend::new();
        let fallback = MemoryKeyBackend::new();
        let vault = vault(&secure, &fallback);

        let first = vault.get_or_create_key().unwrap();
        let writes = secure.write_count() + fallback.write_count();
        let second = vault.get_or_create_key().unwrap();

        assert_eq!(first, second);
        assert_eq!(secure.write_count() + fallback.write_count(), writes);
    }

    #[test]
    fn test_blank_secure_value_is_absent() {
        let secure = MemoryKeyBackend::new();
        let fallback = MemoryKeyBackend::new();
        secure.set("test_key", "   ").unwrap();

        let key = vault(&secure, &fallback).get_or_create_key().unwrap();
        assert_eq!(key.expose_hex().len(), KEY_HEX_LENGTH);
    }

    #[test]
    fn test_malformed_stored_key_is_not_replaced() {
        let secure = MemoryKeyBackend::new();
        let fallback = MemoryKeyBackend::new();
        secure.set("test_key", "not-a-key").unwrap();

        let result = vault(&secure, &fallback).get_or_create_key();
        assert!(matches!(result, Err(StoreError::KeyUnavailable(_))));
        assert_eq!(secure.get("test_key").unwrap().as_deref(), Some("not-a-key"));
    }

    #[test]
    fn test_unreadable_secure_store_is_never_overwritten() {
        let secure = MemoryKeyBackend::new();
        let fallback = MemoryKeyBackend::new();
        let original = "AB".repeat(32);
        secure.set("test_key", &original).unwrap();
        secure.fail_reads(true);
        let writes = secure.write_count();

        let result = vault(&secure, &fallback).get_or_create_key();
        assert!(matches!(result, Err(StoreError::KeyUnavailable(_))));
        assert_eq!(secure.write_count(), writes);
        assert_eq!(fallback.write_count(), 0);

        secure.fail_reads(false);
        assert_eq!(secure.get("test_key").unwrap().as_deref(), Some(original.as_str()));
        assert_eq!(fallback.get("test_key").unwrap(), None);
    }

    #[test]
    fn test_unreadable_fallback_with_empty_secure_does_not_generate() {
        let secure = MemoryKeyBackend::new();
        let fallback = MemoryKeyBackend::new();
        fallback.fail_reads(true);

        let result = vault(&secure, &fallback).get_or_create_key();
        assert!(matches!(result, Err(StoreError::KeyUnavailable(_))));
        assert_eq!(secure.write_count(), 0);
        assert_eq!(fallback.write_count(), 0);
    }

    #[test]
    fn test_malformed_secure_key_recovers_from_fallback() {
        let secure = MemoryKeyBackend::new();
        let fallback = MemoryKeyBackend::new();
        let backup = "CD".repeat(32);
        secure.set("test_key", "garbage").unwrap();
        fallback.set("test_key", &backup).unwrap();

        let key = vault(&secure, &fallback).get_or_create_key().unwrap();
        assert_eq!(key.expose_hex(), backup);
        assert_eq!(secure.get("test_key").unwrap().as_deref(), Some(backup.as_str()));
        assert_eq!(fallback.get("test_key").unwrap().as_deref(), Some(backup.as_str()));
    }

    #[test]
    fn test_both_backends_failing_is_key_unavailable() {
        let secure = MemoryKeyBackend::new();
        let fallback = MemoryKeyBackend::new();
        secure.fail_writes(true);
        fallback.fail_writes(true);

        let result = vault(&secure, &fallback).get_or_create_key();
        assert!(matches!(result, Err(StoreError::KeyUnavailable(_))));
    }

    #[test]
    fn test_vault_debug_omits_key() {
        let secure = MemoryKeyBackend::new();
        let fallback = MemoryKeyBackend::new();
        let vault = vault(&secure, &fallback);
        let key = vault.get_or_create_key().unwrap();

        let debug_output = format!("{:?}", vault);
        assert!(debug_output.contains("memory"));
        assert!(!debug_output.contains(key.expose_hex()));
    }
}
