//! Key storage backends.
//!
//! A `KeyBackend` is a small string key/value capability. The vault chains a
//! secure backend (OS keychain) with a plain fallback (preferences file).

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Result, StoreError};

/// A persistent string store addressed by identifier.
pub trait KeyBackend: Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Read the value stored under `id`, or `None` if nothing is stored.
    fn get(&self, id: &str) -> Result<Option<String>>;

    /// Store `value` under `id`, replacing any previous value.
    fn set(&self, id: &str, value: &str) -> Result<()>;
}

/// OS keychain backend (macOS Keychain, Windows Credential Manager, Secret Service).
#[derive(Debug, Clone)]
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, id: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, id)
            .map_err(|e| StoreError::KeyUnavailable(format!("Keychain entry failed: {}", e)))
    }
}

impl KeyBackend for KeyringBackend {
    fn name(&self) -> &'static str {
        "keyring"
    }

    fn get(&self, id: &str) -> Result<Option<String>> {
        match self.entry(id)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(StoreError::KeyUnavailable(format!(
                "Keychain read failed: {}",
                err
            ))),
        }
    }

    fn set(&self, id: &str, value: &str) -> Result<()> {
        self.entry(id)?
            .set_password(value)
            .map_err(|e| StoreError::KeyUnavailable(format!("Keychain write failed: {}", e)))
    }
}

/// Plain TOML key/value file, written atomically with owner-only permissions.
///
/// Not secure storage: it only exists so the key survives a keychain reset.
#[derive(Debug, Clone)]
pub struct PreferenceFile {
    path: PathBuf,
}

impl PreferenceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new())
            }
            Err(err) => {
                return Err(StoreError::KeyUnavailable(format!(
                    "Failed to read preferences {}: {}",
                    self.path.display(),
                    err
                )))
            }
        };
        toml::from_str(&contents).map_err(|e| {
            StoreError::KeyUnavailable(format!(
                "Failed to parse preferences {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl KeyBackend for PreferenceFile {
    fn name(&self) -> &'static str {
        "preferences"
    }

    fn get(&self, id: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(id))
    }

    fn set(&self, id: &str, value: &str) -> Result<()> {
        let mut values = self.read_all()?;
        values.insert(id.to_string(), value.to_string());
        let contents = toml::to_string(&values)
            .map_err(|e| StoreError::KeyUnavailable(format!("TOML error: {}", e)))?;

        crate::fs::ensure_parent_dir(&self.path)
            .and_then(|_| crate::fs::write_atomic(&self.path, contents.as_bytes(), true))
            .map_err(|e| {
                StoreError::KeyUnavailable(format!(
                    "Failed to write preferences {}: {}",
                    self.path.display(),
                    e
                ))
            })
    }
}

/// Secure storage switched off: nothing is ever stored, every write fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBackend;

impl KeyBackend for DisabledBackend {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn get(&self, _id: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn set(&self, _id: &str, _value: &str) -> Result<()> {
        Err(StoreError::KeyUnavailable(
            "Secure key storage is disabled".to_string(),
        ))
    }
}

/// Volatile in-process backend with failure injection.
///
/// Clones share the same storage, so a test can keep a handle while the vault
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyBackend {
    inner: Arc<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    values: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryKeyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `get` calls made so far.
    pub fn read_count(&self) -> usize {
        self.inner.reads.load(Ordering::SeqCst)
    }

    /// Number of successful `set` calls made so far.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Drop every stored value, as an OS keystore reset would.
    pub fn clear(&self) {
        self.values().clear();
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // Poisoning only happens if a test panicked mid-write; the map is still usable.
        self.inner
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyBackend for MemoryKeyBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, id: &str) -> Result<Option<String>> {
        self.inner.reads.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::KeyUnavailable(
                "Memory backend read failure".to_string(),
            ));
        }
        Ok(self.values().get(id).cloned())
    }

    fn set(&self, id: &str, value: &str) -> Result<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::KeyUnavailable(
                "Memory backend write failure".to_string(),
            ));
        }
        self.values().insert(id.to_string(), value.to_string());
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
