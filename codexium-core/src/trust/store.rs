//! Trusted publisher keys
//!
//! The store maps an Ed25519 public key to a label and an official flag.
//! Every mutation is persisted before it returns; there is no dirty state.

use crate::trust::error::TrustError;
use crate::trust::{TrustLevel, PUBLIC_KEY_LENGTH, TRUST_VERSION};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// A publisher key the user (or the distribution) has chosen to trust
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedKey {
    pub public_key: [u8; PUBLIC_KEY_LENGTH],
    pub label: String,
    pub is_official: bool,
}

impl TrustedKey {
    /// Base64 form used on disk and on the command line
    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.public_key)
    }

    /// Short hex fingerprint for display
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.public_key[..8])
    }

    pub fn trust_level(&self) -> TrustLevel {
        if self.is_official {
            TrustLevel::Official
        } else {
            TrustLevel::Verified
        }
    }
}

/// Persisted form of a trusted key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedKeyRecord {
    pub public_key_base64: String,
    pub label: String,
    #[serde(default)]
    pub is_official: bool,
}

impl From<&TrustedKey> for TrustedKeyRecord {
    fn from(key: &TrustedKey) -> Self {
        TrustedKeyRecord {
            public_key_base64: key.public_key_base64(),
            label: key.label.clone(),
            is_official: key.is_official,
        }
    }
}

impl TrustedKeyRecord {
    fn decode(&self) -> Option<TrustedKey> {
        let bytes = STANDARD.decode(self.public_key_base64.trim()).ok()?;
        let public_key = <[u8; PUBLIC_KEY_LENGTH]>::try_from(bytes.as_slice()).ok()?;
        Some(TrustedKey {
            public_key,
            label: self.label.clone(),
            is_official: self.is_official,
        })
    }
}

/// Durable storage for trusted key records
pub trait TrustStoreBackend: Send + Sync {
    fn load(&self) -> Result<Vec<TrustedKeyRecord>, TrustError>;
    fn save(&self, records: &[TrustedKeyRecord]) -> Result<(), TrustError>;
}

/// On-disk trust store document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrustStoreDocument {
    version: u32,
    updated: DateTime<Utc>,
    #[serde(default)]
    trusted_keys: Vec<TrustedKeyRecord>,
}

/// JSON file backend, written atomically (temp file + rename)
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileBackend { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TrustStoreBackend for JsonFileBackend {
    fn load(&self) -> Result<Vec<TrustedKeyRecord>, TrustError> {
        if !self.path.exists() {
            debug!("No trust store at {} - starting empty", self.path.display());
            return Ok(Vec::new());
        }

        let content =
            std::fs::read_to_string(&self.path).map_err(|e| TrustError::StoreReadError {
                path: self.path.clone(),
                source: e,
            })?;

        let doc: TrustStoreDocument = serde_json::from_str(&content)
            .map_err(|e| TrustError::StoreParseError { source: e })?;

        if doc.version != TRUST_VERSION {
            warn!(
                "Trust store version {} differs from supported version {}",
                doc.version, TRUST_VERSION
            );
        }

        Ok(doc.trusted_keys)
    }

    fn save(&self, records: &[TrustedKeyRecord]) -> Result<(), TrustError> {
        let write_error = |source: std::io::Error| TrustError::StoreWriteError {
            path: self.path.clone(),
            source,
        };

        let doc = TrustStoreDocument {
            version: TRUST_VERSION,
            updated: Utc::now(),
            trusted_keys: records.to_vec(),
        };
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| TrustError::StoreParseError { source: e })?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(write_error)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_error)?;
        tmp.write_all(json.as_bytes()).map_err(write_error)?;
        tmp.as_file().sync_all().map_err(write_error)?;
        tmp.persist(&self.path).map_err(|e| write_error(e.error))?;

        debug!(
            "Trust store saved: {} keys -> {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// In-memory backend. Clones share the same records, which lets tests
/// observe what was persisted and reload from it.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    records: Arc<Mutex<Vec<TrustedKeyRecord>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TrustedKeyRecord> {
        lock(&self.records).clone()
    }
}

impl TrustStoreBackend for MemoryBackend {
    fn load(&self) -> Result<Vec<TrustedKeyRecord>, TrustError> {
        Ok(lock(&self.records).clone())
    }

    fn save(&self, records: &[TrustedKeyRecord]) -> Result<(), TrustError> {
        *lock(&self.records) = records.to_vec();
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

type KeyMap = BTreeMap<[u8; PUBLIC_KEY_LENGTH], TrustedKey>;

/// Set of trusted publisher keys with synchronous persistence.
///
/// All operations take the same lock, so concurrent add/remove calls
/// cannot lose each other's updates.
pub struct TrustStore {
    keys: Mutex<KeyMap>,
    backend: Box<dyn TrustStoreBackend>,
}

impl std::fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustStore")
            .field("keys", &lock(&self.keys).len())
            .finish()
    }
}

impl TrustStore {
    /// Load a store from a backend
    pub fn load(backend: impl TrustStoreBackend + 'static) -> Result<Self, TrustError> {
        let backend: Box<dyn TrustStoreBackend> = Box::new(backend);
        let keys = Self::read_keys(backend.as_ref())?;
        info!("Trust store loaded: {} trusted keys", keys.len());
        Ok(TrustStore {
            keys: Mutex::new(keys),
            backend,
        })
    }

    /// Load a JSON file backed store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TrustError> {
        Self::load(JsonFileBackend::new(path))
    }

    /// Empty store that persists nowhere but memory
    pub fn in_memory() -> Self {
        TrustStore {
            keys: Mutex::new(KeyMap::new()),
            backend: Box::new(MemoryBackend::new()),
        }
    }

    fn read_keys(backend: &dyn TrustStoreBackend) -> Result<KeyMap, TrustError> {
        let records = backend.load().inspect_err(|e| e.log_if_security_critical())?;

        let mut keys = KeyMap::new();
        for record in records {
            match record.decode() {
                Some(key) => {
                    keys.insert(key.public_key, key);
                }
                None => warn!(
                    "Skipping trusted key '{}' - not a 32-byte base64 public key",
                    record.label
                ),
            }
        }
        Ok(keys)
    }

    /// Re-read the backend, discarding the in-memory view
    pub fn reload(&self) -> Result<(), TrustError> {
        let fresh = Self::read_keys(self.backend.as_ref())?;
        *lock(&self.keys) = fresh;
        debug!("Trust store reloaded");
        Ok(())
    }

    /// Trust `public_key`, replacing any existing entry for it.
    ///
    /// Returns `Ok(false)` without touching the store when the key is not
    /// exactly 32 bytes.
    pub fn add_trusted_key(
        &self,
        public_key: &[u8],
        label: &str,
        is_official: bool,
    ) -> Result<bool, TrustError> {
        let Ok(key_bytes) = <[u8; PUBLIC_KEY_LENGTH]>::try_from(public_key) else {
            warn!(
                "Rejected trusted key '{}': expected {} bytes, got {}",
                label,
                PUBLIC_KEY_LENGTH,
                public_key.len()
            );
            return Ok(false);
        };

        let key = TrustedKey {
            public_key: key_bytes,
            label: label.to_string(),
            is_official,
        };

        let mut keys = lock(&self.keys);
        let previous = keys.insert(key_bytes, key);
        if let Err(e) = self.persist(&keys) {
            match previous {
                Some(old) => keys.insert(key_bytes, old),
                None => keys.remove(&key_bytes),
            };
            return Err(e);
        }

        info!(
            "Trusted key added: {} ({}{})",
            label,
            hex::encode(&key_bytes[..8]),
            if is_official { ", official" } else { "" }
        );
        Ok(true)
    }

    /// Stop trusting `public_key`. Returns `Ok(false)` if it was not trusted.
    pub fn remove_trusted_key(&self, public_key: &[u8]) -> Result<bool, TrustError> {
        let Ok(key_bytes) = <[u8; PUBLIC_KEY_LENGTH]>::try_from(public_key) else {
            return Ok(false);
        };

        let mut keys = lock(&self.keys);
        let Some(removed) = keys.remove(&key_bytes) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&keys) {
            keys.insert(key_bytes, removed);
            return Err(e);
        }

        info!("Trusted key removed: {}", removed.label);
        Ok(true)
    }

    /// Trust level granted to signatures made with `public_key`
    pub fn trust_level_of(&self, public_key: &[u8]) -> TrustLevel {
        let Ok(key_bytes) = <[u8; PUBLIC_KEY_LENGTH]>::try_from(public_key) else {
            return TrustLevel::Unverified;
        };
        lock(&self.keys)
            .get(&key_bytes)
            .map_or(TrustLevel::Unverified, TrustedKey::trust_level)
    }

    /// Look up the entry for `public_key`
    pub fn get(&self, public_key: &[u8]) -> Option<TrustedKey> {
        let key_bytes = <[u8; PUBLIC_KEY_LENGTH]>::try_from(public_key).ok()?;
        lock(&self.keys).get(&key_bytes).cloned()
    }

    /// Snapshot of all trusted keys, ordered by key bytes
    pub fn trusted_keys(&self) -> Vec<TrustedKey> {
        lock(&self.keys).values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.keys).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.keys).is_empty()
    }

    fn persist(&self, keys: &KeyMap) -> Result<(), TrustError> {
        let records: Vec<TrustedKeyRecord> = keys.values().map(TrustedKeyRecord::from).collect();
        self.backend.save(&records)
    }
}

/// Decode a base64 public key given on the command line or in a file
pub fn decode_public_key(encoded: &str) -> Result<[u8; PUBLIC_KEY_LENGTH], TrustError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| TrustError::InvalidKey {
            reason: format!("not valid base64: {e}"),
        })?;
    <[u8; PUBLIC_KEY_LENGTH]>::try_from(bytes.as_slice()).map_err(|_| TrustError::InvalidKey {
        reason: format!(
            "expected {} bytes, got {}",
            PUBLIC_KEY_LENGTH,
            bytes.len()
        ),
    })
}
