//! Cartridge manifest parsing and location
//!
//! The manifest is a JSON object describing the cartridge. Only two
//! members matter to the trust system, both base64 strings:
//!
//! ```json
//! { "title": "...", "publicKey": "<32 bytes>", "signature": "<64 bytes>" }
//! ```
//!
//! Manifests live either in a sidecar file next to the cartridge
//! (`law.cartridge.manifest.json`) or inside the cartridge database in the
//! `metadata` table under the `manifest` key.

use crate::cartridge;
use crate::trust::error::TrustError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Manifest member carrying the base64 Ed25519 signature
pub const SIGNATURE_FIELD: &str = "signature";

/// Manifest member carrying the base64 Ed25519 public key
pub const PUBLIC_KEY_FIELD: &str = "publicKey";

/// Suffix appended to the cartridge file name to locate its sidecar manifest
pub const SIDECAR_SUFFIX: &str = ".manifest.json";

/// Extract the detached signature from manifest bytes.
///
/// Returns `None` when the bytes are not JSON, the member is missing or not
/// a string, or its value is not valid base64. An empty value also counts
/// as missing.
pub fn extract_signature(manifest: &[u8]) -> Option<Vec<u8>> {
    extract_base64_field(manifest, SIGNATURE_FIELD)
}

/// Extract the publisher public key from manifest bytes.
///
/// Same rules as [`extract_signature`]; the two are independent.
pub fn extract_public_key(manifest: &[u8]) -> Option<Vec<u8>> {
    extract_base64_field(manifest, PUBLIC_KEY_FIELD)
}

fn extract_base64_field(manifest: &[u8], field: &str) -> Option<Vec<u8>> {
    let doc: Value = match serde_json::from_slice(manifest) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Failed to parse manifest JSON: {}", e);
            return None;
        }
    };

    let encoded = match doc.get(field)? {
        Value::String(s) => s,
        other => {
            warn!("Manifest field '{}' is not a string: {}", field, other);
            return None;
        }
    };

    match STANDARD.decode(encoded.trim()) {
        Ok(bytes) if bytes.is_empty() => None,
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!("Manifest field '{}' is not valid base64: {}", field, e);
            None
        }
    }
}

/// Parsed view of the signing-relevant manifest members
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub signature: Option<Vec<u8>>,
    pub public_key: Option<Vec<u8>>,
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> Self {
        Manifest {
            signature: extract_signature(bytes),
            public_key: extract_public_key(bytes),
        }
    }

    /// Both a signature and a public key are present
    pub fn is_signed(&self) -> bool {
        self.signature.is_some() && self.public_key.is_some()
    }
}

/// Parse manifest bytes into a JSON object
pub fn parse_object(manifest: &[u8]) -> Result<Map<String, Value>, TrustError> {
    let doc: Value = serde_json::from_slice(manifest)
        .map_err(|e| TrustError::ManifestParseError { source: e })?;
    match doc {
        Value::Object(map) => Ok(map),
        _ => Err(TrustError::ManifestNotObject),
    }
}

/// The manifest bytes that enter the signed digest.
///
/// The `signature` member is dropped (a manifest cannot sign itself) and the
/// rest is serialized compactly with top-level keys in sorted order, so
/// reformatting the sidecar does not invalidate a signature but changing
/// any value does.
pub fn signing_bytes(manifest: &[u8]) -> Result<Vec<u8>, TrustError> {
    let mut map = parse_object(manifest)?;
    map.remove(SIGNATURE_FIELD);

    let sorted: BTreeMap<String, Value> = map.into_iter().collect();
    serde_json::to_vec(&sorted).map_err(|e| TrustError::ManifestParseError { source: e })
}

/// Location of the sidecar manifest for a cartridge
pub fn sidecar_path(cartridge_path: &Path) -> PathBuf {
    let mut name = cartridge_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(SIDECAR_SUFFIX);
    cartridge_path.with_file_name(name)
}

/// Write manifest bytes to the sidecar location of a cartridge
pub fn write_sidecar(cartridge_path: &Path, manifest: &[u8]) -> Result<PathBuf, TrustError> {
    let path = sidecar_path(cartridge_path);
    std::fs::write(&path, manifest).map_err(|e| TrustError::ManifestWriteError {
        path: path.clone(),
        source: e,
    })?;
    debug!("Wrote sidecar manifest: {}", path.display());
    Ok(path)
}

/// Source of manifest bytes for a cartridge
pub trait ManifestReader: Send + Sync {
    /// Read the raw manifest bytes for the cartridge at `cartridge_path`
    fn read_manifest(&self, cartridge_path: &Path) -> Result<Vec<u8>, TrustError>;
}

/// Reads `<cartridge>.manifest.json` next to the cartridge file
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarManifestReader;

impl ManifestReader for SidecarManifestReader {
    fn read_manifest(&self, cartridge_path: &Path) -> Result<Vec<u8>, TrustError> {
        let path = sidecar_path(cartridge_path);
        if !path.exists() {
            return Err(TrustError::ManifestMissing {
                path: cartridge_path.to_path_buf(),
            });
        }

        trace!("Reading sidecar manifest: {}", path.display());
        std::fs::read(&path).map_err(|e| TrustError::ManifestReadError { path, source: e })
    }
}

/// Reads the `manifest` row of the cartridge's `metadata` table
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedManifestReader;

impl ManifestReader for EmbeddedManifestReader {
    fn read_manifest(&self, cartridge_path: &Path) -> Result<Vec<u8>, TrustError> {
        trace!("Reading embedded manifest: {}", cartridge_path.display());
        let value = cartridge::read_metadata_at(cartridge_path, cartridge::MANIFEST_KEY)
            .map_err(|e| TrustError::EmbeddedManifestError {
                path: cartridge_path.to_path_buf(),
                source: e,
            })?;

        value
            .map(String::into_bytes)
            .ok_or_else(|| TrustError::ManifestMissing {
                path: cartridge_path.to_path_buf(),
            })
    }
}

/// Default reader: the sidecar wins when present, otherwise the embedded
/// manifest is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct CartridgeManifestReader;

impl ManifestReader for CartridgeManifestReader {
    fn read_manifest(&self, cartridge_path: &Path) -> Result<Vec<u8>, TrustError> {
        if sidecar_path(cartridge_path).exists() {
            SidecarManifestReader.read_manifest(cartridge_path)
        } else {
            EmbeddedManifestReader.read_manifest(cartridge_path)
        }
    }
}
