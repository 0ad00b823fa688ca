//! Trust system error types with clear, actionable messages

use std::path::PathBuf;
use thiserror::Error;

/// Trust system specific errors
///
/// These never escape cartridge classification, which folds them into a
/// trust level. They surface from trust store persistence, manifest
/// reading and signing.
#[derive(Error, Debug)]
pub enum TrustError {
    /// Cartridge file does not exist
    #[error("Cartridge not found: {path}")]
    CartridgeNotFound { path: PathBuf },

    /// Failed to read the cartridge database bytes
    #[error("Failed to read cartridge: {path}")]
    CartridgeReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No manifest could be located for the cartridge
    #[error("No manifest found for cartridge: {path}")]
    ManifestMissing { path: PathBuf },

    /// Failed to read a manifest file
    #[error("Failed to read manifest from {path}")]
    ManifestReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read an embedded manifest from the cartridge database
    #[error("Failed to read embedded manifest from {path}")]
    EmbeddedManifestError {
        path: PathBuf,
        #[source]
        source: crate::cartridge::CartridgeError,
    },

    /// Manifest bytes are not a JSON object
    #[error("Failed to parse manifest (corrupted or invalid format)")]
    ManifestParseError {
        #[source]
        source: serde_json::Error,
    },

    /// Manifest JSON is valid but not an object
    #[error("Manifest must be a JSON object")]
    ManifestNotObject,

    /// Failed to write a manifest file
    #[error("Failed to write manifest to {path}")]
    ManifestWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read the trust store
    #[error("Failed to read trust store from {path}")]
    StoreReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the trust store
    #[error("Failed to parse trust store (corrupted or invalid format)")]
    StoreParseError {
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write the trust store
    #[error("Failed to write trust store to {path}")]
    StoreWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key material could not be decoded
    #[error("Invalid key: {reason}")]
    InvalidKey { reason: String },
}

/// Log security-critical trust errors
impl TrustError {
    pub fn log_if_security_critical(&self) {
        match self {
            TrustError::StoreParseError { .. } | TrustError::InvalidKey { .. } => {
                tracing::error!(target: "security", "TRUST STORE PROBLEM: {}", self);
            }
            _ => {}
        }
    }
}
