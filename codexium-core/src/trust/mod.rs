//! Codexium Trust System - authenticity classification for cartridges
//!
//! A cartridge is a SQLite file plus a JSON manifest. Publishers sign the
//! SHA-256 digest of the manifest's signing form followed by the raw
//! database bytes; readers verify that Ed25519 signature and look the
//! publisher key up in a locally managed trust store.
//!
//! Design Principles:
//! - Classification never fails - every path ends in a [`TrustLevel`]
//! - Unsigned is not invalid - homebrew cartridges are a normal outcome
//! - Fail closed - a runtime that cannot check signatures never reports trust
//! - Whole-unit tamper evidence - any byte change invalidates the signature

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod classifier;
pub mod error;
pub mod hasher;
pub mod manifest;
#[cfg(feature = "ed25519")]
pub mod signer;
pub mod store;
pub mod verifier;

pub use classifier::{
    CartridgeVerification, CartridgeVerifier, TracingObserver, VerificationFailure,
    VerificationObserver,
};
pub use error::TrustError;
pub use manifest::{CartridgeManifestReader, ManifestReader};
pub use store::{JsonFileBackend, MemoryBackend, TrustStore, TrustStoreBackend, TrustedKey};
pub use verifier::{Ed25519Verifier, SignatureVerifier, UnavailableVerifier};

/// Trust store document version for future compatibility
pub const TRUST_VERSION: u32 = 1;

/// Length of an Ed25519 public key in bytes
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Length of a detached Ed25519 signature in bytes
pub const SIGNATURE_LENGTH: usize = 64;

/// Trust classification for a cartridge.
///
/// Recomputed on every verification call; nothing caches a level across
/// trust store mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    /// Signed by a key marked official in the trust store
    Official,
    /// Signed by a key present in the trust store
    Verified,
    /// Validly signed by an unknown key, or the signature could not be checked
    Unverified,
    /// Unsigned cartridge
    Homebrew,
    /// Missing, unreadable, or tampered cartridge
    Invalid,
}

impl TrustLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::Official => "official",
            TrustLevel::Verified => "verified",
            TrustLevel::Unverified => "unverified",
            TrustLevel::Homebrew => "homebrew",
            TrustLevel::Invalid => "invalid",
        }
    }

    /// Whether the publisher is known to this installation
    pub fn is_trusted(&self) -> bool {
        matches!(self, TrustLevel::Official | TrustLevel::Verified)
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
