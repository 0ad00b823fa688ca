//! Cartridge trust classification
//!
//! `CartridgeVerifier::verify_cartridge` is the top-level trust operation.
//! It evaluates, in order:
//!
//! 1. file exists, else `Invalid` ("file not found")
//! 2. manifest readable and non-empty, else `Invalid` ("failed to read manifest")
//! 3. signature and public key both present, else `Homebrew`
//! 4. digest computable, else `Invalid` ("failed to compute hash")
//! 5. crypto available, else `Unverified` ("verification library unavailable")
//! 6. signature valid, else `Invalid` ("invalid signature")
//! 7. trust store lookup of the public key
//!
//! An unsigned cartridge is never `Invalid`, and a runtime that cannot check
//! signatures is never confused with a bad signature.

use crate::trust::hasher::{self, CartridgeDigest};
use crate::trust::manifest::{CartridgeManifestReader, Manifest, ManifestReader};
use crate::trust::store::TrustStore;
use crate::trust::verifier::{Ed25519Verifier, SignatureVerifier};
use crate::trust::TrustLevel;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why a verification did not reach a trusted outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationFailure {
    FileNotFound,
    ManifestUnreadable,
    HashFailed,
    LibraryUnavailable,
    InvalidSignature,
}

impl VerificationFailure {
    /// Human-readable reason carried by events and reports
    pub fn reason(&self) -> &'static str {
        match self {
            VerificationFailure::FileNotFound => "file not found",
            VerificationFailure::ManifestUnreadable => "failed to read manifest",
            VerificationFailure::HashFailed => "failed to compute hash",
            VerificationFailure::LibraryUnavailable => "verification library unavailable",
            VerificationFailure::InvalidSignature => "invalid signature",
        }
    }

    /// Whether this failure also raises a `verification_failed` event.
    ///
    /// A missing crypto backend is reported through the level alone.
    pub fn emits_failure_event(&self) -> bool {
        !matches!(self, VerificationFailure::LibraryUnavailable)
    }
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Outcome of classifying one cartridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartridgeVerification {
    pub path: PathBuf,
    pub level: TrustLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<VerificationFailure>,
    /// Fingerprint of the signing key when the manifest names one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// Label of the trusted key that matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher_label: Option<String>,
    /// `sha256:<hex>` digest when one was computed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl CartridgeVerification {
    fn new(path: &Path, level: TrustLevel) -> Self {
        CartridgeVerification {
            path: path.to_path_buf(),
            level,
            failure: None,
            publisher: None,
            publisher_label: None,
            digest: None,
        }
    }

    fn failed(path: &Path, level: TrustLevel, failure: VerificationFailure) -> Self {
        CartridgeVerification {
            failure: Some(failure),
            ..Self::new(path, level)
        }
    }

    pub fn is_trusted(&self) -> bool {
        self.level.is_trusted()
    }
}

/// Receives trust events as classification reaches a terminal state
pub trait VerificationObserver: Send + Sync {
    /// Called once for every terminal state
    fn cartridge_verified(&self, path: &Path, level: TrustLevel);

    /// Called for file, manifest, hash and signature failures
    fn verification_failed(&self, path: &Path, failure: VerificationFailure);
}

/// Default observer: emits the events as structured logs
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl VerificationObserver for TracingObserver {
    fn cartridge_verified(&self, path: &Path, level: TrustLevel) {
        match level {
            TrustLevel::Invalid => warn!(
                target: "security",
                cartridge = %path.display(),
                level = level.as_str(),
                "Cartridge failed trust verification"
            ),
            _ => info!(
                cartridge = %path.display(),
                level = level.as_str(),
                "Cartridge verified"
            ),
        }
    }

    fn verification_failed(&self, path: &Path, failure: VerificationFailure) {
        warn!(
            target: "security",
            cartridge = %path.display(),
            reason = failure.reason(),
            "Cartridge verification failed"
        );
    }
}

/// Classifies cartridges against a trust store
#[derive(Clone)]
pub struct CartridgeVerifier {
    store: Arc<TrustStore>,
    signatures: Arc<dyn SignatureVerifier>,
    manifests: Arc<dyn ManifestReader>,
    observers: Vec<Arc<dyn VerificationObserver>>,
}

impl fmt::Debug for CartridgeVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartridgeVerifier")
            .field("store", &self.store)
            .field("crypto_available", &self.signatures.is_available())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl CartridgeVerifier {
    /// Verifier with the default Ed25519 backend, manifest reader and a
    /// tracing observer
    pub fn new(store: Arc<TrustStore>) -> Self {
        CartridgeVerifier {
            store,
            signatures: Arc::new(Ed25519Verifier),
            manifests: Arc::new(CartridgeManifestReader),
            observers: vec![Arc::new(TracingObserver)],
        }
    }

    pub fn with_signature_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.signatures = verifier;
        self
    }

    pub fn with_manifest_reader(mut self, reader: Arc<dyn ManifestReader>) -> Self {
        self.manifests = reader;
        self
    }

    /// Add an observer alongside the existing ones
    pub fn with_observer(mut self, observer: Arc<dyn VerificationObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Replace all observers, including the default tracing one
    pub fn with_observers(mut self, observers: Vec<Arc<dyn VerificationObserver>>) -> Self {
        self.observers = observers;
        self
    }

    pub fn store(&self) -> &Arc<TrustStore> {
        &self.store
    }

    /// Classify the cartridge at `path`. Never fails; every problem maps to
    /// a trust level and, where relevant, a failure reason.
    pub fn verify_cartridge(&self, path: &Path) -> CartridgeVerification {
        let outcome = self.classify(path);

        if let Some(failure) = outcome.failure {
            if failure.emits_failure_event() {
                for observer in &self.observers {
                    observer.verification_failed(path, failure);
                }
            }
        }
        for observer in &self.observers {
            observer.cartridge_verified(path, outcome.level);
        }

        outcome
    }

    /// Run [`verify_cartridge`](Self::verify_cartridge) on the blocking pool
    pub async fn verify_cartridge_async(&self, path: PathBuf) -> CartridgeVerification {
        let verifier = self.clone();
        let fallback_path = path.clone();
        match tokio::task::spawn_blocking(move || verifier.verify_cartridge(&path)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    target: "security",
                    "Verification task for {} did not complete: {}",
                    fallback_path.display(),
                    e
                );
                CartridgeVerification::failed(
                    &fallback_path,
                    TrustLevel::Invalid,
                    VerificationFailure::HashFailed,
                )
            }
        }
    }

    fn classify(&self, path: &Path) -> CartridgeVerification {
        use VerificationFailure::*;

        // 1. Existence
        if !path.is_file() {
            debug!("Cartridge not found: {}", path.display());
            return CartridgeVerification::failed(path, TrustLevel::Invalid, FileNotFound);
        }

        // 2. Manifest bytes
        let manifest_bytes = match self.manifests.read_manifest(path) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => {
                debug!("Empty manifest for {}", path.display());
                return CartridgeVerification::failed(path, TrustLevel::Invalid, ManifestUnreadable);
            }
            Err(e) => {
                debug!("Manifest read failed for {}: {}", path.display(), e);
                return CartridgeVerification::failed(path, TrustLevel::Invalid, ManifestUnreadable);
            }
        };

        // 3. Signed at all?
        let manifest = Manifest::parse(&manifest_bytes);
        let (Some(signature), Some(public_key)) = (manifest.signature, manifest.public_key) else {
            debug!("Unsigned cartridge: {}", path.display());
            return CartridgeVerification::new(path, TrustLevel::Homebrew);
        };
        let publisher = hex::encode(&public_key[..public_key.len().min(8)]);

        // 4. Digest
        let digest: CartridgeDigest = match hasher::hash_manifest_and_file(&manifest_bytes, path)
        {
            Ok(digest) => digest,
            Err(e) => {
                debug!("Hashing failed for {}: {}", path.display(), e);
                let mut outcome =
                    CartridgeVerification::failed(path, TrustLevel::Invalid, HashFailed);
                outcome.publisher = Some(publisher);
                return outcome;
            }
        };

        let mut outcome = CartridgeVerification::new(path, TrustLevel::Unverified);
        outcome.publisher = Some(publisher);
        outcome.digest = Some(hasher::format_digest(&digest));

        // 5. Capability
        if !self.signatures.is_available() {
            warn!("Signature verification unavailable in this build");
            outcome.failure = Some(LibraryUnavailable);
            return outcome;
        }

        // 6. Signature
        if !self.signatures.verify(&digest, &signature, &public_key) {
            warn!(
                target: "security",
                "Invalid signature on {} (publisher {})",
                path.display(),
                outcome.publisher.as_deref().unwrap_or("?")
            );
            outcome.level = TrustLevel::Invalid;
            outcome.failure = Some(InvalidSignature);
            return outcome;
        }

        // 7. Trust store, read once so level and label agree
        match self.store.get(&public_key) {
            Some(key) => {
                outcome.level = key.trust_level();
                outcome.publisher_label = Some(key.label);
            }
            None => outcome.level = TrustLevel::Unverified,
        }
        outcome
    }
}
