//! Ed25519 signature verification
//!
//! Verification is a pure function: malformed input is "not verified",
//! never an error, and a build without the crypto backend verifies nothing.

use crate::trust::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use tracing::{trace, warn};

/// Detached-signature verification capability
pub trait SignatureVerifier: Send + Sync {
    /// Whether this verifier can check signatures at all
    fn is_available(&self) -> bool;

    /// Verify `signature` over `message` under `public_key`.
    ///
    /// Returns `false` for wrong-length inputs, invalid keys, mismatching
    /// signatures, and when the verifier is unavailable.
    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

/// Ed25519 verifier backed by `ed25519-dalek`
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl Ed25519Verifier {
    pub fn new() -> Self {
        Ed25519Verifier
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn is_available(&self) -> bool {
        cfg!(feature = "ed25519")
    }

    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        if signature.len() != SIGNATURE_LENGTH || public_key.len() != PUBLIC_KEY_LENGTH {
            warn!(
                "Invalid signature or public key size ({} / {} bytes)",
                signature.len(),
                public_key.len()
            );
            return false;
        }
        verify_ed25519(message, signature, public_key)
    }
}

#[cfg(feature = "ed25519")]
fn verify_ed25519(message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    use ed25519_dalek::{Signature, VerifyingKey};

    let Ok(key_bytes) = <[u8; PUBLIC_KEY_LENGTH]>::try_from(public_key) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; SIGNATURE_LENGTH]>::try_from(signature) else {
        return false;
    };

    let key = match VerifyingKey::from_bytes(&key_bytes) {
        Ok(key) => key,
        Err(e) => {
            trace!("Public key is not a valid Ed25519 point: {}", e);
            return false;
        }
    };

    let signature = Signature::from_bytes(&sig_bytes);
    key.verify_strict(message, &signature).is_ok()
}

#[cfg(not(feature = "ed25519"))]
fn verify_ed25519(_message: &[u8], _signature: &[u8], _public_key: &[u8]) -> bool {
    trace!("Ed25519 verification requires the `ed25519` feature");
    false
}

/// Verifier for runtimes without a crypto backend. Always fails closed.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableVerifier;

impl SignatureVerifier for UnavailableVerifier {
    fn is_available(&self) -> bool {
        false
    }

    fn verify(&self, _message: &[u8], _signature: &[u8], _public_key: &[u8]) -> bool {
        false
    }
}

/// Verify with the default Ed25519 verifier
pub fn verify_signature(message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    Ed25519Verifier.verify(message, signature, public_key)
}
