//! Publisher-side cartridge signing
//!
//! Signing writes the manifest to the cartridge's sidecar location so the
//! database bytes that enter the digest stay exactly as published.

use crate::trust::error::TrustError;
use crate::trust::hasher;
use crate::trust::manifest::{
    self, CartridgeManifestReader, ManifestReader, PUBLIC_KEY_FIELD, SIGNATURE_FIELD,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ed25519_dalek::{Signer, SigningKey};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info};

/// Generate a fresh publisher key from the OS random source
pub fn generate_signing_key() -> SigningKey {
    SigningKey::generate(&mut rand::rngs::OsRng)
}

/// Base64 of the 32-byte secret seed
pub fn encode_signing_key(key: &SigningKey) -> String {
    STANDARD.encode(key.to_bytes())
}

/// Base64 of the 32-byte public key, as stored in manifests and the trust store
pub fn encode_public_key(key: &SigningKey) -> String {
    STANDARD.encode(key.verifying_key().as_bytes())
}

/// Parse a base64 secret seed written by [`encode_signing_key`]
pub fn decode_signing_key(encoded: &str) -> Result<SigningKey, TrustError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| TrustError::InvalidKey {
            reason: format!("secret key is not valid base64: {e}"),
        })?;
    let seed = <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| TrustError::InvalidKey {
        reason: format!("secret key must be 32 bytes, got {}", bytes.len()),
    })?;
    Ok(SigningKey::from_bytes(&seed))
}

/// Sign the cartridge at `cartridge_path` and write its sidecar manifest.
///
/// The existing manifest (sidecar or embedded) is kept, with `publicKey`
/// set to `key` and any old `signature` replaced. Returns the new
/// signature bytes.
pub fn sign_cartridge(cartridge_path: &Path, key: &SigningKey) -> Result<Vec<u8>, TrustError> {
    if !cartridge_path.is_file() {
        return Err(TrustError::CartridgeNotFound {
            path: cartridge_path.to_path_buf(),
        });
    }

    let mut doc = match CartridgeManifestReader.read_manifest(cartridge_path) {
        Ok(bytes) if !bytes.is_empty() => manifest::parse_object(&bytes)?,
        Ok(_) | Err(TrustError::ManifestMissing { .. }) => {
            debug!(
                "No manifest for {} - starting from an empty one",
                cartridge_path.display()
            );
            Map::new()
        }
        Err(e) => return Err(e),
    };

    doc.remove(SIGNATURE_FIELD);
    doc.insert(
        PUBLIC_KEY_FIELD.to_string(),
        Value::String(encode_public_key(key)),
    );

    let unsigned = serde_json::to_vec(&doc).map_err(|e| TrustError::ManifestParseError { source: e })?;
    let digest = hasher::hash_manifest_and_file(&unsigned, cartridge_path)?;
    let signature = key.sign(&digest).to_bytes().to_vec();

    doc.insert(
        SIGNATURE_FIELD.to_string(),
        Value::String(STANDARD.encode(&signature)),
    );
    let signed =
        serde_json::to_vec_pretty(&doc).map_err(|e| TrustError::ManifestParseError { source: e })?;
    let sidecar = manifest::write_sidecar(cartridge_path, &signed)?;

    info!(
        "Signed {} with key {} ({})",
        cartridge_path.display(),
        hex::encode(&key.verifying_key().as_bytes()[..8]),
        hasher::format_digest(&digest)
    );
    debug!("Signature written to {}", sidecar.display());
    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::manifest::Manifest;
    use crate::trust::verifier::verify_signature;
    use tempfile::TempDir;

    #[test]
    fn test_key_encoding_roundtrip() {
        let key = generate_signing_key();
        let decoded = decode_signing_key(&encode_signing_key(&key)).unwrap();
        assert_eq!(key.to_bytes(), decoded.to_bytes());
    }

    #[test]
    fn test_decode_rejects_bad_keys() {
        assert!(decode_signing_key("***").is_err());
        assert!(decode_signing_key(&STANDARD.encode([1u8; 16])).is_err());
    }

    #[test]
    fn test_sign_then_verify() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.cartridge");
        std::fs::write(&path, b"database bytes").unwrap();
        manifest::write_sidecar(&path, br#"{"title":"Book","signature":"stale"}"#).unwrap();

        let key = SigningKey::from_bytes(&[42u8; 32]);
        let signature = sign_cartridge(&path, &key).unwrap();

        let written = std::fs::read(manifest::sidecar_path(&path)).unwrap();
        let parsed = Manifest::parse(&written);
        assert_eq!(parsed.signature.as_deref(), Some(signature.as_slice()));
        assert_eq!(
            parsed.public_key.as_deref(),
            Some(key.verifying_key().as_bytes().as_slice())
        );

        let digest = hasher::compute_cartridge_hash(&path, &CartridgeManifestReader).unwrap();
        assert!(verify_signature(
            &digest,
            &signature,
            key.verifying_key().as_bytes()
        ));
    }

    #[test]
    fn test_sign_without_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.cartridge");
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE documents (id TEXT, title TEXT, content TEXT);")
            .unwrap();

        let key = generate_signing_key();
        sign_cartridge(&path, &key).unwrap();

        let written = std::fs::read(manifest::sidecar_path(&path)).unwrap();
        assert!(Manifest::parse(&written).is_signed());
    }

    #[test]
    fn test_sign_non_database_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk.cartridge");
        std::fs::write(&path, b"not a database, only a few stray bytes of text").unwrap();

        assert!(matches!(
            sign_cartridge(&path, &generate_signing_key()),
            Err(TrustError::EmbeddedManifestError { .. })
        ));
    }

    #[test]
    fn test_sign_missing_cartridge() {
        let dir = TempDir::new().unwrap();
        let result = sign_cartridge(&dir.path().join("gone.cartridge"), &generate_signing_key());
        assert!(matches!(result, Err(TrustError::CartridgeNotFound { .. })));
    }
}
