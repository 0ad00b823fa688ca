//! Cryptographic hashing utilities for the trust system
//!
//! The signed message of a cartridge is
//! `SHA-256(signing_form(manifest) ++ database_bytes)`.

use crate::trust::error::TrustError;
use crate::trust::manifest::{self, ManifestReader};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, trace};

/// SHA-256 digest of a cartridge
pub type CartridgeDigest = [u8; 32];

/// Compute the digest a publisher signs for the cartridge at `cartridge_path`.
///
/// Fails if the manifest cannot be read or is empty, if it is not a JSON
/// object, or if the database file cannot be read.
pub fn compute_cartridge_hash(
    cartridge_path: &Path,
    reader: &dyn ManifestReader,
) -> Result<CartridgeDigest, TrustError> {
    let manifest_bytes = reader.read_manifest(cartridge_path)?;
    if manifest_bytes.is_empty() {
        return Err(TrustError::ManifestMissing {
            path: cartridge_path.to_path_buf(),
        });
    }
    hash_manifest_and_file(&manifest_bytes, cartridge_path)
}

/// Digest over already-read manifest bytes followed by the database file
pub fn hash_manifest_and_file(
    manifest_bytes: &[u8],
    cartridge_path: &Path,
) -> Result<CartridgeDigest, TrustError> {
    let signing_form = manifest::signing_bytes(manifest_bytes)?;

    let mut hasher = Sha256::new();
    hasher.update(&signing_form);
    let db_len = stream_file_into(&mut hasher, cartridge_path)?;

    let digest: CartridgeDigest = hasher.finalize().into();
    debug!(
        "Cartridge digest computed: {} ({} manifest bytes + {} database bytes)",
        format_digest(&digest),
        signing_form.len(),
        db_len
    );
    Ok(digest)
}

fn stream_file_into(hasher: &mut Sha256, path: &Path) -> Result<u64, TrustError> {
    let read_error = |source: std::io::Error| TrustError::CartridgeReadError {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(read_error)?;
    let mut buffer = [0; 8192]; // 8KB buffer for streaming
    let mut total = 0u64;

    loop {
        let bytes_read = file.read(&mut buffer).map_err(read_error)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        total += bytes_read as u64;
    }

    trace!("Hashed {} bytes from {}", total, path.display());
    Ok(total)
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(content: &[u8]) -> CartridgeDigest {
    Sha256::digest(content).into()
}

/// Render a digest in the `sha256:<hex>` form used in logs and reports
pub fn format_digest(digest: &CartridgeDigest) -> String {
    format!("sha256:{}", hex::encode(digest))
}
