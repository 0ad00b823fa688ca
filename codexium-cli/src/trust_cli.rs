//! Trust CLI commands
//!
//! Cartridge verification, trusted key management, and (with the `ed25519`
//! feature) publisher key generation and signing.

use crate::StatePaths;
use anyhow::{bail, Context, Result};
use clap::Parser;
use codexium_core::report::ReportWriter;
use codexium_core::trust::store::decode_public_key;
use codexium_core::trust::{CartridgeVerifier, TrustLevel, TrustStore};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tabled::{settings::Style, Table, Tabled};

#[derive(Parser, Debug)]
pub enum TrustCommand {
    /// Trust a publisher key
    Add {
        /// Base64 Ed25519 public key (32 bytes)
        public_key: String,

        /// Human-readable name for the publisher
        #[clap(long)]
        label: String,

        /// Mark the key as an official publisher
        #[clap(long)]
        official: bool,
    },

    /// Stop trusting a publisher key
    Remove {
        /// Base64 Ed25519 public key
        public_key: String,
    },

    /// List trusted keys
    List {
        /// Print as JSON
        #[clap(long)]
        json: bool,
    },
}

impl TrustCommand {
    /// Execute the trust command
    pub fn execute(&self, state: &StatePaths) -> Result<()> {
        let store = open_store(&state.trust_store)?;
        match self {
            TrustCommand::Add {
                public_key,
                label,
                official,
            } => trust_add(&store, public_key, label, *official),
            TrustCommand::Remove { public_key } => trust_remove(&store, public_key),
            TrustCommand::List { json } => trust_list(&store, *json),
        }
    }
}

fn open_store(path: &Path) -> Result<TrustStore> {
    TrustStore::open(path)
        .with_context(|| format!("Failed to open trust store at {}", path.display()))
}

fn trust_add(store: &TrustStore, public_key: &str, label: &str, official: bool) -> Result<()> {
    let key = decode_public_key(public_key).context("Invalid public key")?;
    if !store.add_trusted_key(&key, label, official)? {
        bail!("Public key rejected: expected 32 bytes");
    }

    let kind = if official { "official" } else { "verified" };
    println!("✅ Trusted '{}' as {} publisher", label, kind);
    println!("   Key: {}", hex::encode(&key[..8]));
    Ok(())
}

fn trust_remove(store: &TrustStore, public_key: &str) -> Result<()> {
    let key = decode_public_key(public_key).context("Invalid public key")?;
    if store.remove_trusted_key(&key)? {
        println!("✅ Key removed from trust store");
    } else {
        println!("ℹ️  Key was not trusted - nothing to remove");
    }
    Ok(())
}

#[derive(Tabled, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrustedKeyRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Level")]
    level: TrustLevel,
    #[tabled(rename = "Fingerprint")]
    fingerprint: String,
    #[tabled(rename = "Public Key")]
    public_key_base64: String,
}

fn trust_list(store: &TrustStore, json: bool) -> Result<()> {
    let rows: Vec<TrustedKeyRow> = store
        .trusted_keys()
        .into_iter()
        .map(|key| TrustedKeyRow {
            fingerprint: key.fingerprint(),
            public_key_base64: key.public_key_base64(),
            level: key.trust_level(),
            label: key.label,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No trusted keys.");
        return Ok(());
    }

    println!("{} trusted keys\n", rows.len());
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}

/// Classify a cartridge and print the outcome
pub async fn verify_command(
    state: &StatePaths,
    cartridge: &Path,
    json: bool,
    report_path: Option<&Path>,
) -> Result<()> {
    let store = Arc::new(open_store(&state.trust_store)?);
    let report = Arc::new(ReportWriter::new());
    let verifier = CartridgeVerifier::new(store).with_observer(report.clone());

    let outcome = verifier
        .verify_cartridge_async(cartridge.to_path_buf())
        .await;

    if let Some(path) = report_path {
        report
            .write(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        let icon = match outcome.level {
            TrustLevel::Official | TrustLevel::Verified => "✅",
            TrustLevel::Unverified | TrustLevel::Homebrew => "⚠️ ",
            TrustLevel::Invalid => "❌",
        };
        println!("{} {}: {}", icon, cartridge.display(), outcome.level);
        if let Some(label) = &outcome.publisher_label {
            println!("   Publisher: {}", label);
        } else if let Some(fingerprint) = &outcome.publisher {
            println!("   Publisher key: {}", fingerprint);
        }
        if let Some(digest) = &outcome.digest {
            println!("   Digest: {}", digest);
        }
        if let Some(failure) = outcome.failure {
            println!("   Reason: {}", failure);
        }
    }

    if outcome.level == TrustLevel::Invalid {
        let reason = outcome
            .failure
            .map(|f| f.reason())
            .unwrap_or("invalid cartridge");
        bail!("Cartridge failed verification: {}", reason);
    }
    Ok(())
}

#[cfg(feature = "ed25519")]
pub fn keygen_command(out: &Path, force: bool) -> Result<()> {
    use codexium_core::trust::signer::{encode_public_key, encode_signing_key, generate_signing_key};

    if out.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            out.display()
        );
    }

    let key = generate_signing_key();
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(out, format!("{}\n", encode_signing_key(&key)))
        .with_context(|| format!("Failed to write secret key to {}", out.display()))?;

    println!("🔐 Secret key written to {}", out.display());
    println!("   Public key: {}", encode_public_key(&key));
    Ok(())
}

#[cfg(feature = "ed25519")]
pub fn sign_command(cartridge: &Path, key_path: &Path) -> Result<()> {
    use codexium_core::trust::manifest::sidecar_path;
    use codexium_core::trust::signer::{decode_signing_key, encode_public_key, sign_cartridge};

    let encoded = std::fs::read_to_string(key_path)
        .with_context(|| format!("Failed to read secret key {}", key_path.display()))?;
    let key = decode_signing_key(&encoded).context("Invalid secret key")?;

    sign_cartridge(cartridge, &key)
        .with_context(|| format!("Failed to sign {}", cartridge.display()))?;

    println!("✅ Signed {}", cartridge.display());
    println!("   Manifest: {}", sidecar_path(cartridge).display());
    println!("   Public key: {}", encode_public_key(&key));
    Ok(())
}
