//! Layered reader configuration
//!
//! Typography and bibliography settings come from four sources, highest
//! precedence first: session, user, corpus (the open cartridge) and
//! system defaults. Each source may have no opinion at all, and a source
//! that has one may still leave individual fields unset.

use crate::cartridge::CartridgeError;
use std::path::PathBuf;
use thiserror::Error;

pub mod model;
pub mod paths;
pub mod resolver;
pub mod sources;

pub use model::{
    BibliographyConfig, BibliographyLayer, ConfigDocument, PrintOptions, PrintOptionsLayer,
    TypographyConfig, TypographyLayer,
};
pub use resolver::ConfigResolver;
pub use sources::{ConfigStack, CorpusConfig, SessionConfig, SystemConfig, UserConfig};

/// A configuration layer.
///
/// `None` from an accessor means the layer has no opinion and is skipped.
pub trait ConfigSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    fn typography(&self) -> Option<TypographyLayer>;

    fn bibliography(&self) -> Option<BibliographyLayer>;
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine the platform config directory")]
    NoConfigDir,

    #[error("Failed to read config from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Failed to serialize config")]
    Serialize(#[source] serde_yaml_ng::Error),

    #[error("Failed to write config to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corpus config in {path} is not valid JSON")]
    CorpusParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
}
