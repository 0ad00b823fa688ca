//! Concrete configuration layers
//!
//! - [`SystemConfig`]: built-in defaults, lowest precedence
//! - [`CorpusConfig`]: shipped inside a cartridge (`metadata` key `config`)
//! - [`UserConfig`]: YAML file in the user's config directory
//! - [`SessionConfig`]: in-process overrides, highest precedence

use crate::cartridge;
use crate::config::model::{
    BibliographyConfig, BibliographyLayer, ConfigDocument, TypographyConfig, TypographyLayer,
};
use crate::config::resolver::{resolve_bibliography, resolve_typography};
use crate::config::{paths, ConfigError, ConfigSource};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Built-in defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemConfig;

impl SystemConfig {
    pub const FONT_FAMILY: &'static str = "system-ui";
    pub const FONT_SIZE_PT: f64 = 12.0;
    pub const HEADING_SCALE: [f64; 6] = [2.0, 1.75, 1.5, 1.25, 1.1, 1.0];
    pub const PAGE_MARGIN_MM: f64 = 10.0;
    pub const BIBLIOGRAPHY_STYLE: &'static str = "APA";
    pub const BIBLIOGRAPHY_SORT: &'static str = "author";
}

impl ConfigSource for SystemConfig {
    fn name(&self) -> &str {
        "system"
    }

    fn typography(&self) -> Option<TypographyLayer> {
        Some(
            TypographyLayer::default()
                .font_family(Self::FONT_FAMILY)
                .font_size(Self::FONT_SIZE_PT)
                .heading_scale(Self::HEADING_SCALE.to_vec())
                .page_margin(Self::PAGE_MARGIN_MM)
                .black_on_white(false),
        )
    }

    fn bibliography(&self) -> Option<BibliographyLayer> {
        Some(
            BibliographyLayer::default()
                .style(Self::BIBLIOGRAPHY_STYLE)
                .sort_by(Self::BIBLIOGRAPHY_SORT)
                .group_by(""),
        )
    }
}

/// Configuration shipped by the cartridge publisher.
///
/// Cartridges are opened read-only, so the layer is read once.
#[derive(Debug, Clone, Default)]
pub struct CorpusConfig {
    document: ConfigDocument,
}

impl CorpusConfig {
    pub fn new(document: ConfigDocument) -> Self {
        CorpusConfig { document }
    }

    /// Read the `config` metadata entry of a cartridge.
    ///
    /// A cartridge without one yields a layer with no opinions.
    pub fn from_cartridge(path: &Path) -> Result<Self, ConfigError> {
        let Some(raw) = cartridge::read_metadata_at(path, cartridge::CONFIG_KEY)? else {
            debug!("Cartridge {} carries no corpus config", path.display());
            return Ok(Self::default());
        };

        let document: ConfigDocument =
            serde_json::from_str(&raw).map_err(|source| ConfigError::CorpusParse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Loaded corpus config from {}", path.display());
        Ok(CorpusConfig { document })
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }
}

impl ConfigSource for CorpusConfig {
    fn name(&self) -> &str {
        "corpus"
    }

    fn typography(&self) -> Option<TypographyLayer> {
        self.document.typography.clone()
    }

    fn bibliography(&self) -> Option<BibliographyLayer> {
        self.document.bibliography.clone()
    }
}

/// User preferences stored as YAML.
///
/// Every read goes back to the file, so edits made by another process (or
/// by `config set`) show up on the next resolution.
#[derive(Debug, Clone)]
pub struct UserConfig {
    path: PathBuf,
}

impl UserConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        UserConfig { path: path.into() }
    }

    /// User config at the platform default location
    pub fn discover() -> Result<Self, ConfigError> {
        Ok(Self::new(paths::user_config_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document; a missing file is an empty document
    pub fn load(&self) -> Result<ConfigDocument, ConfigError> {
        if !self.path.exists() {
            return Ok(ConfigDocument::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(ConfigDocument::default());
        }

        serde_yaml_ng::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, document: &ConfigDocument) -> Result<(), ConfigError> {
        let yaml = serde_yaml_ng::to_string(document).map_err(ConfigError::Serialize)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.path, yaml).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })?;

        info!("Saved user config to {}", self.path.display());
        Ok(())
    }

    /// Load, modify and save in one step
    pub fn update(&self, f: impl FnOnce(&mut ConfigDocument)) -> Result<ConfigDocument, ConfigError> {
        let mut document = self.load()?;
        f(&mut document);
        self.save(&document)?;
        Ok(document)
    }

    /// Delete the user config file. Returns whether one existed.
    pub fn reset(&self) -> Result<bool, ConfigError> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!("Removed user config {}", self.path.display());
        Ok(true)
    }

    fn load_or_warn(&self) -> ConfigDocument {
        self.load().unwrap_or_else(|e| {
            warn!("Ignoring unreadable user config: {}", e);
            ConfigDocument::default()
        })
    }
}

impl ConfigSource for UserConfig {
    fn name(&self) -> &str {
        "user"
    }

    fn typography(&self) -> Option<TypographyLayer> {
        self.load_or_warn().typography
    }

    fn bibliography(&self) -> Option<BibliographyLayer> {
        self.load_or_warn().bibliography
    }
}

/// Overrides that live for the current process only
#[derive(Debug, Default)]
pub struct SessionConfig {
    document: RwLock<ConfigDocument>,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, ConfigDocument> {
        self.document.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ConfigDocument> {
        self.document.write().unwrap_or_else(|p| p.into_inner())
    }

    /// Merge `layer` into the session's typography overrides
    pub fn set_typography(&self, layer: TypographyLayer) {
        let mut doc = self.write();
        doc.typography.get_or_insert_with(Default::default).overlay(layer);
    }

    /// Merge `layer` into the session's bibliography overrides
    pub fn set_bibliography(&self, layer: BibliographyLayer) {
        let mut doc = self.write();
        doc.bibliography.get_or_insert_with(Default::default).overlay(layer);
    }

    pub fn clear(&self) {
        *self.write() = ConfigDocument::default();
        debug!("Session config cleared");
    }

    pub fn snapshot(&self) -> ConfigDocument {
        self.read().clone()
    }
}

impl ConfigSource for SessionConfig {
    fn name(&self) -> &str {
        "session"
    }

    fn typography(&self) -> Option<TypographyLayer> {
        self.read().typography.clone()
    }

    fn bibliography(&self) -> Option<BibliographyLayer> {
        self.read().bibliography.clone()
    }
}

/// The four layers in precedence order
#[derive(Debug)]
pub struct ConfigStack {
    pub system: SystemConfig,
    pub corpus: Option<CorpusConfig>,
    pub user: UserConfig,
    pub session: SessionConfig,
}

impl ConfigStack {
    pub fn new(user: UserConfig) -> Self {
        ConfigStack {
            system: SystemConfig,
            corpus: None,
            user,
            session: SessionConfig::new(),
        }
    }

    /// Stack over the platform default user config
    pub fn discover() -> Result<Self, ConfigError> {
        Ok(Self::new(UserConfig::discover()?))
    }

    pub fn with_corpus(mut self, corpus: CorpusConfig) -> Self {
        self.corpus = Some(corpus);
        self
    }

    /// Swap the corpus layer when another cartridge is opened (or closed)
    pub fn set_corpus(&mut self, corpus: Option<CorpusConfig>) {
        self.corpus = corpus;
    }

    fn layers(&self) -> [Option<&dyn ConfigSource>; 4] {
        [
            Some(&self.session),
            Some(&self.user),
            self.corpus.as_ref().map(|c| c as &dyn ConfigSource),
            Some(&self.system),
        ]
    }

    pub fn effective_typography(&self) -> TypographyConfig {
        resolve_typography(&self.layers())
    }

    pub fn effective_bibliography(&self) -> BibliographyConfig {
        resolve_bibliography(&self.layers())
    }
}
