//! Platform directories for per-user state

use crate::config::ConfigError;
use std::path::PathBuf;
use tracing::trace;

const QUALIFIER: &str = "io";
const ORGANIZATION: &str = "codexium";
const APPLICATION: &str = "codexium-magnus";

/// File name of the trust store inside the config directory
pub const TRUST_STORE_FILE: &str = "trusted_keys.json";

/// File name of the user configuration layer
pub const USER_CONFIG_FILE: &str = "config.yaml";

/// Per-user configuration directory.
///
/// Not created here; writers create it on first save.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let dir = directories::ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .or_else(|| dirs::config_dir().map(|d| d.join(APPLICATION)))
        .ok_or(ConfigError::NoConfigDir)?;

    trace!("Config directory: {}", dir.display());
    Ok(dir)
}

/// Default location of the trust store
pub fn trust_store_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(TRUST_STORE_FILE))
}

/// Default location of the user configuration layer
pub fn user_config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(USER_CONFIG_FILE))
}

/// Use `explicit` when given, otherwise the platform default
pub fn resolve(
    explicit: Option<PathBuf>,
    default: fn() -> Result<PathBuf, ConfigError>,
) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) => Ok(path),
        None => default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = resolve(Some(PathBuf::from("/tmp/keys.json")), trust_store_path).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/keys.json"));
    }

    #[test]
    fn test_default_file_names() {
        // Headless CI may lack a home directory; only check when one resolves
        if let Ok(path) = trust_store_path() {
            assert!(path.ends_with(TRUST_STORE_FILE));
        }
        if let Ok(path) = user_config_path() {
            assert!(path.ends_with(USER_CONFIG_FILE));
        }
    }
}
