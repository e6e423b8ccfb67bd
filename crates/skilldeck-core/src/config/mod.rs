mod env;
mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

const DEFAULT_CONFIG_PATH: &str = ".skilldeck/config.toml";
const MAX_DEBOUNCE_MS: u64 = 60_000;

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str::<Self>(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first rejected value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.skills.global_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("skills.global_dir must not be empty".into()));
        }
        if self.skills.project_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("skills.project_dir must not be empty".into()));
        }
        if self.skills.debounce_ms == 0 || self.skills.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Invalid(format!(
                "skills.debounce_ms must be between 1 and {MAX_DEBOUNCE_MS}, got {}",
                self.skills.debounce_ms
            )));
        }
        if self.matching.name_weight == 0 {
            return Err(ConfigError::Invalid("matching.name_weight must be greater than zero".into()));
        }
        Ok(())
    }
}

/// Priority: `--config` flag > `SKILLDECK_CONFIG` env > `.skilldeck/config.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("SKILLDECK_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CONFIG_PATH)
}
