use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::FableConfig;

/// Environment variable that overrides `generation.api_key`.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file '{path}': {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config file '{path}': {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("invalid config: {message}")]
  Invalid { message: String },
}

impl FableConfig {
  /// Parse a configuration from a JSON string.
  pub fn from_json(content: &str, origin: &Path) -> Result<Self, ConfigError> {
    let config: FableConfig =
      serde_json::from_str(content).map_err(|source| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
      })?;
    config.validate()?;
    Ok(config)
  }

  /// Load a configuration file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json(&content, path)
  }

  /// Load `path` if it exists, otherwise fall back to defaults.
  pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
    if path.exists() {
      Self::load(path)
    } else {
      Ok(Self::default())
    }
  }

  /// Apply environment overrides (currently the API key).
  pub fn with_env_overrides(self) -> Self {
    self.with_api_key_override(std::env::var(API_KEY_ENV).ok())
  }

  fn with_api_key_override(mut self, key: Option<String>) -> Self {
    if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
      self.generation.api_key = Some(key);
    }
    self
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if self.story.min_scenes > self.story.max_scenes {
      return Err(ConfigError::Invalid {
        message: format!(
          "story.min_scenes ({}) exceeds story.max_scenes ({})",
          self.story.min_scenes, self.story.max_scenes
        ),
      });
    }
    if self.executor.max_concurrency == 0 {
      return Err(ConfigError::Invalid {
        message: "executor.max_concurrency must be at least 1".to_string(),
      });
    }
    Ok(())
  }
}
