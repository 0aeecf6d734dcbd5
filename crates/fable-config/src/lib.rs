//! Fable Config
//!
//! Serializable configuration for the fable orchestrator. Every field has a
//! default, so an empty JSON object (or no file at all) is a valid
//! configuration.
//!
//! Configuration can be loaded from:
//! - a JSON file (via CLI with `--config=fable.json`)
//! - `<data_dir>/config.json`
//!
//! The `GEMINI_API_KEY` environment variable overrides the configured key.

mod executor;
mod generation;
mod load;
mod story;

pub use executor::{ExecutorConfig, SchedulingMode};
pub use generation::GenerationConfig;
pub use load::ConfigError;
pub use story::StoryConfig;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FableConfig {
  pub executor: ExecutorConfig,
  pub generation: GenerationConfig,
  pub story: StoryConfig,
}
