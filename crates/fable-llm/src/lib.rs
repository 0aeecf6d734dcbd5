//! Fable LLM
//!
//! The [`TextGenerator`] trait is the only contract capabilities depend on:
//! a prompt plus [`GenerationOptions`] in, generated text out. Two backends
//! are provided:
//!
//! - [`GeminiGenerator`]: hosted Gemini `generateContent` API over reqwest
//! - [`CannedGenerator`]: offline replies, used when no API key is configured
//!
//! With the `test-util` feature, `ScriptedGenerator` answers from a list of
//! rules and records every prompt, for tests.

mod canned;
mod error;
mod gemini;
#[cfg(any(test, feature = "test-util"))]
mod scripted;

pub use canned::CannedGenerator;
pub use error::GenerationError;
pub use gemini::GeminiGenerator;
#[cfg(any(test, feature = "test-util"))]
pub use scripted::ScriptedGenerator;

use std::sync::Arc;

use async_trait::async_trait;
use fable_config::GenerationConfig;

/// Shape of the text the caller expects back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
  #[default]
  Text,
  Json,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
  pub temperature: f32,
  pub max_output_tokens: u32,
  pub format: ResponseFormat,
}

impl GenerationOptions {
  pub fn text(temperature: f32, max_output_tokens: u32) -> Self {
    Self {
      temperature,
      max_output_tokens,
      format: ResponseFormat::Text,
    }
  }

  pub fn json(temperature: f32, max_output_tokens: u32) -> Self {
    Self {
      temperature,
      max_output_tokens,
      format: ResponseFormat::Json,
    }
  }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
  async fn generate(
    &self,
    prompt: &str,
    options: GenerationOptions,
  ) -> Result<String, GenerationError>;
}

/// Build the generator selected by configuration.
///
/// Without an API key the offline [`CannedGenerator`] is returned.
pub fn from_config(config: &GenerationConfig) -> Result<Arc<dyn TextGenerator>, GenerationError> {
  match &config.api_key {
    Some(key) => {
      let generator = GeminiGenerator::new(
        key.clone(),
        config.model.clone(),
        config.endpoint.clone(),
        config.timeout_secs,
      )?;
      Ok(Arc::new(generator))
    }
    None => {
      tracing::warn!("no generation api key configured, using offline generator");
      Ok(Arc::new(CannedGenerator::new()))
    }
  }
}
