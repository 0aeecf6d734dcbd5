use std::sync::Mutex;

use async_trait::async_trait;

use crate::{GenerationError, GenerationOptions, TextGenerator};

enum Reply {
  Text(String),
  Unavailable,
}

struct Rule {
  needle: String,
  reply: Reply,
}

/// Rule-driven generator for tests.
///
/// The first rule whose needle occurs in the prompt decides the reply.
/// Prompts that match no rule get the fallback, or a rejection when no
/// fallback is set. Every prompt is recorded.
#[derive(Default)]
pub struct ScriptedGenerator {
  rules: Vec<Rule>,
  fallback: Option<String>,
  prompts: Mutex<Vec<(String, GenerationOptions)>>,
}

impl ScriptedGenerator {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reply with `reply` when the prompt contains `needle`.
  pub fn on(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
    self.rules.push(Rule {
      needle: needle.into(),
      reply: Reply::Text(reply.into()),
    });
    self
  }

  /// Fail with a transient error when the prompt contains `needle`.
  pub fn fail_on(mut self, needle: impl Into<String>) -> Self {
    self.rules.push(Rule {
      needle: needle.into(),
      reply: Reply::Unavailable,
    });
    self
  }

  pub fn otherwise(mut self, reply: impl Into<String>) -> Self {
    self.fallback = Some(reply.into());
    self
  }

  /// Prompts received so far, in call order.
  pub fn prompts(&self) -> Vec<(String, GenerationOptions)> {
    match self.prompts.lock() {
      Ok(prompts) => prompts.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
  async fn generate(
    &self,
    prompt: &str,
    options: GenerationOptions,
  ) -> Result<String, GenerationError> {
    match self.prompts.lock() {
      Ok(mut prompts) => prompts.push((prompt.to_string(), options)),
      Err(poisoned) => poisoned.into_inner().push((prompt.to_string(), options)),
    }

    let rule = self.rules.iter().find(|r| prompt.contains(&r.needle));
    match (rule, &self.fallback) {
      (Some(Rule { reply: Reply::Text(text), .. }), _) => Ok(text.clone()),
      (Some(Rule { reply: Reply::Unavailable, needle }), _) => Err(GenerationError::Transient {
        message: format!("scripted outage for '{needle}'"),
      }),
      (None, Some(fallback)) => Ok(fallback.clone()),
      (None, None) => Err(GenerationError::Rejected {
        status: 400,
        message: "no scripted reply for prompt".to_string(),
      }),
    }
  }
}
