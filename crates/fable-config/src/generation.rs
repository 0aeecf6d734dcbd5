use serde::{Deserialize, Serialize};

/// Hosted text-generation backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
  /// When absent, the offline canned generator is used.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub api_key: Option<String>,
  pub model: String,
  pub endpoint: String,
  pub timeout_secs: u64,
}

impl Default for GenerationConfig {
  fn default() -> Self {
    Self {
      api_key: None,
      model: "gemini-1.5-flash".to_string(),
      endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
      timeout_secs: 30,
    }
  }
}
