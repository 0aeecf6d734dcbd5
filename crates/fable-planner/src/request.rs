use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single story-creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRequest {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub audio_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub text_input: Option<String>,
  pub child_id: String,
  #[serde(default = "default_mood")]
  pub session_mood: String,
  #[serde(default)]
  pub educational_focus: Vec<String>,
  #[serde(default)]
  pub include_elements: Vec<String>,
  #[serde(default = "empty_object")]
  pub audio_features: Value,
}

fn default_mood() -> String {
  "neutral".to_string()
}

fn empty_object() -> Value {
  Value::Object(Map::new())
}

impl StoryRequest {
  pub fn from_text(child_id: impl Into<String>, text: impl Into<String>) -> Self {
    Self {
      audio_url: None,
      text_input: Some(text.into()),
      child_id: child_id.into(),
      session_mood: default_mood(),
      educational_focus: Vec::new(),
      include_elements: Vec::new(),
      audio_features: empty_object(),
    }
  }

  pub fn from_audio(child_id: impl Into<String>, audio_url: impl Into<String>) -> Self {
    Self {
      audio_url: Some(audio_url.into()),
      text_input: None,
      ..Self::from_text(child_id, "")
    }
  }

  /// Audio URL, if present and non-empty.
  pub fn audio(&self) -> Option<&str> {
    self.audio_url.as_deref().filter(|url| !url.is_empty())
  }

  /// Text input, or `""` when absent.
  pub fn text(&self) -> &str {
    self.text_input.as_deref().unwrap_or_default()
  }

  /// True when the request carries text or audio to build a story from.
  pub fn has_input(&self) -> bool {
    self.audio().is_some() || !self.text().trim().is_empty()
  }
}
