use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
  pub min_scenes: usize,
  pub max_scenes: usize,
  /// Negative emotion score above which a session is flagged for review.
  pub emotion_alert_threshold: f64,
}

impl Default for StoryConfig {
  fn default() -> Self {
    Self {
      min_scenes: 5,
      max_scenes: 7,
      emotion_alert_threshold: 0.8,
    }
  }
}
