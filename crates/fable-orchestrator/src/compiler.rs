use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::report::ExecutionReport;

pub const NARRATIVE_KEY: &str = "storyteller_generate_story";
pub const EMOTION_KEY: &str = "emotion_detector_analyze_emotion";
pub const ILLUSTRATIONS_KEY: &str = "illustrator_create_scene_images";

/// The final response for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
  pub status: String,
  /// RFC 3339, UTC.
  pub timestamp: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub narrative: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub emotion_assessment: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub illustrations: Option<Value>,
}

impl ResponseRecord {
  /// Id of the produced narrative, if any.
  pub fn story_id(&self) -> Option<&str> {
    self.narrative.as_ref()?.get("id")?.as_str()
  }
}

/// Extracts the well-known outputs of a batch into a [`ResponseRecord`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultCompiler;

impl ResultCompiler {
  pub fn compile(&self, report: &ExecutionReport) -> ResponseRecord {
    let field = |key: &str| {
      report
        .outcome_for(key)
        .and_then(|outcome| outcome.output())
        .map(|output| Value::Object(output.clone()))
    };

    ResponseRecord {
      status: "complete".to_string(),
      timestamp: Utc::now(),
      narrative: field(NARRATIVE_KEY),
      emotion_assessment: field(EMOTION_KEY),
      illustrations: field(ILLUSTRATIONS_KEY),
    }
  }
}
