use std::sync::Arc;

use async_trait::async_trait;
use fable_llm::{GenerationOptions, TextGenerator};
use fable_task::{Output, Params};
use minijinja::context;
use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;
use crate::kind::CapabilityKind;
use crate::params::{self, actions};
use crate::prompts;
use crate::registry::Capability;

actions!(EmotionAction, CapabilityKind::EmotionDetector, {
  AnalyzeEmotion => "analyze_emotion",
});

/// Emotion scores, each in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionScores {
  pub happiness: f64,
  pub sadness: f64,
  pub fear: f64,
  pub anger: f64,
  pub surprise: f64,
  pub neutral: f64,
}

impl EmotionScores {
  pub fn neutral() -> Self {
    Self {
      neutral: 1.0,
      ..Self::default()
    }
  }

  fn clamped(self) -> Self {
    let c = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
    Self {
      happiness: c(self.happiness),
      sadness: c(self.sadness),
      fear: c(self.fear),
      anger: c(self.anger),
      surprise: c(self.surprise),
      neutral: c(self.neutral),
    }
  }

  /// Raise scores for the mood the child picked.
  pub fn adjusted_for_mood(self, mood: &str) -> Self {
    let bump = |v: f64, by: f64| (v + by).min(1.0);
    let mut scores = self;
    match mood {
      "happy" => scores.happiness = bump(scores.happiness, 0.2),
      "sad" => scores.sadness = bump(scores.sadness, 0.2),
      "angry" => scores.anger = bump(scores.anger, 0.2),
      "scared" => scores.fear = bump(scores.fear, 0.2),
      "excited" => {
        scores.happiness = bump(scores.happiness, 0.15);
        scores.surprise = bump(scores.surprise, 0.1);
      }
      _ => {}
    }
    scores
  }

  pub fn sentiment(&self) -> Sentiment {
    if self.happiness > 0.6 {
      Sentiment::Positive
    } else if self.sadness > 0.5 || self.fear > 0.5 || self.anger > 0.5 {
      Sentiment::Negative
    } else if self.happiness > 0.3 {
      Sentiment::MixedPositive
    } else {
      Sentiment::Neutral
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
  Positive,
  Negative,
  MixedPositive,
  Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
  Medium,
  High,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmotionAlert {
  pub emotion: &'static str,
  pub severity: Severity,
  pub value: f64,
  pub message: &'static str,
  pub recommendation: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmotionAssessment {
  pub emotions: EmotionScores,
  pub mood: String,
  pub overall_sentiment: Sentiment,
  pub alerts: Vec<EmotionAlert>,
  pub requires_parent_review: bool,
}

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
  #[serde(default)]
  text: Option<String>,
  /// Transcript injected by an upstream transcription task.
  #[serde(default)]
  input_text: Option<String>,
  #[serde(default = "default_mood")]
  mood: String,
}

fn default_mood() -> String {
  "neutral".to_string()
}

/// Scores the emotional content of a child's input.
pub struct EmotionDetector {
  generator: Arc<dyn TextGenerator>,
  alert_threshold: f64,
}

impl EmotionDetector {
  pub fn new(generator: Arc<dyn TextGenerator>, alert_threshold: f64) -> Self {
    Self {
      generator,
      alert_threshold,
    }
  }

  pub async fn analyze(&self, text: &str, mood: &str) -> Result<EmotionAssessment, CapabilityError> {
    let emotions = self.score_text(text).await?.adjusted_for_mood(mood);
    let alerts = self.alerts(&emotions);

    tracing::debug!(
      sentiment = ?emotions.sentiment(),
      alerts = alerts.len(),
      "emotion_analyzed"
    );

    Ok(EmotionAssessment {
      overall_sentiment: emotions.sentiment(),
      requires_parent_review: !alerts.is_empty(),
      emotions,
      mood: mood.to_string(),
      alerts,
    })
  }

  async fn score_text(&self, text: &str) -> Result<EmotionScores, CapabilityError> {
    if text.trim().is_empty() {
      return Ok(EmotionScores::neutral());
    }

    let prompt = prompts::render(prompts::EMOTION, context! { text => text })?;
    match self
      .generator
      .generate(&prompt, GenerationOptions::json(0.2, 200))
      .await
    {
      Ok(reply) => Ok(parse_scores(&reply).unwrap_or_else(|| {
        tracing::warn!("unparseable emotion scores, using neutral");
        EmotionScores::neutral()
      })),
      Err(e) => {
        tracing::warn!(error = %e, "emotion scoring failed, using neutral");
        Ok(EmotionScores::neutral())
      }
    }
  }

  fn alerts(&self, scores: &EmotionScores) -> Vec<EmotionAlert> {
    let checks = [
      (
        "sadness",
        scores.sadness,
        Severity::Medium,
        "Child expressed significant sadness",
        "Consider talking with your child about their feelings",
      ),
      (
        "fear",
        scores.fear,
        Severity::High,
        "Child expressed fear or anxiety",
        "Provide reassurance and discuss their concerns",
      ),
      (
        "anger",
        scores.anger,
        Severity::Medium,
        "Child expressed anger or frustration",
        "Help your child identify triggers and coping strategies",
      ),
    ];

    checks
      .into_iter()
      .filter(|(_, value, ..)| *value > self.alert_threshold)
      .map(|(emotion, value, severity, message, recommendation)| EmotionAlert {
        emotion,
        severity,
        value,
        message,
        recommendation,
      })
      .collect()
  }
}

/// Pull the first JSON object out of a reply, tolerating code fences and
/// surrounding prose.
fn parse_scores(reply: &str) -> Option<EmotionScores> {
  let start = reply.find('{')?;
  let end = reply.rfind('}')?;
  if end < start {
    return None;
  }
  serde_json::from_str::<EmotionScores>(&reply[start..=end])
    .ok()
    .map(EmotionScores::clamped)
}

#[async_trait]
impl Capability for EmotionDetector {
  fn kind(&self) -> CapabilityKind {
    CapabilityKind::EmotionDetector
  }

  fn actions(&self) -> &'static [&'static str] {
    EmotionAction::NAMES
  }

  async fn invoke(&self, action: &str, params: Params) -> Result<Output, CapabilityError> {
    match EmotionAction::parse(action)? {
      EmotionAction::AnalyzeEmotion => {
        let input: AnalyzeParams = params::parse(params)?;
        let text = input
          .text
          .filter(|t| !t.trim().is_empty())
          .or(input.input_text)
          .unwrap_or_default();
        params::into_output(&self.analyze(&text, &input.mood).await?)
      }
    }
  }
}
