use async_trait::async_trait;

use crate::{GenerationError, GenerationOptions, ResponseFormat, TextGenerator};

const CANNED_STORY: &str = "\
Title: The Bunny Who Loved to Explore
Scene 1: Once upon a time in a magical forest, there lived a happy little bunny who loved to explore.
Scene 2: One morning the bunny found a shimmering path that led past the tallest trees.
Scene 3: Along the way the bunny met a friendly dragon who was too shy to say hello.
Scene 4: Together they counted the stars and shared stories until the moon came out.
Scene 5: The bunny and the dragon promised to explore the forest together every day.";

const NEUTRAL_SCORES: &str = r#"{"happiness":0.3,"sadness":0.1,"fear":0.1,"anger":0.1,"surprise":0.1,"neutral":0.3}"#;

/// Offline generator.
///
/// JSON requests get neutral emotion scores, story prompts (those asking
/// for a `Title:` line) get a fixed story, and any other prompt is answered
/// with its own last non-empty line.
#[derive(Debug, Default, Clone)]
pub struct CannedGenerator;

impl CannedGenerator {
  pub fn new() -> Self {
    Self
  }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
  async fn generate(
    &self,
    prompt: &str,
    options: GenerationOptions,
  ) -> Result<String, GenerationError> {
    if options.format == ResponseFormat::Json {
      return Ok(NEUTRAL_SCORES.to_string());
    }
    if prompt.contains("Title:") {
      return Ok(CANNED_STORY.to_string());
    }
    Ok(
      prompt
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string(),
    )
  }
}
