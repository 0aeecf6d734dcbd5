use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fable_config::StoryConfig;
use fable_llm::{GenerationOptions, TextGenerator};
use fable_task::{Output, Params};
use minijinja::context;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::emotion::EmotionScores;
use crate::error::CapabilityError;
use crate::kind::CapabilityKind;
use crate::memory::ChildPreferences;
use crate::params::{self, actions};
use crate::prompts;
use crate::registry::Capability;

const HAPPY_ENDING: &str = "And they all lived happily ever after!";
const HAPPY_ENDING_PROMPT: &str = "Happy ending with all characters celebrating together";

actions!(StorytellerAction, CapabilityKind::Storyteller, {
  GenerateStory => "generate_story",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
  pub scene_number: usize,
  pub text: String,
  pub image_prompt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoryMetadata {
  pub input_text: String,
  pub educational_focus: Vec<String>,
  pub include_elements: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub emotion_context: Option<EmotionScores>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Story {
  pub id: String,
  pub child_id: String,
  pub title: String,
  pub scenes: Vec<Scene>,
  pub metadata: StoryMetadata,
  pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct StoryInput {
  #[serde(default)]
  pub input_text: Option<String>,
  pub child_id: String,
  #[serde(default)]
  pub preferences: ChildPreferences,
  #[serde(default)]
  pub educational_focus: Vec<String>,
  #[serde(default)]
  pub include_elements: Vec<String>,
  #[serde(default)]
  pub emotion_context: Option<EmotionScores>,
}

/// Generates personalized multi-scene stories.
pub struct Storyteller {
  generator: Arc<dyn TextGenerator>,
  config: StoryConfig,
}

impl Storyteller {
  pub fn new(generator: Arc<dyn TextGenerator>, config: StoryConfig) -> Self {
    Self { generator, config }
  }

  pub async fn generate_story(&self, input: StoryInput) -> Result<Story, CapabilityError> {
    if input.child_id.trim().is_empty() {
      return Err(CapabilityError::invalid_param("child_id", "must not be empty"));
    }

    let input_text = input.input_text.unwrap_or_default();
    let prompt = prompts::render(
      prompts::STORY,
      context! {
        age => input.preferences.age,
        input_text => &input_text,
        favorite_characters => &input.preferences.favorite_characters,
        educational_focus => &input.educational_focus,
        include_elements => &input.include_elements,
        emotion_note => input.emotion_context.as_ref().and_then(emotion_note),
        scene_count => self.config.min_scenes,
      },
    )?;

    tracing::info!(child_id = %input.child_id, "story_generation_started");
    let reply = self
      .generator
      .generate(&prompt, GenerationOptions::text(0.8, 2000))
      .await?;

    let scenes = self.parse_scenes(&reply);
    let title = extract_title(&reply).unwrap_or_else(|| fallback_title(&scenes).to_string());

    tracing::info!(title = %title, scenes = scenes.len(), "story_generated");

    Ok(Story {
      id: Uuid::new_v4().to_string(),
      child_id: input.child_id,
      title,
      scenes,
      metadata: StoryMetadata {
        input_text,
        educational_focus: input.educational_focus,
        include_elements: input.include_elements,
        emotion_context: input.emotion_context,
        created_at: Utc::now(),
      },
      status: "complete",
    })
  }

  /// Split a reply into scenes on `Scene N:` lines, padded to the minimum
  /// with a happy ending and capped at the maximum.
  fn parse_scenes(&self, reply: &str) -> Vec<Scene> {
    let mut texts: Vec<String> = Vec::new();

    for line in reply.lines().map(str::trim) {
      if line.is_empty() || line.starts_with("Title:") {
        continue;
      }
      if line.starts_with("Scene ") {
        let text = line.split_once(':').map(|(_, rest)| rest.trim()).unwrap_or("");
        texts.push(text.to_string());
      } else if let Some(current) = texts.last_mut() {
        if !current.is_empty() {
          current.push(' ');
        }
        current.push_str(line);
      }
    }

    let mut scenes: Vec<Scene> = texts
      .into_iter()
      .enumerate()
      .map(|(i, text)| Scene {
        scene_number: i + 1,
        image_prompt: image_prompt(&text),
        text,
      })
      .collect();

    while scenes.len() < self.config.min_scenes {
      scenes.push(Scene {
        scene_number: scenes.len() + 1,
        text: HAPPY_ENDING.to_string(),
        image_prompt: HAPPY_ENDING_PROMPT.to_string(),
      });
    }
    scenes.truncate(self.config.max_scenes);
    scenes
  }
}

fn emotion_note(scores: &EmotionScores) -> Option<&'static str> {
  if scores.sadness > 0.5 {
    Some("The child seems sad, so make the story uplifting and reassuring with positive outcomes.")
  } else if scores.fear > 0.5 {
    Some("The child seems worried, so make the story calming and safe with brave characters.")
  } else if scores.happiness > 0.7 {
    Some("The child is excited, so make the story adventurous and fun!")
  } else {
    None
  }
}

fn image_prompt(scene_text: &str) -> String {
  let excerpt: String = scene_text.chars().take(100).collect();
  format!(
    "Children's book illustration: {excerpt}... Soft, colorful, friendly watercolor style for kids."
  )
}

fn extract_title(reply: &str) -> Option<String> {
  reply
    .lines()
    .map(str::trim)
    .find_map(|line| line.strip_prefix("Title:"))
    .map(|title| title.trim().to_string())
    .filter(|title| !title.is_empty())
}

fn fallback_title(scenes: &[Scene]) -> &'static str {
  let first = scenes
    .first()
    .map(|s| s.text.to_lowercase())
    .unwrap_or_default();

  if first.contains("adventure") {
    "The Great Adventure"
  } else if first.contains("friend") {
    "A Special Friendship"
  } else if first.contains("magic") {
    "The Magical Journey"
  } else {
    "My Special Story"
  }
}

#[async_trait]
impl Capability for Storyteller {
  fn kind(&self) -> CapabilityKind {
    CapabilityKind::Storyteller
  }

  fn actions(&self) -> &'static [&'static str] {
    StorytellerAction::NAMES
  }

  async fn invoke(&self, action: &str, params: Params) -> Result<Output, CapabilityError> {
    match StorytellerAction::parse(action)? {
      StorytellerAction::GenerateStory => {
        let input: StoryInput = params::parse(params)?;
        params::into_output(&self.generate_story(input).await?)
      }
    }
  }
}
