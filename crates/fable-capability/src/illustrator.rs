use std::sync::Arc;

use async_trait::async_trait;
use fable_llm::{GenerationOptions, TextGenerator};
use fable_task::{Output, Params};
use minijinja::context;
use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;
use crate::kind::CapabilityKind;
use crate::memory::ChildPreferences;
use crate::params::{self, actions};
use crate::prompts;
use crate::registry::Capability;
use crate::storyteller::Scene;

const PROMPT_PREFIX: &str = "Children's book illustration:";
const THUMBNAIL_COLORS: [&str; 5] = ["FFB6C1", "98FB98", "87CEEB", "DDA0DD", "F0E68C"];

actions!(IllustratorAction, CapabilityKind::Illustrator, {
  CreateSceneImages => "create_scene_images",
  GenerateCharacterAvatar => "generate_character_avatar",
});

#[derive(Debug, Clone, Serialize)]
pub struct SceneImage {
  pub scene_number: usize,
  pub prompt: String,
  pub image_url: String,
  pub thumbnail_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneImages {
  pub story_id: Option<String>,
  pub images: Vec<SceneImage>,
  pub status: &'static str,
  pub total_images: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CharacterAvatar {
  pub character: String,
  pub prompt: String,
  pub avatar_url: String,
  pub style: &'static str,
}

#[derive(Debug, Deserialize)]
struct SceneImagesParams {
  #[serde(default)]
  story_id: Option<String>,
  #[serde(default)]
  scenes: Option<Vec<Scene>>,
}

#[derive(Debug, Deserialize)]
struct AvatarParams {
  character: String,
  #[serde(default)]
  preferences: ChildPreferences,
}

/// Turns story scenes into illustration prompts and placeholder images.
pub struct Illustrator {
  generator: Arc<dyn TextGenerator>,
}

impl Illustrator {
  pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
    Self { generator }
  }

  pub async fn create_scene_images(
    &self,
    story_id: Option<String>,
    scenes: &[Scene],
  ) -> Result<SceneImages, CapabilityError> {
    tracing::info!(story_id = ?story_id, scenes = scenes.len(), "scene_images_started");

    let mut images = Vec::with_capacity(scenes.len());
    for scene in scenes {
      let prompt = self.enhance_prompt(&scene.text).await?;
      images.push(SceneImage {
        scene_number: scene.scene_number,
        image_url: placeholder_url(scene.scene_number, &prompt),
        thumbnail_url: thumbnail_url(scene.scene_number),
        prompt,
      });
    }

    Ok(SceneImages {
      story_id,
      total_images: images.len(),
      images,
      status: "complete",
    })
  }

  pub async fn generate_character_avatar(
    &self,
    character: &str,
    preferences: &ChildPreferences,
  ) -> Result<CharacterAvatar, CapabilityError> {
    let colors = if preferences.favorite_colors.is_empty() {
      vec!["rainbow".to_string()]
    } else {
      preferences.favorite_colors.clone()
    };
    let request = prompts::render(
      prompts::CHARACTER,
      context! { character => character, age => preferences.age, colors => colors },
    )?;

    let prompt = match self
      .generator
      .generate(&request, GenerationOptions::text(0.6, 300))
      .await
    {
      Ok(design) => format!("Character design: {}", design.trim()),
      Err(e) => {
        tracing::warn!(error = %e, character = %character, "avatar prompt generation failed");
        format!(
          "Friendly {character} character with warm colors, kind expression, child-friendly cartoon style"
        )
      }
    };

    Ok(CharacterAvatar {
      character: character.to_string(),
      avatar_url: format!(
        "https://via.placeholder.com/200x200/FFE4E1/8B4513?text={}",
        url_text(character)
      ),
      prompt,
      style: "child-friendly cartoon",
    })
  }

  async fn enhance_prompt(&self, scene_text: &str) -> Result<String, CapabilityError> {
    let request = prompts::render(prompts::SCENE_IMAGE, context! { scene_text => scene_text })?;

    match self
      .generator
      .generate(&request, GenerationOptions::text(0.7, 200))
      .await
    {
      Ok(reply) => {
        let cleaned = reply.trim().trim_matches('"').trim();
        if cleaned.is_empty() {
          return Ok(fallback_prompt(scene_text));
        }
        Ok(if cleaned.starts_with(PROMPT_PREFIX) {
          cleaned.to_string()
        } else {
          format!("{PROMPT_PREFIX} {cleaned}")
        })
      }
      Err(e) => {
        tracing::warn!(error = %e, "prompt enhancement failed, using fallback");
        Ok(fallback_prompt(scene_text))
      }
    }
  }
}

fn fallback_prompt(scene_text: &str) -> String {
  let lower = scene_text.to_lowercase();
  let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

  let setting = if has(&["park", "playground"]) {
    "sunny park"
  } else if has(&["home", "house", "room"]) {
    "cozy home"
  } else if has(&["school", "classroom"]) {
    "bright classroom"
  } else if has(&["beach", "ocean", "sea"]) {
    "beautiful beach"
  } else {
    "magical forest"
  };

  let characters = if has(&["unicorn", "horse"]) {
    "a child with a magical unicorn"
  } else if has(&["dragon"]) {
    "a child with a friendly dragon"
  } else if has(&["friend"]) {
    "children playing together"
  } else {
    "a happy child"
  };

  let excerpt: String = scene_text.chars().take(50).collect();
  format!(
    "{PROMPT_PREFIX} {characters} in a {setting}. {excerpt}... Bright watercolor style, warm colors, child-friendly, whimsical and magical atmosphere."
  )
}

/// Query-safe text: alphanumerics kept, runs of anything else become `+`.
fn url_text(text: &str) -> String {
  text
    .split(|c: char| !c.is_alphanumeric())
    .filter(|word| !word.is_empty())
    .collect::<Vec<_>>()
    .join("+")
}

fn placeholder_url(scene_number: usize, prompt: &str) -> String {
  let description: String = prompt
    .trim_start_matches(PROMPT_PREFIX)
    .trim()
    .chars()
    .take(50)
    .collect();
  format!(
    "https://via.placeholder.com/800x600/FFE4E1/8B4513?text=Scene+{scene_number}:+{}",
    url_text(&description)
  )
}

fn thumbnail_url(scene_number: usize) -> String {
  let color = THUMBNAIL_COLORS[scene_number.saturating_sub(1) % THUMBNAIL_COLORS.len()];
  format!("https://via.placeholder.com/200x150/{color}/4A4A4A?text=Scene+{scene_number}")
}

#[async_trait]
impl Capability for Illustrator {
  fn kind(&self) -> CapabilityKind {
    CapabilityKind::Illustrator
  }

  fn actions(&self) -> &'static [&'static str] {
    IllustratorAction::NAMES
  }

  async fn invoke(&self, action: &str, params: Params) -> Result<Output, CapabilityError> {
    match IllustratorAction::parse(action)? {
      IllustratorAction::CreateSceneImages => {
        let input: SceneImagesParams = params::parse(params)?;
        let scenes = input.scenes.unwrap_or_default();
        params::into_output(&self.create_scene_images(input.story_id, &scenes).await?)
      }
      IllustratorAction::GenerateCharacterAvatar => {
        let input: AvatarParams = params::parse(params)?;
        params::into_output(
          &self
            .generate_character_avatar(&input.character, &input.preferences)
            .await?,
        )
      }
    }
  }
}
