//! Fable Planner
//!
//! Turns a [`StoryRequest`] into an ordered batch of [`Task`]s with their
//! dependencies wired:
//!
//! ```text
//! transcribe_audio (only with audio)
//!        |
//! analyze_emotion    get_child_context
//!          \            /
//!           generate_story
//!                 |
//!         create_scene_images
//! ```
//!
//! Planning never invokes a capability.

mod request;

pub use request::StoryRequest;

use fable_capability::CapabilityKind;
use fable_task::{Params, Task};
use serde_json::{Value, json};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
  #[error("malformed story request: {0}")]
  Malformed(#[from] serde_json::Error),
}

/// Builds task batches for story requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Planner;

impl Planner {
  pub fn new() -> Self {
    Self
  }

  /// Plan an untyped request. Fails before any task exists when the request
  /// is malformed (for example without a `child_id`).
  pub fn plan_value(&self, request: Value) -> Result<Vec<Task>, PlanningError> {
    let request: StoryRequest = serde_json::from_value(request)?;
    Ok(self.plan(&request))
  }

  pub fn plan(&self, request: &StoryRequest) -> Vec<Task> {
    let mut tasks = Vec::with_capacity(5);

    let transcribe = request.audio().map(|audio_url| {
      Task::new(
        CapabilityKind::Transcriber.name(),
        "transcribe_audio",
        params(json!({ "audio_url": audio_url })),
        1,
      )
    });

    let mut emotion = Task::new(
      CapabilityKind::EmotionDetector.name(),
      "analyze_emotion",
      params(json!({
        "text": request.text(),
        "mood": request.session_mood,
        "audio_features": request.audio_features,
      })),
      2,
    );
    if let Some(transcribe) = &transcribe {
      emotion = emotion.with_dependencies([transcribe.id.clone()]);
    }

    let memory = Task::new(
      CapabilityKind::Memory.name(),
      "get_child_context",
      params(json!({ "child_id": request.child_id })),
      2,
    );

    let story = Task::new(
      CapabilityKind::Storyteller.name(),
      "generate_story",
      params(json!({
        "input_text": request.text(),
        "child_id": request.child_id,
        "preferences": {},
        "educational_focus": request.educational_focus,
        "include_elements": request.include_elements,
      })),
      3,
    )
    .with_dependencies([emotion.id.clone(), memory.id.clone()]);

    let illustrate = Task::new(
      CapabilityKind::Illustrator.name(),
      "create_scene_images",
      params(json!({ "story_id": null })),
      4,
    )
    .with_dependencies([story.id.clone()]);

    tasks.extend(transcribe);
    tasks.extend([emotion, memory, story, illustrate]);

    info!(child_id = %request.child_id, tasks = tasks.len(), "plan_created");
    for task in &tasks {
      debug!(
        task_id = %task.id,
        task = %task.composite_key(),
        priority = task.priority,
        "planned_task"
      );
    }

    tasks
  }
}

fn params(value: Value) -> Params {
  match value {
    Value::Object(map) => map,
    _ => Params::new(),
  }
}
