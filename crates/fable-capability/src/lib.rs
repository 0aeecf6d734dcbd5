//! Fable Capability
//!
//! The invocation contract between the executor and the components that do
//! the actual work. A [`Capability`] exposes a fixed set of actions, each
//! taking a JSON parameter map and returning a JSON output map. The
//! [`CapabilityRegistry`] maps the closed [`CapabilityKind`] enumeration to
//! implementations.
//!
//! Built-in capabilities:
//! - [`Storyteller`]: `generate_story`
//! - [`EmotionDetector`]: `analyze_emotion`
//! - [`Illustrator`]: `create_scene_images`, `generate_character_avatar`
//! - [`Memory`]: `get_child_context`, `get_emotional_history`

mod emotion;
mod error;
mod illustrator;
mod kind;
mod memory;
mod params;
mod prompts;
mod registry;
mod storyteller;

pub use emotion::{
  EmotionAlert, EmotionAssessment, EmotionDetector, EmotionScores, Sentiment, Severity,
};
pub use error::{CapabilityError, DispatchError};
pub use illustrator::{CharacterAvatar, Illustrator, SceneImage, SceneImages};
pub use kind::CapabilityKind;
pub use memory::{
  ChildContext, ChildPreferences, EmotionalHistory, Memory, SessionSummary, StorySummary,
};
pub use registry::{Capability, CapabilityRegistry};
pub use storyteller::{Scene, Story, StoryInput, Storyteller};
