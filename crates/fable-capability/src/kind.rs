use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// The closed set of capabilities a task can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
  Transcriber,
  EmotionDetector,
  Memory,
  Storyteller,
  Illustrator,
}

impl CapabilityKind {
  pub const ALL: [CapabilityKind; 5] = [
    CapabilityKind::Transcriber,
    CapabilityKind::EmotionDetector,
    CapabilityKind::Memory,
    CapabilityKind::Storyteller,
    CapabilityKind::Illustrator,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      CapabilityKind::Transcriber => "transcriber",
      CapabilityKind::EmotionDetector => "emotion_detector",
      CapabilityKind::Memory => "memory",
      CapabilityKind::Storyteller => "storyteller",
      CapabilityKind::Illustrator => "illustrator",
    }
  }
}

impl fmt::Display for CapabilityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for CapabilityKind {
  type Err = DispatchError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    CapabilityKind::ALL
      .into_iter()
      .find(|kind| kind.name() == s)
      .ok_or_else(|| DispatchError::UnknownCapability(s.to_string()))
  }
}
