use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use fable_config::StoryConfig;
use fable_llm::TextGenerator;
use fable_store::Store;
use fable_task::{Output, Params};

use crate::error::{CapabilityError, DispatchError};
use crate::kind::CapabilityKind;
use crate::{EmotionDetector, Illustrator, Memory, Storyteller};

/// A component exposing a fixed set of invocable actions.
#[async_trait]
pub trait Capability: Send + Sync {
  fn kind(&self) -> CapabilityKind;

  /// Action names accepted by [`Capability::invoke`].
  fn actions(&self) -> &'static [&'static str];

  async fn invoke(&self, action: &str, params: Params) -> Result<Output, CapabilityError>;
}

/// Maps capability kinds to their implementation.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
  capabilities: HashMap<CapabilityKind, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registry with every built-in capability. No transcriber is included.
  pub fn with_defaults(
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn Store>,
    story: StoryConfig,
  ) -> Self {
    let mut registry = Self::new();
    registry.register(EmotionDetector::new(
      generator.clone(),
      story.emotion_alert_threshold,
    ));
    registry.register(Memory::new(store));
    registry.register(Storyteller::new(generator.clone(), story));
    registry.register(Illustrator::new(generator));
    registry
  }

  /// Register a capability under its own kind, replacing any previous one.
  pub fn register<C: Capability + 'static>(&mut self, capability: C) -> &mut Self {
    self.register_arc(Arc::new(capability))
  }

  pub fn register_arc(&mut self, capability: Arc<dyn Capability>) -> &mut Self {
    self.capabilities.insert(capability.kind(), capability);
    self
  }

  pub fn get(&self, kind: CapabilityKind) -> Option<&Arc<dyn Capability>> {
    self.capabilities.get(&kind)
  }

  /// Registered kinds, in enumeration order.
  pub fn kinds(&self) -> Vec<CapabilityKind> {
    let mut kinds: Vec<_> = self.capabilities.keys().copied().collect();
    kinds.sort();
    kinds
  }

  /// Resolve a capability name and check that it exposes `action`.
  pub fn resolve(&self, capability: &str, action: &str) -> Result<Arc<dyn Capability>, DispatchError> {
    let kind: CapabilityKind = capability.parse()?;
    let found = self
      .capabilities
      .get(&kind)
      .ok_or(DispatchError::NotRegistered(kind))?;

    if !found.actions().contains(&action) {
      return Err(DispatchError::UnknownAction {
        capability: kind,
        action: action.to_string(),
      });
    }
    Ok(found.clone())
  }
}
