//! Test capabilities with scripted behaviour and a shared call log.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fable_capability::{Capability, CapabilityError, CapabilityKind};
use fable_task::{Output, Params};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct Call {
  pub capability: CapabilityKind,
  pub action: String,
  pub params: Params,
}

/// Calls and in-flight invocations shared by every fake in a test.
#[derive(Clone, Default)]
pub struct Probe {
  calls: Arc<Mutex<Vec<Call>>>,
  in_flight: Arc<AtomicUsize>,
  peak: Arc<AtomicUsize>,
}

impl Probe {
  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  pub fn kinds(&self) -> Vec<CapabilityKind> {
    self.calls().into_iter().map(|c| c.capability).collect()
  }

  pub fn params_of(&self, kind: CapabilityKind) -> Params {
    self
      .calls()
      .into_iter()
      .find(|c| c.capability == kind)
      .map(|c| c.params)
      .expect("capability was never invoked")
  }

  /// Highest number of invocations that were running at the same time.
  pub fn peak(&self) -> usize {
    self.peak.load(Ordering::SeqCst)
  }
}

#[derive(Clone)]
enum Behavior {
  Reply(Output),
  Fail,
  Panic,
}

pub struct FakeCapability {
  kind: CapabilityKind,
  actions: &'static [&'static str],
  behavior: Behavior,
  delay: Duration,
  probe: Probe,
}

impl FakeCapability {
  pub fn new(kind: CapabilityKind, actions: &'static [&'static str], probe: &Probe) -> Self {
    Self {
      kind,
      actions,
      behavior: Behavior::Reply(Output::new()),
      delay: Duration::ZERO,
      probe: probe.clone(),
    }
  }

  pub fn replying(mut self, output: Value) -> Self {
    let Value::Object(map) = output else {
      panic!("fake output must be an object");
    };
    self.behavior = Behavior::Reply(map);
    self
  }

  pub fn failing(mut self) -> Self {
    self.behavior = Behavior::Fail;
    self
  }

  pub fn panicking(mut self) -> Self {
    self.behavior = Behavior::Panic;
    self
  }

  pub fn delayed(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }
}

#[async_trait]
impl Capability for FakeCapability {
  fn kind(&self) -> CapabilityKind {
    self.kind
  }

  fn actions(&self) -> &'static [&'static str] {
    self.actions
  }

  async fn invoke(&self, action: &str, params: Params) -> Result<Output, CapabilityError> {
    self.probe.calls.lock().unwrap().push(Call {
      capability: self.kind,
      action: action.to_string(),
      params,
    });

    let running = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.probe.peak.fetch_max(running, Ordering::SeqCst);

    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);

    match &self.behavior {
      Behavior::Reply(output) => Ok(output.clone()),
      Behavior::Fail => Err(CapabilityError::InvalidOutput {
        message: format!("{} failed", self.kind),
      }),
      Behavior::Panic => panic!("{} exploded", self.kind),
    }
  }
}

pub const TRANSCRIBER_ACTIONS: &[&str] = &["transcribe_audio"];
pub const EMOTION_ACTIONS: &[&str] = &["analyze_emotion"];
pub const MEMORY_ACTIONS: &[&str] = &["get_child_context", "get_emotional_history"];
pub const STORYTELLER_ACTIONS: &[&str] = &["generate_story"];
pub const ILLUSTRATOR_ACTIONS: &[&str] = &["create_scene_images", "generate_character_avatar"];

pub fn transcriber(probe: &Probe) -> FakeCapability {
  FakeCapability::new(CapabilityKind::Transcriber, TRANSCRIBER_ACTIONS, probe)
}

pub fn emotion(probe: &Probe) -> FakeCapability {
  FakeCapability::new(CapabilityKind::EmotionDetector, EMOTION_ACTIONS, probe)
}

pub fn memory(probe: &Probe) -> FakeCapability {
  FakeCapability::new(CapabilityKind::Memory, MEMORY_ACTIONS, probe)
}

pub fn storyteller(probe: &Probe) -> FakeCapability {
  FakeCapability::new(CapabilityKind::Storyteller, STORYTELLER_ACTIONS, probe)
}

pub fn illustrator(probe: &Probe) -> FakeCapability {
  FakeCapability::new(CapabilityKind::Illustrator, ILLUSTRATOR_ACTIONS, probe)
}
