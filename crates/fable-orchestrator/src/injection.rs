//! Dependency injection: copying bound fields from upstream outputs into a
//! dependent task's parameters.

use fable_capability::CapabilityKind;
use fable_task::{Outcome, OutcomeMap, Params, TaskId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Upstream output field -> downstream parameter, optionally limited to one
/// consuming capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
  pub consumer: Option<CapabilityKind>,
  pub field: &'static str,
  pub param: &'static str,
}

impl Binding {
  const fn any(field: &'static str, param: &'static str) -> Self {
    Self {
      consumer: None,
      field,
      param,
    }
  }

  const fn for_consumer(consumer: CapabilityKind, field: &'static str, param: &'static str) -> Self {
    Self {
      consumer: Some(consumer),
      field,
      param,
    }
  }

  fn applies_to(&self, consumer: Option<CapabilityKind>) -> bool {
    self.consumer.is_none() || self.consumer == consumer
  }
}

pub const BINDINGS: &[Binding] = &[
  Binding::any("transcript", "input_text"),
  Binding::any("emotions", "emotion_context"),
  Binding::any("preferences", "preferences"),
  Binding::for_consumer(CapabilityKind::Illustrator, "scenes", "scenes"),
  Binding::for_consumer(CapabilityKind::Illustrator, "id", "story_id"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedBinding {
  pub from: TaskId,
  pub field: String,
  pub param: String,
}

/// What injection did for one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionReport {
  /// Bindings applied, in application order.
  pub applied: Vec<AppliedBinding>,
  /// Dependencies that failed, have no outcome, or carry no bound field.
  pub contributed_nothing: Vec<TaskId>,
}

impl InjectionReport {
  pub fn is_empty(&self) -> bool {
    self.applied.is_empty() && self.contributed_nothing.is_empty()
  }
}

/// Rewrite the params of a task targeting `consumer` from the outcomes of
/// `depends_on`.
///
/// Dependencies are visited in order, so when two of them carry the same
/// field the last one listed wins.
pub fn inject(
  params: &mut Params,
  consumer: &str,
  depends_on: &[TaskId],
  outcomes: &OutcomeMap,
) -> InjectionReport {
  let consumer = consumer.parse::<CapabilityKind>().ok();
  let bindings: Vec<&Binding> = BINDINGS.iter().filter(|b| b.applies_to(consumer)).collect();
  let mut report = InjectionReport::default();

  for dependency in depends_on {
    let Some(output) = outcomes.get(dependency).and_then(Outcome::output) else {
      report.contributed_nothing.push(dependency.clone());
      continue;
    };

    let mut contributed = false;
    for binding in &bindings {
      if let Some(value) = output.get(binding.field) {
        params.insert(binding.param.to_string(), value.clone());
        report.applied.push(AppliedBinding {
          from: dependency.clone(),
          field: binding.field.to_string(),
          param: binding.param.to_string(),
        });
        contributed = true;
      }
    }

    if !contributed {
      report.contributed_nothing.push(dependency.clone());
    }
  }

  if !report.contributed_nothing.is_empty() {
    debug!(
      dependencies = ?report.contributed_nothing,
      "dependencies contributed no parameters"
    );
  }

  report
}

#[cfg(test)]
mod tests {
  use super::*;
  use fable_task::{FailureKind, Output};
  use serde_json::{Value, json};

  fn output(value: Value) -> Outcome {
    match value {
      Value::Object(map) => Outcome::success(map),
      _ => Outcome::success(Output::new()),
    }
  }

  fn outcomes(entries: Vec<(&str, Outcome)>) -> OutcomeMap {
    entries
      .into_iter()
      .map(|(id, outcome)| (TaskId::from(id), outcome))
      .collect()
  }

  #[test]
  fn test_binds_known_fields() {
    let map = outcomes(vec![
      ("emotion", output(json!({"emotions": {"happiness": 0.9}, "mood": "happy"}))),
      ("memory", output(json!({"preferences": {"age": 6}, "child_id": "c1"}))),
    ]);
    let mut params = Params::new();
    params.insert("preferences".into(), json!({}));

    let report = inject(
      &mut params,
      "storyteller",
      &[TaskId::from("emotion"), TaskId::from("memory")],
      &map,
    );

    assert_eq!(params["emotion_context"], json!({"happiness": 0.9}));
    assert_eq!(params["preferences"], json!({"age": 6}));
    assert!(!params.contains_key("mood"));
    assert!(!params.contains_key("child_id"));
    assert_eq!(report.applied.len(), 2);
    assert!(report.contributed_nothing.is_empty());
  }

  #[test]
  fn test_last_dependency_wins() {
    let map = outcomes(vec![
      ("a", output(json!({"transcript": "from a"}))),
      ("b", output(json!({"transcript": "from b"}))),
    ]);

    let mut params = Params::new();
    inject(&mut params, "emotion_detector", &[TaskId::from("a"), TaskId::from("b")], &map);
    assert_eq!(params["input_text"], "from b");

    let mut params = Params::new();
    inject(&mut params, "emotion_detector", &[TaskId::from("b"), TaskId::from("a")], &map);
    assert_eq!(params["input_text"], "from a");
  }

  #[test]
  fn test_failed_and_unbound_dependencies_are_reported() {
    let map = outcomes(vec![
      ("failed", Outcome::failure(FailureKind::Capability, "boom")),
      ("quiet", output(json!({"unrelated": true}))),
    ]);
    let mut params = Params::new();
    params.insert("story_id".into(), Value::Null);

    let report = inject(
      &mut params,
      "illustrator",
      &[TaskId::from("failed"), TaskId::from("quiet"), TaskId::from("absent")],
      &map,
    );

    assert_eq!(params["story_id"], Value::Null);
    assert!(report.applied.is_empty());
    assert_eq!(
      report.contributed_nothing,
      vec![TaskId::from("failed"), TaskId::from("quiet"), TaskId::from("absent")]
    );
  }

  #[test]
  fn test_story_feeds_illustration() {
    let map = outcomes(vec![(
      "story",
      output(json!({"id": "s-1", "title": "T", "scenes": [{"scene_number": 1}]})),
    )]);
    let mut params = Params::new();
    params.insert("story_id".into(), Value::Null);

    inject(&mut params, "illustrator", &[TaskId::from("story")], &map);
    assert_eq!(params["story_id"], "s-1");
    assert_eq!(params["scenes"], json!([{"scene_number": 1}]));
    assert!(!params.contains_key("title"));
  }

  #[test]
  fn test_story_bindings_only_reach_illustration() {
    let map = outcomes(vec![(
      "emotion",
      output(json!({"emotions": {"fear": 0.4}, "id": "emo-1", "scenes": []})),
    )]);

    let mut params = Params::new();
    let report = inject(&mut params, "storyteller", &[TaskId::from("emotion")], &map);
    assert_eq!(params.keys().collect::<Vec<_>>(), vec!["emotion_context"]);
    assert_eq!(report.applied.len(), 1);

    let mut params = Params::new();
    inject(&mut params, "illustrator", &[TaskId::from("emotion")], &map);
    assert_eq!(params["story_id"], "emo-1");
    assert_eq!(params["scenes"], json!([]));
  }

  #[test]
  fn test_unknown_consumer_gets_shared_bindings_only() {
    let map = outcomes(vec![("story", output(json!({"id": "s-1", "transcript": "hi"})))]);
    let mut params = Params::new();

    inject(&mut params, "translator", &[TaskId::from("story")], &map);
    assert_eq!(params.keys().collect::<Vec<_>>(), vec!["input_text"]);
  }
}
