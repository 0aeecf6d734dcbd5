use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// Named outputs produced by a successful task.
pub type Output = serde_json::Map<String, serde_json::Value>;

/// Outcomes of one batch, keyed by task id.
pub type OutcomeMap = HashMap<TaskId, Outcome>;

/// Why a task failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  /// Unknown capability or action.
  Dispatch,
  /// The capability raised an error.
  Capability,
  /// Dependencies did not all reach a terminal outcome in time.
  DependencyTimeout,
  /// A dependency can never complete (cycle or id missing from the batch).
  UnresolvableDependency,
  /// The invocation itself exceeded the task timeout.
  Timeout,
  /// The batch was cancelled before the task finished.
  Cancelled,
}

impl fmt::Display for FailureKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      FailureKind::Dispatch => "dispatch",
      FailureKind::Capability => "capability",
      FailureKind::DependencyTimeout => "dependency_timeout",
      FailureKind::UnresolvableDependency => "unresolvable_dependency",
      FailureKind::Timeout => "timeout",
      FailureKind::Cancelled => "cancelled",
    };
    f.write_str(s)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
  pub kind: FailureKind,
  pub message: String,
}

/// Terminal result of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
  Success { output: Output },
  Failure(FailureRecord),
}

impl Outcome {
  pub fn success(output: Output) -> Self {
    Outcome::Success { output }
  }

  pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
    Outcome::Failure(FailureRecord {
      kind,
      message: message.into(),
    })
  }

  pub fn is_success(&self) -> bool {
    matches!(self, Outcome::Success { .. })
  }

  /// Output of a successful task, `None` for failures.
  pub fn output(&self) -> Option<&Output> {
    match self {
      Outcome::Success { output } => Some(output),
      Outcome::Failure(_) => None,
    }
  }

  pub fn failure_record(&self) -> Option<&FailureRecord> {
    match self {
      Outcome::Success { .. } => None,
      Outcome::Failure(record) => Some(record),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_failure_serializes_flat() {
    let outcome = Outcome::failure(FailureKind::Dispatch, "unknown capability: translator");
    assert_eq!(
      serde_json::to_value(&outcome).unwrap(),
      json!({
        "status": "failure",
        "kind": "dispatch",
        "message": "unknown capability: translator"
      })
    );
  }

  #[test]
  fn test_output_only_for_success() {
    let mut output = Output::new();
    output.insert("emotions".to_string(), json!({"happiness": 0.8}));
    assert!(Outcome::success(output).output().is_some());
    assert!(
      Outcome::failure(FailureKind::Capability, "boom")
        .output()
        .is_none()
    );
  }
}
