use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Named task parameters.
pub type Params = serde_json::Map<String, serde_json::Value>;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque task identity.
///
/// Ids produced by [`TaskId::next`] come from a process-local atomic counter,
/// so they advance monotonically and are never reused while the process lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
  /// Allocate a fresh id.
  pub fn next() -> Self {
    let n = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
    Self(format!("task-{}", n))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for TaskId {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

impl From<String> for TaskId {
  fn from(value: String) -> Self {
    Self(value)
  }
}

impl fmt::Display for TaskId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A unit of work targeting one action of one capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
  pub id: TaskId,
  /// Registry key of the target capability.
  pub capability: String,
  /// Action to invoke on that capability.
  pub action: String,
  #[serde(default)]
  pub params: Params,
  /// Lower runs earlier. Not unique.
  pub priority: i32,
  /// Tasks that must reach a terminal outcome before this one runs.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub depends_on: Vec<TaskId>,
}

impl Task {
  /// Create a task with a freshly allocated id.
  pub fn new(
    capability: impl Into<String>,
    action: impl Into<String>,
    params: Params,
    priority: i32,
  ) -> Self {
    Self {
      id: TaskId::next(),
      capability: capability.into(),
      action: action.into(),
      params,
      priority,
      depends_on: Vec::new(),
    }
  }

  pub fn with_dependencies(mut self, depends_on: impl IntoIterator<Item = TaskId>) -> Self {
    self.depends_on = depends_on.into_iter().collect();
    self
  }

  pub fn has_dependencies(&self) -> bool {
    !self.depends_on.is_empty()
  }

  /// The `<capability>_<action>` key used to look up well-known outputs.
  pub fn composite_key(&self) -> String {
    format!("{}_{}", self.capability, self.action)
  }
}
